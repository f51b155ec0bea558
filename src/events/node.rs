use std::fmt;

/// Per-step events of a card node, emitted in step order.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// The card started running for `symbol`; `progress` already counts this step.
    Running {
        symbol: String,
        progress: u8,
    },
    Succeeded {
        symbol: String,
    },
    Error {
        symbol: String,
        reason: ErrorReason,
    },
}

impl NodeEvent {
    pub fn str(&self) -> &str {
        match self {
            NodeEvent::Running {
                ..
            } => "Running",
            NodeEvent::Succeeded {
                ..
            } => "Succeeded",
            NodeEvent::Error {
                ..
            } => "Error",
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            NodeEvent::Running {
                symbol,
                ..
            }
            | NodeEvent::Succeeded {
                symbol,
            }
            | NodeEvent::Error {
                symbol,
                ..
            } => symbol,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorReason {
    Failed(String),
}

impl fmt::Display for ErrorReason {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ErrorReason::Failed(msg) => write!(f, "Failed: {}", msg),
        }
    }
}
