use crate::workflow::node::NodeId;

/// Run-level events.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    Start(WorkflowStartEvent),
    Succeeded,
    Failed(WorkflowFailedEvent),
    Aborted(WorkflowAbortedEvent),
    /// Run state and card statuses were cleared.
    Reset,
}

impl WorkflowEvent {
    pub fn str(&self) -> &str {
        match self {
            WorkflowEvent::Start(_) => "Running",
            WorkflowEvent::Succeeded => "Succeeded",
            WorkflowEvent::Failed(_) => "Failed",
            WorkflowEvent::Aborted(_) => "Aborted",
            WorkflowEvent::Reset => "Reset",
        }
    }
}

/// Event emitted when a run starts
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStartEvent {
    /// Card node IDs that will run, in execution order
    pub node_ids: Vec<NodeId>,
    pub symbols: Vec<String>,
    pub total_steps: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowFailedEvent {
    /// number of failed steps
    pub failed: usize,
    pub succeeded: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowAbortedEvent {
    pub reason: String,
    pub completed_steps: usize,
}
