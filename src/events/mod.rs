//! Event types for workflow execution.
//!
//! Events are emitted by the dispatcher to notify subscribers (typically the
//! rendering layer) about run progress, per-card outcomes and completion.

mod node;
mod workflow;

pub use node::*;
pub use workflow::*;

use crate::{dispatcher::RunId, workflow::node::NodeId};

/// Generic event wrapper.
#[derive(Debug, Clone)]
pub struct Event<T> {
    inner: T,
}

/// Top-level event type for workflow graph events.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// Run-level events (start, succeeded, failed, etc.).
    Workflow(WorkflowEvent),
    /// Card-level events (running, succeeded, error).
    Node(NodeEvent),
}

/// Event message containing run and node context.
#[derive(Debug, Clone)]
pub struct Message {
    /// Run that generated this event.
    pub rid: RunId,
    /// Node that generated this event (empty for workflow events).
    pub nid: NodeId,
    /// The actual event data.
    pub event: GraphEvent,
    /// Timestamp in milliseconds.
    pub timestamp: i64,
}

impl<T> std::ops::Deref for Event<T>
where
    T: std::fmt::Debug + Clone,
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Event<T>
where
    T: std::fmt::Debug + Clone,
{
    pub fn new(inner: &T) -> Self {
        Self {
            inner: inner.clone(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl GraphEvent {
    pub fn is_complete(&self) -> bool {
        matches!(self, GraphEvent::Workflow(WorkflowEvent::Succeeded))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, GraphEvent::Workflow(WorkflowEvent::Failed(_)))
    }
}
