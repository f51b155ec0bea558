//! Workflow edge definitions for connecting nodes.
//!
//! Edges are directed `source -> target` connections. The source handle
//! only classifies which output port an edge leaves from (e.g. the true/false
//! ports of a condition node); the dispatcher does not branch on it.

use serde::{Deserialize, Serialize};

use crate::workflow::node::NodeId;

/// Unique identifier for an edge within a workflow.
pub type EdgeId = String;

/// Fixed source handle types.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FixedHandle {
    /// Default output handle for sequential flow.
    #[default]
    Source,
    /// True port of a condition node.
    True,
    /// False port of a condition node.
    False,
}

/// Source handle identifying which output port of a node an edge originates from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SourceHandle {
    /// Fixed handle types: source, true, false.
    Fixed(FixedHandle),
    /// Any other named port.
    Named(String),
}

impl Default for SourceHandle {
    fn default() -> Self {
        SourceHandle::Fixed(FixedHandle::default())
    }
}

impl SourceHandle {
    pub fn as_str(&self) -> &str {
        match self {
            SourceHandle::Fixed(h) => h.as_ref(),
            SourceHandle::Named(n) => n.as_str(),
        }
    }
}

/// Directed connection between two nodes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Edge {
    /// Unique edge identifier.
    pub id: EdgeId,
    /// ID of the source node.
    pub source: NodeId,
    /// ID of the target node.
    pub target: NodeId,
    /// Which output handle this edge connects from.
    #[serde(default)]
    pub source_handle: SourceHandle,
}

impl Edge {
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: SourceHandle::default(),
        }
    }

    pub fn with_handle(
        mut self,
        handle: SourceHandle,
    ) -> Self {
        self.source_handle = handle;
        self
    }

    /// Returns true when either endpoint is `nid`.
    pub fn touches(
        &self,
        nid: &str,
    ) -> bool {
        self.source == nid || self.target == nid
    }
}
