//! Copy, paste, duplicate and delete over induced subgraphs.
//!
//! The clipboard slot is owned by one editor session. All operations except
//! [`Clipboard::copy`] are pure: they return the graph to apply and leave
//! both their inputs and the slot untouched.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    utils,
    workflow::{
        Graph,
        edge::Edge,
        node::{Node, NodeId, Position},
    },
};

/// Default offset applied to pasted and duplicated nodes.
pub const DEFAULT_PASTE_OFFSET: Position = Position {
    x: 50.0,
    y: 50.0,
};

/// Copied nodes plus the edges whose both endpoints were copied.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ClipboardPayload {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl ClipboardPayload {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Session-scoped clipboard slot, replaced wholesale on every copy.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    payload: Option<ClipboardPayload>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the subgraph induced by `selected`; an empty selection is a no-op.
    pub fn copy(
        &mut self,
        selected: &[Node],
        all_edges: &[Edge],
    ) -> Option<&ClipboardPayload> {
        if selected.is_empty() {
            return None;
        }
        let payload = induced_subgraph(selected, all_edges);
        debug!(nodes = payload.nodes.len(), edges = payload.edges.len(), "copied to clipboard");
        self.payload = Some(payload);
        self.payload.as_ref()
    }

    /// Merges a freshly identified copy of the clipboard into the existing graph.
    ///
    /// Returns `None` when the clipboard is empty.
    pub fn paste(
        &self,
        existing_nodes: &[Node],
        existing_edges: &[Edge],
        offset: Position,
    ) -> Option<Graph> {
        let payload = self.payload.as_ref().filter(|p| !p.is_empty())?;
        Some(merge_remapped(payload, existing_nodes, existing_edges, offset))
    }

    pub fn payload(&self) -> Option<&ClipboardPayload> {
        self.payload.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.as_ref().is_none_or(ClipboardPayload::is_empty)
    }

    pub fn clear(&mut self) {
        self.payload = None;
    }
}

/// Copy and paste of the current selection in one step, without touching a clipboard.
pub fn duplicate(
    selected: &[Node],
    all_nodes: &[Node],
    all_edges: &[Edge],
    offset: Position,
) -> Option<Graph> {
    if selected.is_empty() {
        return None;
    }
    let subgraph = induced_subgraph(selected, all_edges);
    Some(merge_remapped(&subgraph, all_nodes, all_edges, offset))
}

/// Removes the selected nodes and every edge touching them.
pub fn delete_selected(
    selected: &[Node],
    all_nodes: &[Node],
    all_edges: &[Edge],
) -> Graph {
    let ids: HashSet<&str> = selected.iter().map(|n| n.id.as_str()).collect();
    let nodes: Vec<Node> = all_nodes.iter().filter(|n| !ids.contains(n.id.as_str())).cloned().collect();
    let edges: Vec<Edge> = all_edges.iter().filter(|e| !ids.contains(e.source.as_str()) && !ids.contains(e.target.as_str())).cloned().collect();
    debug!(removed_nodes = all_nodes.len() - nodes.len(), removed_edges = all_edges.len() - edges.len(), "deleted selection");
    Graph {
        nodes,
        edges,
    }
}

/// Deep copy of `selected` plus the edges whose both endpoints are selected.
pub fn induced_subgraph(
    selected: &[Node],
    all_edges: &[Edge],
) -> ClipboardPayload {
    let ids: HashSet<&str> = selected.iter().map(|n| n.id.as_str()).collect();
    ClipboardPayload {
        nodes: selected.to_vec(),
        edges: all_edges.iter().filter(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str())).cloned().collect(),
    }
}

/// Mints fresh ids for `payload`, offsets and selects the copies, deselects
/// the existing nodes and appends the copies after them.
fn merge_remapped(
    payload: &ClipboardPayload,
    existing_nodes: &[Node],
    existing_edges: &[Edge],
    offset: Position,
) -> Graph {
    let mut id_map: HashMap<&str, NodeId> = HashMap::with_capacity(payload.nodes.len());

    let new_nodes: Vec<Node> = payload
        .nodes
        .iter()
        .map(|node| {
            let id = format!("node_{}", utils::shortid());
            id_map.insert(node.id.as_str(), id.clone());

            let mut copy = node.clone();
            copy.id = id;
            copy.position = node.position.offset(offset);
            copy.selected = true;
            copy.reset_transient();
            copy
        })
        .collect();

    let new_edges: Vec<Edge> = payload
        .edges
        .iter()
        .filter_map(|edge| {
            let source = id_map.get(edge.source.as_str())?;
            let target = id_map.get(edge.target.as_str())?;
            Some(Edge {
                id: format!("edge_{}", utils::shortid()),
                source: source.clone(),
                target: target.clone(),
                source_handle: edge.source_handle.clone(),
            })
        })
        .collect();

    debug!(nodes = new_nodes.len(), edges = new_edges.len(), "pasted subgraph");

    let mut nodes: Vec<Node> = existing_nodes
        .iter()
        .cloned()
        .map(|mut n| {
            n.selected = false;
            n
        })
        .collect();
    nodes.extend(new_nodes);

    let mut edges = existing_edges.to_vec();
    edges.extend(new_edges);

    Graph {
        nodes,
        edges,
    }
}
