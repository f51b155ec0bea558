//! Graph model: nodes, edges and their structural invariants.
//!
//! [`Graph`] is a plain value (cheap to snapshot for history), while
//! [`Workflow`] is the shared live handle owned by an editor session and
//! written to by the dispatcher while a run is in progress.

use std::collections::{HashMap, HashSet};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use serde::Serialize;
use tracing::trace;

use crate::{
    CardflowError, Result, ShareLock,
    workflow::{
        edge::{Edge, EdgeId},
        node::{AnalysisResult, CardStatus, Node, NodeId, Position},
    },
};

/// Nodes and edges of a workflow, in insertion order.
///
/// Invariants held after every mutation:
/// - every edge's source and target refer to existing nodes
/// - node ids are unique, edge ids are unique
///
/// Outside the crate the node and edge lists are read-only; every change
/// goes through the checked mutations.
///
/// ```rust,compile_fail
/// let mut graph = cardflow::workflow::Graph::new();
/// graph.edges.clear();
/// ```
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from raw parts, rejecting duplicate ids and dangling edges.
    pub fn from_parts(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<Self> {
        let mut graph = Graph::new();
        for node in nodes {
            graph.add_node(node)?;
        }
        for edge in edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_node(
        &self,
        id: &str,
    ) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// get node by id
    pub fn node(
        &self,
        id: &str,
    ) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(
        &mut self,
        id: &str,
    ) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// get edge by id
    pub fn edge(
        &self,
        id: &str,
    ) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// add node to graph
    pub fn add_node(
        &mut self,
        node: Node,
    ) -> Result<()> {
        if self.contains_node(&node.id) {
            return Err(CardflowError::DuplicateId(node.id));
        }
        trace!(nid = %node.id, kind = node.kind().as_ref(), "add node");
        self.nodes.push(node);
        Ok(())
    }

    /// Removes a node together with every edge incident to it.
    pub fn remove_node(
        &mut self,
        id: &str,
    ) -> Option<Node> {
        let idx = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(idx);
        self.edges.retain(|e| !e.touches(id));
        trace!(nid = %id, "remove node");
        Some(node)
    }

    /// add edge between two existing nodes
    pub fn add_edge(
        &mut self,
        edge: Edge,
    ) -> Result<()> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.contains_node(endpoint) {
                return Err(CardflowError::InvalidReference {
                    edge: edge.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
        if self.edge(&edge.id).is_some() {
            return Err(CardflowError::DuplicateId(edge.id));
        }
        trace!(eid = %edge.id, source = %edge.source, target = %edge.target, "add edge");
        self.edges.push(edge);
        Ok(())
    }

    pub fn remove_edge(
        &mut self,
        id: &EdgeId,
    ) -> Option<Edge> {
        let idx = self.edges.iter().position(|e| &e.id == id)?;
        Some(self.edges.remove(idx))
    }

    pub fn move_node(
        &mut self,
        id: &str,
        position: Position,
    ) -> Result<()> {
        let node = self.node_mut(id).ok_or(CardflowError::Node(format!("node {} not found", id)))?;
        node.position = position;
        Ok(())
    }

    /// Marks exactly the nodes in `ids` as selected.
    pub fn select(
        &mut self,
        ids: &[NodeId],
    ) {
        let ids: HashSet<&NodeId> = ids.iter().collect();
        for node in self.nodes.iter_mut() {
            node.selected = ids.contains(&node.id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.nodes.iter_mut().for_each(|n| n.selected = false);
    }

    pub fn selected_nodes(&self) -> Vec<Node> {
        self.nodes.iter().filter(|n| n.selected).cloned().collect()
    }

    /// Clears status, result and error of every card node.
    pub fn reset_transient(&mut self) {
        self.nodes.iter_mut().for_each(Node::reset_transient);
    }

    /// Output a human-readable representation of the graph
    pub fn schema(&self) -> String {
        let graph = digraph(&self.nodes, &self.edges);
        let mut lines = Vec::new();

        lines.push("=== Workflow Graph ===".to_string());
        lines.push(format!("Nodes: {}, Edges: {}", self.nodes.len(), self.edges.len()));
        lines.push(String::new());

        lines.push("--- Nodes ---".to_string());
        for node in self.nodes.iter() {
            let detail = match node.as_card() {
                Some(card) => format!("card: {}, status: {}", card.card_type, card.status.as_ref()),
                None => format!("type: {}", node.kind().as_ref()),
            };
            lines.push(format!("[{}] ({}) at ({}, {})", node.id, detail, node.position.x, node.position.y));
        }
        lines.push(String::new());

        lines.push("--- Graph Structure ---".to_string());
        for idx in graph.node_indices() {
            let outgoing: Vec<String> = graph
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| format!("{}({})", graph[e.target()], e.weight()))
                .collect();

            if outgoing.is_empty() {
                lines.push(format!("{} -> (end)", graph[idx]));
            } else {
                lines.push(format!("{} -> {}", graph[idx], outgoing.join(", ")));
            }
        }

        lines.join("\n")
    }
}

/// Builds a petgraph view of `nodes` and `edges`.
///
/// Node indices follow the order of `nodes`; edges whose endpoints are
/// missing are left out. Node weights are node ids, edge weights edge ids.
pub(crate) fn digraph(
    nodes: &[Node],
    edges: &[Edge],
) -> DiGraph<NodeId, EdgeId> {
    let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
    let mut indices: HashMap<&str, NodeIndex> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        let idx = graph.add_node(node.id.clone());
        indices.entry(node.id.as_str()).or_insert(idx);
    }
    for edge in edges {
        if let (Some(source), Some(target)) = (indices.get(edge.source.as_str()), indices.get(edge.target.as_str())) {
            graph.add_edge(*source, *target, edge.id.clone());
        }
    }
    graph
}

/// Card node reference handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRef {
    pub id: NodeId,
    pub card_type: String,
}

/// Shared, lockable handle to the live graph of an editor session.
///
/// Writes are crate-internal so an engine session stays the only editor.
///
/// ```rust,compile_fail
/// let workflow = cardflow::workflow::Workflow::new();
/// workflow.update(|graph| graph.clear_selection());
/// ```
#[derive(Clone, Default)]
pub struct Workflow {
    graph: ShareLock<Graph>,
}

impl Workflow {
    /// create a new empty workflow
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep copy of the current graph.
    pub fn snapshot(&self) -> Graph {
        self.graph.read().unwrap().clone()
    }

    /// Replaces the whole graph, e.g. when applying an undo snapshot.
    pub(crate) fn replace(
        &self,
        graph: Graph,
    ) {
        *self.graph.write().unwrap() = graph;
    }

    /// Runs `f` with read access to the graph.
    pub fn read<R>(
        &self,
        f: impl FnOnce(&Graph) -> R,
    ) -> R {
        let graph = self.graph.read().unwrap();
        f(&graph)
    }

    /// Runs `f` with write access to the graph.
    pub(crate) fn update<R>(
        &self,
        f: impl FnOnce(&mut Graph) -> R,
    ) -> R {
        let mut graph = self.graph.write().unwrap();
        f(&mut graph)
    }

    /// get node by id
    pub fn get_node(
        &self,
        id: &str,
    ) -> Option<Node> {
        self.read(|g| g.node(id).cloned())
    }

    pub fn node_count(&self) -> usize {
        self.read(|g| g.nodes.len())
    }

    pub fn edge_count(&self) -> usize {
        self.read(|g| g.edges.len())
    }

    /// Card nodes in graph order.
    pub fn card_nodes(&self) -> Vec<CardRef> {
        self.read(|g| {
            g.nodes
                .iter()
                .filter_map(|n| {
                    n.as_card().map(|card| CardRef {
                        id: n.id.clone(),
                        card_type: card.card_type.clone(),
                    })
                })
                .collect()
        })
    }

    /// mark card as running for `symbol`
    pub(crate) fn mark_card_running(
        &self,
        id: &str,
        symbol: &str,
    ) {
        self.update(|g| {
            if let Some(card) = g.node_mut(id).and_then(Node::as_card_mut) {
                card.status = CardStatus::Running;
                card.symbol = Some(symbol.to_string());
            }
        });
    }

    /// Records the outcome of one step on the card node.
    pub(crate) fn apply_card_outcome(
        &self,
        id: &str,
        outcome: &std::result::Result<AnalysisResult, String>,
    ) {
        self.update(|g| {
            if let Some(card) = g.node_mut(id).and_then(Node::as_card_mut) {
                match outcome {
                    Ok(result) => {
                        card.status = CardStatus::Success;
                        card.result = Some(result.clone());
                        card.error = None;
                    }
                    Err(message) => {
                        card.status = CardStatus::Error;
                        card.result = None;
                        card.error = Some(message.clone());
                    }
                }
            }
        });
    }

    /// Clears execution-transient state on every card node.
    pub(crate) fn reset_cards(&self) {
        self.update(Graph::reset_transient);
    }

    /// Returns cards still marked running to idle, e.g. after an interrupted run.
    pub(crate) fn release_running_cards(&self) {
        self.update(|g| {
            for card in g.nodes.iter_mut().filter_map(Node::as_card_mut) {
                if card.status == CardStatus::Running {
                    card.reset();
                }
            }
        });
    }

    pub fn schema(&self) -> String {
        self.read(Graph::schema)
    }
}

impl From<Graph> for Workflow {
    fn from(graph: Graph) -> Self {
        Self {
            graph: ShareLock::new(graph.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{Graph, Workflow};
    use crate::{
        CardflowError,
        workflow::{
            edge::Edge,
            node::{CardStatus, Node, Position},
        },
    };

    fn sample() -> Graph {
        Graph::from_parts(
            vec![Node::card("a", "dcf"), Node::card("b", "dcf"), Node::card("c", "dcf")],
            vec![Edge::new("e1", "a", "b"), Edge::new("e2", "c", "a")],
        )
        .unwrap()
    }

    #[test]
    fn test_add_edge_rejects_missing_node() {
        let mut graph = sample();
        let before = graph.clone();
        let err = graph.add_edge(Edge::new("e3", "a", "zzz")).unwrap_err();
        assert_eq!(
            err,
            CardflowError::InvalidReference {
                edge: "e3".to_string(),
                node: "zzz".to_string(),
            }
        );
        assert_eq!(graph, before);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut graph = sample();
        assert_eq!(graph.add_node(Node::card("a", "x")), Err(CardflowError::DuplicateId("a".to_string())));
        assert_eq!(graph.add_edge(Edge::new("e1", "b", "c")), Err(CardflowError::DuplicateId("e1".to_string())));
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut graph = sample();
        let removed = graph.remove_node("a").unwrap();
        assert_eq!(removed.id, "a");
        assert!(graph.edges.is_empty());
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.remove_node("a").is_none());
    }

    #[test]
    fn test_selection_and_move() {
        let mut graph = sample();
        graph.select(&["a".to_string(), "c".to_string()]);
        let selected: Vec<String> = graph.selected_nodes().into_iter().map(|n| n.id).collect();
        assert_eq!(selected, vec!["a", "c"]);
        graph.clear_selection();
        assert!(graph.selected_nodes().is_empty());

        graph.move_node("b", Position::new(5.0, 6.0)).unwrap();
        assert_eq!(graph.node("b").unwrap().position, Position::new(5.0, 6.0));
        assert!(graph.move_node("nope", Position::default()).is_err());
    }

    #[test]
    fn test_workflow_card_status() {
        let workflow = Workflow::from(sample());
        assert_eq!(workflow.card_nodes().len(), 3);

        workflow.mark_card_running("a", "TCS");
        let card = workflow.get_node("a").unwrap().as_card().cloned().unwrap();
        assert_eq!(card.status, CardStatus::Running);
        assert_eq!(card.symbol.as_deref(), Some("TCS"));

        workflow.apply_card_outcome("a", &Ok(json!({"score": 1})));
        assert_eq!(workflow.get_node("a").unwrap().as_card().unwrap().status, CardStatus::Success);

        workflow.apply_card_outcome("b", &Err("down".to_string()));
        assert_eq!(workflow.get_node("b").unwrap().as_card().unwrap().error.as_deref(), Some("down"));

        workflow.reset_cards();
        assert!(workflow.snapshot().nodes.iter().all(|n| n.as_card().unwrap().status == CardStatus::Idle));
    }

    #[test]
    fn test_schema() {
        let schema = sample().schema();
        assert!(schema.contains("Nodes: 3, Edges: 2"));
        assert!(schema.contains("a -> b(e1)"));
        assert!(schema.contains("b -> (end)"));
    }
}
