//! Automatic layered layout.
//!
//! Nodes are assigned levels by longest-path layering (Kahn's algorithm over
//! the petgraph view of the workflow), then laid out level by level. The
//! function is pure: the same graph always yields the same positions.

use std::collections::{HashMap, VecDeque};

use petgraph::{Direction, visit::EdgeRef};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::workflow::{
    digraph,
    edge::Edge,
    node::{Node, NodeId, Position},
};

/// Axis along which levels advance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayoutDirection {
    /// levels are rows, nodes of a level spread horizontally
    #[default]
    TopBottom,
    /// levels are columns, nodes of a level spread vertically
    LeftRight,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct LayoutOptions {
    pub direction: LayoutDirection,
    pub node_width: f64,
    pub node_height: f64,
    pub horizontal_spacing: f64,
    pub vertical_spacing: f64,
    /// added to every x so the layout is not centered on the origin
    pub origin_x: f64,
    /// added to every y
    pub origin_y: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopBottom,
            node_width: 240.0,
            node_height: 140.0,
            horizontal_spacing: 80.0,
            vertical_spacing: 100.0,
            origin_x: 400.0,
            origin_y: 100.0,
        }
    }
}

/// Computes the level of every node.
///
/// A node's level is the length of the longest path reaching it from any
/// node without inbound edges. Nodes never released by the queue (isolated
/// nodes, members of cycles) keep the level they were relaxed to, or 0.
pub fn levels(
    nodes: &[Node],
    edges: &[Edge],
) -> HashMap<NodeId, usize> {
    let graph = digraph(nodes, edges);

    let mut in_degree: Vec<usize> = graph.node_indices().map(|idx| graph.edges_directed(idx, Direction::Incoming).count()).collect();
    let mut level: Vec<Option<usize>> = vec![None; graph.node_count()];
    let mut queue = VecDeque::new();

    for idx in graph.node_indices() {
        if in_degree[idx.index()] == 0 {
            level[idx.index()] = Some(0);
            queue.push_back(idx);
        }
    }

    while let Some(idx) = queue.pop_front() {
        let current = level[idx.index()].unwrap_or(0);
        for edge in graph.edges_directed(idx, Direction::Outgoing) {
            let next = edge.target().index();
            level[next] = Some(level[next].map_or(current + 1, |l| l.max(current + 1)));
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(edge.target());
            }
        }
    }

    graph.node_indices().map(|idx| (graph[idx].clone(), level[idx.index()].unwrap_or(0))).collect()
}

/// Returns `nodes` with positions assigned by level; every other field is kept.
pub fn layout(
    nodes: &[Node],
    edges: &[Edge],
    options: &LayoutOptions,
) -> Vec<Node> {
    let levels = levels(nodes, edges);

    // group in original node order so ties are broken deterministically
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot: Vec<(usize, usize)> = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        let level = levels.get(&node.id).copied().unwrap_or(0);
        if groups.len() <= level {
            groups.resize_with(level + 1, Vec::new);
        }
        slot.push((level, groups[level].len()));
        groups[level].push(i);
    }

    let cross_step = match options.direction {
        LayoutDirection::TopBottom => options.node_width + options.horizontal_spacing,
        LayoutDirection::LeftRight => options.node_height + options.vertical_spacing,
    };
    let level_step = match options.direction {
        LayoutDirection::TopBottom => options.node_height + options.vertical_spacing,
        LayoutDirection::LeftRight => options.node_width + options.horizontal_spacing,
    };

    let positioned: Vec<Node> = nodes
        .iter()
        .zip(slot)
        .map(|(node, (level, index))| {
            let count = groups[level].len() as f64;
            let cross = (index as f64 - (count - 1.0) / 2.0) * cross_step;
            let along = level as f64 * level_step;

            let position = match options.direction {
                LayoutDirection::TopBottom => Position::new(cross + options.origin_x, along + options.origin_y),
                LayoutDirection::LeftRight => Position::new(along + options.origin_x, cross + options.origin_y),
            };

            let mut node = node.clone();
            node.position = position;
            node
        })
        .collect();

    debug!(nodes = nodes.len(), levels = groups.len(), direction = options.direction.as_ref(), "layout computed");
    positioned
}
