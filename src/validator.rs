//! Structural validation of a workflow before it runs.
//!
//! Issues are returned as data, never as errors, so that the caller can
//! present them and decide (through [`RunGate`]) whether a run may start.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::workflow::{
    edge::Edge,
    node::{Node, NodeId, NodeKind},
};

/// Graphs with more nodes than this get a `large-workflow` notice.
const LARGE_WORKFLOW_THRESHOLD: usize = 10;

/// Severity level of a validation issue.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Classification of a validation issue.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IssueKind {
    NoNodes,
    NoSymbols,
    DisconnectedNodes,
    NoConnections,
    OrphanLogicNode,
    LargeWorkflow,
    MultiSymbol,
}

/// A single validation finding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    /// whether a run may still start with this issue present
    pub can_proceed: bool,
    /// nodes the issue is about
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_ids: Vec<NodeId>,
    /// symbols the issue is about
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
}

impl Issue {
    fn new(
        kind: IssueKind,
        severity: Severity,
        message: String,
    ) -> Self {
        Self {
            kind,
            severity,
            message,
            can_proceed: severity != Severity::Error,
            node_ids: Vec::new(),
            symbols: Vec::new(),
        }
    }

    fn with_nodes(
        mut self,
        node_ids: Vec<NodeId>,
    ) -> Self {
        self.node_ids = node_ids;
        self
    }

    fn with_symbols(
        mut self,
        symbols: Vec<String>,
    ) -> Self {
        self.symbols = symbols;
        self
    }
}

/// Issue counts per severity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

/// What the caller should do with a run request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunGate {
    /// No issues, run immediately.
    Proceed,
    /// Non-blocking issues, run only after the user confirms.
    Confirm,
    /// Blocking errors, never run.
    Blocked,
}

/// Aggregated result of [`validate`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub issues: Vec<Issue>,
    /// true only when there are no issues at all
    pub is_valid: bool,
    /// false if any issue blocks the run
    pub can_proceed: bool,
    pub stats: ValidationStats,
}

impl ValidationResult {
    fn from_issues(issues: Vec<Issue>) -> Self {
        let mut stats = ValidationStats::default();
        for issue in issues.iter() {
            match issue.severity {
                Severity::Error => stats.errors += 1,
                Severity::Warning => stats.warnings += 1,
                Severity::Info => stats.infos += 1,
            }
        }

        Self {
            is_valid: issues.is_empty(),
            can_proceed: issues.iter().all(|i| i.can_proceed),
            issues,
            stats,
        }
    }

    pub fn gate(&self) -> RunGate {
        if self.is_valid {
            RunGate::Proceed
        } else if self.can_proceed {
            RunGate::Confirm
        } else {
            RunGate::Blocked
        }
    }

    /// Returns the issues of the given kind.
    pub fn issues_of(
        &self,
        kind: IssueKind,
    ) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.kind == kind).collect()
    }

    pub fn has(
        &self,
        kind: IssueKind,
    ) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }
}

/// Validates a graph and the symbol list it is about to run against.
///
/// Checks run in a fixed order so the issue list is deterministic.
pub fn validate(
    nodes: &[Node],
    edges: &[Edge],
    symbols: &[String],
) -> ValidationResult {
    let mut issues = Vec::new();

    if nodes.is_empty() {
        issues.push(Issue::new(IssueKind::NoNodes, Severity::Error, "workflow has no nodes".to_string()));
    }

    if symbols.is_empty() {
        issues.push(Issue::new(IssueKind::NoSymbols, Severity::Error, "no symbols selected".to_string()));
    }

    if nodes.len() > 1 {
        let connected: HashSet<&str> = edges.iter().flat_map(|e| [e.source.as_str(), e.target.as_str()]).collect();
        let disconnected: Vec<NodeId> = nodes.iter().filter(|n| !connected.contains(n.id.as_str())).map(|n| n.id.clone()).collect();

        // all nodes disconnected is reported as no-connections instead
        if !disconnected.is_empty() && disconnected.len() < nodes.len() {
            issues.push(
                Issue::new(
                    IssueKind::DisconnectedNodes,
                    Severity::Warning,
                    format!("{} node(s) are not connected to the workflow", disconnected.len()),
                )
                .with_nodes(disconnected),
            );
        }

        if edges.is_empty() {
            issues.push(Issue::new(IssueKind::NoConnections, Severity::Warning, "nodes are not connected to each other".to_string()));
        }
    }

    for node in nodes.iter().filter(|n| matches!(n.kind(), NodeKind::Condition | NodeKind::Merge)) {
        let has_inbound = edges.iter().any(|e| e.target == node.id);
        let has_outbound = edges.iter().any(|e| e.source == node.id);
        if !has_inbound || !has_outbound {
            issues.push(
                Issue::new(
                    IssueKind::OrphanLogicNode,
                    Severity::Warning,
                    format!("{} node {} needs both an input and an output connection", node.kind().as_ref(), node.id),
                )
                .with_nodes(vec![node.id.clone()]),
            );
        }
    }

    if nodes.len() > LARGE_WORKFLOW_THRESHOLD {
        issues.push(Issue::new(
            IssueKind::LargeWorkflow,
            Severity::Info,
            format!("large workflow with {} nodes may take a while to run", nodes.len()),
        ));
    }

    if symbols.len() > 1 {
        issues.push(
            Issue::new(IssueKind::MultiSymbol, Severity::Info, format!("workflow will run for {} symbols: {}", symbols.len(), symbols.join(", ")))
                .with_symbols(symbols.to_vec()),
        );
    }

    let result = ValidationResult::from_issues(issues);
    debug!(
        errors = result.stats.errors,
        warnings = result.stats.warnings,
        infos = result.stats.infos,
        "workflow validated"
    );
    result
}
