//! Workflow node definitions.
//!
//! A node is one vertex of the card graph. Its kind-specific payload is a
//! tagged union so that every consumer has to handle each kind explicitly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// node id
pub type NodeId = String;

/// Opaque analysis output produced by a result provider for one card and symbol.
pub type AnalysisResult = Value;

/// 2D canvas coordinate.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(
        x: f64,
        y: f64,
    ) -> Self {
        Self {
            x,
            y,
        }
    }

    /// Returns this position shifted by `offset`.
    pub fn offset(
        &self,
        offset: Position,
    ) -> Self {
        Self {
            x: self.x + offset.x,
            y: self.y + offset.y,
        }
    }
}

/// Discriminant of a node's payload.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    Card,
    Condition,
    Merge,
}

/// Transient execution status of a card node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CardStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

/// Comparison used by a condition node against the score threshold.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComparisonOperator {
    Eq,
    Ne,
    #[default]
    Gt,
    Lt,
    Ge,
    Le,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::Le => "<=",
        }
    }
}

/// How a merge node reconciles multiple inbound edges.
///
/// Informational only: the dispatcher executes card nodes regardless of merge topology.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MergeStrategy {
    #[default]
    All,
    Any,
    First,
}

/// Payload of a card node.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CardData {
    /// card type id in the card catalog
    pub card_type: String,
    /// symbol the card targets, overwritten with the running symbol during execution
    #[serde(default)]
    pub symbol: Option<String>,
    /// free-form parameters
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub status: CardStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CardData {
    pub fn new(card_type: impl Into<String>) -> Self {
        Self {
            card_type: card_type.into(),
            ..Default::default()
        }
    }

    /// Clears status, result and error back to idle.
    pub fn reset(&mut self) {
        self.status = CardStatus::Idle;
        self.result = None;
        self.error = None;
    }
}

/// Payload of a condition node: `field <operator> threshold`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConditionData {
    #[serde(default = "default_condition_field")]
    pub field: String,
    #[serde(default)]
    pub operator: ComparisonOperator,
    pub threshold: f64,
}

fn default_condition_field() -> String {
    "score".to_string()
}

impl ConditionData {
    pub fn new(
        operator: ComparisonOperator,
        threshold: f64,
    ) -> Self {
        Self {
            field: default_condition_field(),
            operator,
            threshold,
        }
    }

    /// Human-readable expression, e.g. `score > 70`.
    pub fn expression(&self) -> String {
        format!("{} {} {}", self.field, self.operator.symbol(), self.threshold)
    }
}

/// Payload of a merge node.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MergeData {
    #[serde(default)]
    pub strategy: MergeStrategy,
}

/// Kind-specific node payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeData {
    Card(CardData),
    Condition(ConditionData),
    Merge(MergeData),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Card(_) => NodeKind::Card,
            NodeData::Condition(_) => NodeKind::Condition,
            NodeData::Merge(_) => NodeKind::Merge,
        }
    }
}

/// A vertex of the workflow graph.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Node {
    /// node id, immutable for the node's lifetime
    pub id: NodeId,
    /// canvas position
    #[serde(default)]
    pub position: Position,
    /// kind-specific payload
    pub data: NodeData,
    /// transient selection flag
    #[serde(default)]
    pub selected: bool,
}

impl Node {
    pub fn new(
        id: impl Into<NodeId>,
        position: Position,
        data: NodeData,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            data,
            selected: false,
        }
    }

    pub fn card(
        id: impl Into<NodeId>,
        card_type: impl Into<String>,
    ) -> Self {
        Self::new(id, Position::default(), NodeData::Card(CardData::new(card_type)))
    }

    pub fn condition(
        id: impl Into<NodeId>,
        operator: ComparisonOperator,
        threshold: f64,
    ) -> Self {
        Self::new(id, Position::default(), NodeData::Condition(ConditionData::new(operator, threshold)))
    }

    pub fn merge(
        id: impl Into<NodeId>,
        strategy: MergeStrategy,
    ) -> Self {
        Self::new(
            id,
            Position::default(),
            NodeData::Merge(MergeData {
                strategy,
            }),
        )
    }

    pub fn with_position(
        mut self,
        position: Position,
    ) -> Self {
        self.position = position;
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn as_card(&self) -> Option<&CardData> {
        match &self.data {
            NodeData::Card(card) => Some(card),
            _ => None,
        }
    }

    pub fn as_card_mut(&mut self) -> Option<&mut CardData> {
        match &mut self.data {
            NodeData::Card(card) => Some(card),
            _ => None,
        }
    }

    /// Clears execution-transient state; a no-op for non-card nodes.
    pub fn reset_transient(&mut self) {
        if let Some(card) = self.as_card_mut() {
            card.reset();
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{CardStatus, ComparisonOperator, MergeStrategy, Node, NodeData, NodeKind};

    #[test]
    fn test_node_deserialize_tagged() {
        let node: Node = serde_json::from_value(json!({
            "id": "n1",
            "position": {"x": 10.0, "y": 20.0},
            "data": {"kind": "card", "card_type": "valuation-summary", "symbol": "TCS"}
        }))
        .unwrap();

        assert_eq!(node.kind(), NodeKind::Card);
        let card = node.as_card().unwrap();
        assert_eq!(card.card_type, "valuation-summary");
        assert_eq!(card.status, CardStatus::Idle);
        assert!(!node.selected);

        let cond: Node = serde_json::from_value(json!({
            "id": "c1",
            "data": {"kind": "condition", "operator": "ge", "threshold": 70.0}
        }))
        .unwrap();
        assert_eq!(cond.kind(), NodeKind::Condition);
        match cond.data {
            NodeData::Condition(c) => assert_eq!(c.expression(), "score >= 70"),
            _ => panic!("expected condition"),
        }
    }

    #[test]
    fn test_reset_transient() {
        let mut node = Node::card("n1", "dcf");
        {
            let card = node.as_card_mut().unwrap();
            card.status = CardStatus::Error;
            card.error = Some("boom".to_string());
        }
        node.reset_transient();
        let card = node.as_card().unwrap();
        assert_eq!(card.status, CardStatus::Idle);
        assert!(card.error.is_none());

        let mut merge = Node::merge("m1", MergeStrategy::Any);
        merge.reset_transient();
        assert_eq!(merge.kind(), NodeKind::Merge);
        assert_eq!(ComparisonOperator::default().symbol(), ">");
    }
}
