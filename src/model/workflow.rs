use serde::{Deserialize, Serialize};

use crate::{
    CardflowError, Result,
    workflow::{Graph, edge::Edge, node::Node},
};

/// Where run results are presented by the rendering layer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputMode {
    /// results render on the cards themselves
    #[default]
    Canvas,
    /// results render in a separate report view
    Report,
}

/// Serializable record of an editor session, as handed to persistence.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WorkflowModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub output_mode: OutputMode,
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl WorkflowModel {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<WorkflowModel>(s).map_err(|e| CardflowError::Workflow(format!("{}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl TryFrom<&WorkflowModel> for Graph {
    type Error = CardflowError;

    /// Rebuilds the graph, rejecting duplicate ids and dangling edges.
    fn try_from(model: &WorkflowModel) -> Result<Self> {
        Graph::from_parts(model.nodes.clone(), model.edges.clone())
    }
}

#[cfg(test)]
mod test {
    use super::{OutputMode, WorkflowModel};
    use crate::{CardflowError, workflow::Graph};

    #[test]
    fn test_from_json() {
        let text = r#"{
            "id": "w1",
            "name": "Quality screen",
            "output_mode": "report",
            "symbols": ["TCS"],
            "nodes": [
                {"id": "a", "position": {"x": 0, "y": 0}, "data": {"kind": "card", "card_type": "dcf"}},
                {"id": "b", "position": {"x": 0, "y": 200}, "data": {"kind": "merge", "strategy": "first"}}
            ],
            "edges": [{"id": "e1", "source": "a", "target": "b"}]
        }"#;
        let model = WorkflowModel::from_json(text).unwrap();
        assert_eq!(model.output_mode, OutputMode::Report);

        let graph = Graph::try_from(&model).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);

        let back = WorkflowModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let text = r#"{"id": "w1", "name": "x", "nodes": [], "edges": [{"id": "e1", "source": "a", "target": "b"}]}"#;
        let model = WorkflowModel::from_json(text).unwrap();
        assert!(matches!(Graph::try_from(&model), Err(CardflowError::InvalidReference { .. })));
        assert!(WorkflowModel::from_json("{").is_err());
    }
}
