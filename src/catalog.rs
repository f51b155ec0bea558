//! Card and template catalogs consumed by the editor session.
//!
//! Catalog contents are supplied by the embedding application; the engine
//! only depends on these lookups.

use serde::{Deserialize, Serialize};

use crate::workflow::{edge::Edge, node::Node};

/// Display metadata of a card type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CardMeta {
    pub id: String,
    pub label: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// A named, prebuilt graph.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

pub trait CardCatalog: Send + Sync {
    /// Looks up a card type; used for display only.
    fn describe(
        &self,
        card_type: &str,
    ) -> Option<CardMeta>;
}

pub trait TemplateCatalog: Send + Sync {
    fn template(
        &self,
        name: &str,
    ) -> Option<WorkflowTemplate>;
}
