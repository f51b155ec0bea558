use serde::{Deserialize, Serialize};

/// Stored workflow record; `data` is the JSON of a [`crate::WorkflowModel`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub data: String,
    pub create_time: i64,
    pub update_time: i64,
}
