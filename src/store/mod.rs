//! Persistence of workflow records.
//!
//! Storage backends implement [`WorkflowStore`]; the crate ships
//! [`MemStore`], an in-memory store for tests and embedded use.

pub mod data;
mod mem;

use crate::Result;

pub use mem::MemStore;

/// Workflow record collection keyed by workflow id.
pub trait WorkflowStore: Send + Sync {
    /// Checks if a record with the given ID exists.
    fn exists(
        &self,
        id: &str,
    ) -> Result<bool>;

    /// Finds a record by ID.
    fn find(
        &self,
        id: &str,
    ) -> Result<data::Workflow>;

    /// Lists all records, most recently updated first.
    fn list(&self) -> Result<Vec<data::Workflow>>;

    /// Creates or replaces a record, keeping the original create time.
    fn save(
        &self,
        data: &data::Workflow,
    ) -> Result<bool>;

    /// Deletes a record by ID.
    fn delete(
        &self,
        id: &str,
    ) -> Result<bool>;
}
