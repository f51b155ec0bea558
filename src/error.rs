//! Error types for Cardflow.
//!
//! All errors in Cardflow are represented by the `CardflowError` enum,
//! which provides specific variants for different error categories.
//! Validation issues and per-step execution failures are not errors:
//! they are returned as data so the caller can render them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Cardflow operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum CardflowError {
    /// Engine-level errors (session lifecycle, run gating).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// Workflow definition errors.
    #[error("{0}")]
    Workflow(String),

    /// Node definition errors.
    #[error("{0}")]
    Node(String),

    /// Edge definition errors.
    #[error("{0}")]
    Edge(String),

    /// Failure reported by a result provider for one card and symbol.
    #[error("{0}")]
    Provider(String),

    /// An edge refers to a node that does not exist in the graph.
    #[error("edge {edge} references missing node {node}")]
    InvalidReference {
        edge: String,
        node: String,
    },

    /// A node or edge id is already taken.
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// A structural edit was attempted while a run is in progress.
    #[error("workflow is running, structural edits are disabled")]
    Busy,

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),
}

impl From<std::io::Error> for CardflowError {
    fn from(error: std::io::Error) -> Self {
        CardflowError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for CardflowError {
    fn from(error: serde_json::Error) -> Self {
        CardflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for CardflowError {
    fn from(error: toml::de::Error) -> Self {
        CardflowError::Config(error.to_string())
    }
}
