//! # Cardflow
//!
//! Cardflow is the engine behind a visual workflow editor for financial
//! analysis. Users compose a directed graph of analysis cards, condition
//! nodes and merge nodes, then run it against one or more stock symbols.
//!
//! ## Core Features
//!
//! - **Graph Model**: Nodes and edges with referential integrity kept after every edit
//! - **Validation**: Pre-run checks with blocking errors, warnings and infos
//! - **Auto-Layout**: Longest-path layering into top-bottom or left-right tiers
//! - **History & Clipboard**: Bounded undo/redo snapshots, copy/paste/duplicate with id remapping
//! - **Execution**: Sequential symbol-major runs with partial-failure reporting and run events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cardflow::{EngineBuilder, RunOutcome};
//!
//! let engine = EngineBuilder::new().build()?;
//! engine.load_template(&templates, "quality-screen")?;
//! engine.set_symbols(vec!["TCS".to_string(), "INFY".to_string()])?;
//!
//! if let RunOutcome::Ran(report) = engine.request_run(&provider, true).await? {
//!     println!("{} succeeded", report.summary().succeeded);
//! }
//! ```

mod builder;
pub mod catalog;
pub mod clipboard;
mod common;
mod config;
pub mod dispatcher;
mod engine;
mod error;
pub mod events;
pub mod history;
pub mod layout;
mod model;
mod runtime;
pub mod store;
mod utils;
pub mod validator;
pub mod workflow;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use config::{Config, ExecutorConfig, StoreConfig};
pub use dispatcher::{ResultProvider, RunReport, RunStatus};
pub use engine::{Engine, RunOutcome};
pub use error::CardflowError;
pub use model::*;
pub use runtime::{Channel, ChannelEvent, ChannelOptions};

/// Result type alias for Cardflow operations.
pub type Result<T> = std::result::Result<T, CardflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
