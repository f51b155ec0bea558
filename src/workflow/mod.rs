pub mod edge;
pub mod node;
mod workflow;

pub use workflow::{CardRef, Graph, Workflow};
pub(crate) use workflow::digraph;
