mod workflow;

pub use workflow::{OutputMode, WorkflowModel};
