mod dispatcher;
mod provider;
mod report;

pub use dispatcher::Dispatcher;
pub use provider::ResultProvider;
pub use report::{RunId, RunReport, RunStatus, RunSummary, StepOutcome};
