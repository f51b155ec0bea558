//! Run report and its step transitions.
//!
//! Every transition takes the report by value and returns the next one, so
//! the dispatcher never mutates a report a reader may be holding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    utils,
    workflow::node::{AnalysisResult, NodeId},
};

/// run id
pub type RunId = String;

/// Outcome of one (card, symbol) step: the analysis result or an error message.
pub type StepOutcome = std::result::Result<AnalysisResult, String>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

/// Succeeded and failed step counts of a run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Aggregate record of one execution.
///
/// `results` and `errors` are keyed by node id when the run has a single
/// symbol and by `"{node_id}-{symbol}"` otherwise.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub run_id: RunId,
    pub status: RunStatus,
    /// 0 to 100
    pub progress: u8,
    pub results: BTreeMap<String, AnalysisResult>,
    pub errors: BTreeMap<String, String>,
    pub symbols: Vec<String>,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    /// the run was cancelled before all steps ran
    pub aborted: bool,
}

impl RunReport {
    /// The report of a session that has not run yet, or was reset.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn begin(
        run_id: RunId,
        symbols: Vec<String>,
        total_steps: usize,
    ) -> Self {
        Self {
            run_id,
            status: RunStatus::Running,
            symbols,
            total_steps,
            started_at: Some(utils::time::time_millis()),
            ..Default::default()
        }
    }

    pub fn result_key(
        &self,
        node_id: &str,
        symbol: &str,
    ) -> String {
        if self.symbols.len() == 1 {
            node_id.to_string()
        } else {
            format!("{}-{}", node_id, symbol)
        }
    }

    /// Counts a step as started and recomputes progress.
    pub fn begin_step(mut self) -> Self {
        self.completed_steps += 1;
        self.progress = if self.total_steps == 0 {
            100
        } else {
            (self.completed_steps as f64 / self.total_steps as f64 * 100.0).round() as u8
        };
        self
    }

    /// Records the outcome of one step.
    pub fn apply_step(
        mut self,
        node_id: &NodeId,
        symbol: &str,
        outcome: StepOutcome,
    ) -> Self {
        let key = self.result_key(node_id, symbol);
        match outcome {
            Ok(result) => {
                self.results.insert(key, result);
            }
            Err(message) => {
                self.errors.insert(key, message);
            }
        }
        self
    }

    /// Finalizes a run that went through every step.
    pub fn finish(mut self) -> Self {
        self.status = if self.errors.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Error
        };
        self.progress = 100;
        self.finished_at = Some(utils::time::time_millis());
        self
    }

    /// Finalizes a cancelled run, keeping the partial results.
    pub fn abort(mut self) -> Self {
        self.status = RunStatus::Error;
        self.aborted = true;
        self.finished_at = Some(utils::time::time_millis());
        self
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            succeeded: self.results.len(),
            failed: self.errors.len(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{RunReport, RunStatus};

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_symbol_keys_by_node() {
        let report = RunReport::begin("r".to_string(), symbols(&["TCS"]), 1).begin_step().apply_step(&"n1".to_string(), "TCS", Ok(json!(1)));
        assert!(report.results.contains_key("n1"));
        assert_eq!(report.progress, 100);
    }

    #[test]
    fn test_multi_symbol_keys_by_node_and_symbol() {
        let report = RunReport::begin("r".to_string(), symbols(&["TCS", "INFY"]), 2)
            .begin_step()
            .apply_step(&"n1".to_string(), "TCS", Ok(json!(1)))
            .begin_step()
            .apply_step(&"n1".to_string(), "INFY", Err("timeout".to_string()));
        assert!(report.results.contains_key("n1-TCS"));
        assert_eq!(report.errors["n1-INFY"], "timeout");
        assert_eq!(report.summary().succeeded, 1);
        assert_eq!(report.summary().failed, 1);
    }

    #[test]
    fn test_progress_rounds() {
        let report = RunReport::begin("r".to_string(), symbols(&["A"]), 3).begin_step();
        assert_eq!(report.progress, 33);
        let report = report.begin_step();
        assert_eq!(report.progress, 67);
        assert_eq!(report.status, RunStatus::Running);
    }

    #[test]
    fn test_finish_and_abort() {
        let ok = RunReport::begin("r".to_string(), symbols(&["A"]), 0).finish();
        assert_eq!(ok.status, RunStatus::Completed);
        assert_eq!(ok.progress, 100);

        let failed = RunReport::begin("r".to_string(), symbols(&["A"]), 1).begin_step().apply_step(&"n".to_string(), "A", Err("x".to_string())).finish();
        assert_eq!(failed.status, RunStatus::Error);

        let aborted = RunReport::begin("r".to_string(), symbols(&["A"]), 4).begin_step().abort();
        assert!(aborted.aborted);
        assert_eq!(aborted.status, RunStatus::Error);
        assert_eq!(aborted.progress, 25);
        assert!(aborted.finished_at.is_some());
    }
}
