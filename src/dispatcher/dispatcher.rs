//! Workflow dispatcher: the execution engine.
//!
//! The dispatcher is responsible for:
//! - Walking card nodes symbol-major, node-minor, one step at a time
//! - Updating each card's live status as steps start and finish
//! - Folding step outcomes into the run report
//! - Publishing run and node events in step order
//!
//! A failed step never aborts the run. Condition and merge nodes are not
//! executed and do not gate card execution.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{
    CardflowError, Result, ShareLock,
    dispatcher::{ResultProvider, RunId, RunReport, RunStatus},
    events::{ErrorReason, GraphEvent, NodeEvent, WorkflowAbortedEvent, WorkflowEvent, WorkflowFailedEvent, WorkflowStartEvent},
    runtime::Channel,
    utils,
    workflow::{Workflow, node::NodeId},
};

/// Ends a run on drop: clears the running flag and, when the run future was
/// dropped before finishing, aborts the stored report and releases running cards.
struct RunGuard {
    rid: RunId,
    running: Arc<AtomicBool>,
    report: ShareLock<RunReport>,
    workflow: Workflow,
    channel: Arc<Channel>,
    finished: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            let mut completed_steps = 0;
            if let Ok(mut report) = self.report.write() {
                if report.is_running() {
                    *report = report.clone().abort();
                }
                completed_steps = report.completed_steps;
            }
            self.workflow.release_running_cards();
            warn!(rid = %self.rid, completed_steps, "run dropped before finishing");
            self.channel.publish(
                &self.rid,
                &NodeId::new(),
                GraphEvent::Workflow(WorkflowEvent::Aborted(WorkflowAbortedEvent {
                    reason: "interrupted".to_string(),
                    completed_steps,
                })),
            );
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

pub struct Dispatcher {
    /// Channel the run events are published on.
    channel: Arc<Channel>,
    /// Latest report, readable while a run is in progress.
    report: ShareLock<RunReport>,
    /// Set while a run is in progress.
    running: Arc<AtomicBool>,
    /// Cooperative cancellation, checked before each step.
    cancel: Arc<AtomicBool>,
    /// Simulated latency before each provider call.
    step_delay: Duration,
}

impl Dispatcher {
    pub fn new(
        channel: Arc<Channel>,
        step_delay: Duration,
    ) -> Self {
        Self {
            channel,
            report: ShareLock::new(RunReport::idle().into()),
            running: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
            step_delay,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the current (or last) run report.
    pub fn report(&self) -> RunReport {
        self.report.read().unwrap().clone()
    }

    pub fn status(&self) -> RunStatus {
        self.report.read().unwrap().status
    }

    /// Requests the in-progress run to stop before its next step.
    pub fn cancel(&self) {
        if self.is_running() {
            self.cancel.store(true, Ordering::SeqCst);
        }
    }

    /// Returns to idle and clears every card's status, result and error.
    pub fn reset(
        &self,
        workflow: &Workflow,
    ) -> Result<()> {
        if self.is_running() {
            return Err(CardflowError::Busy);
        }
        let rid = self.report.read().unwrap().run_id.clone();
        *self.report.write().unwrap() = RunReport::idle();
        workflow.reset_cards();
        self.channel.publish(&rid, &NodeId::new(), GraphEvent::Workflow(WorkflowEvent::Reset));
        debug!(rid = %rid, "run state reset");
        Ok(())
    }

    /// Runs every card node of `workflow` for every symbol.
    ///
    /// Fails only when another run is already in progress; step failures are
    /// recorded in the returned report.
    pub async fn run(
        &self,
        workflow: &Workflow,
        symbols: &[String],
        provider: &dyn ResultProvider,
    ) -> Result<RunReport> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CardflowError::Engine("a run is already in progress".to_string()));
        }
        self.cancel.store(false, Ordering::SeqCst);

        let rid: RunId = utils::longid();
        let mut guard = RunGuard {
            rid: rid.clone(),
            running: self.running.clone(),
            report: self.report.clone(),
            workflow: workflow.clone(),
            channel: self.channel.clone(),
            finished: false,
        };
        let cards = workflow.card_nodes();
        let total_steps = cards.len() * symbols.len();

        let mut report = RunReport::begin(rid.clone(), symbols.to_vec(), total_steps);
        self.store(&report);

        info!(rid = %rid, cards = cards.len(), symbols = symbols.len(), total_steps, "run started");
        self.channel.publish(
            &rid,
            &NodeId::new(),
            GraphEvent::Workflow(WorkflowEvent::Start(WorkflowStartEvent {
                node_ids: cards.iter().map(|c| c.id.clone()).collect(),
                symbols: symbols.to_vec(),
                total_steps,
            })),
        );

        let mut aborted = false;
        'run: for symbol in symbols {
            for card in cards.iter() {
                if self.cancel.load(Ordering::SeqCst) {
                    aborted = true;
                    break 'run;
                }

                workflow.mark_card_running(&card.id, symbol);
                report = report.begin_step();
                self.store(&report);
                self.channel.publish(
                    &rid,
                    &card.id,
                    GraphEvent::Node(NodeEvent::Running {
                        symbol: symbol.clone(),
                        progress: report.progress,
                    }),
                );

                if !self.step_delay.is_zero() {
                    tokio::time::sleep(self.step_delay).await;
                }

                let outcome = provider.resolve(&card.card_type, symbol).await.map_err(|e| e.to_string());
                workflow.apply_card_outcome(&card.id, &outcome);

                let event = match &outcome {
                    Ok(_) => NodeEvent::Succeeded {
                        symbol: symbol.clone(),
                    },
                    Err(message) => {
                        warn!(rid = %rid, nid = %card.id, symbol = %symbol, error = %message, "step failed");
                        NodeEvent::Error {
                            symbol: symbol.clone(),
                            reason: ErrorReason::Failed(message.clone()),
                        }
                    }
                };

                report = report.apply_step(&card.id, symbol, outcome);
                self.store(&report);
                self.channel.publish(&rid, &card.id, GraphEvent::Node(event));
            }
        }

        let final_event = if aborted {
            report = report.abort();
            WorkflowEvent::Aborted(WorkflowAbortedEvent {
                reason: "cancelled".to_string(),
                completed_steps: report.completed_steps,
            })
        } else {
            report = report.finish();
            let summary = report.summary();
            if report.status == RunStatus::Error {
                WorkflowEvent::Failed(WorkflowFailedEvent {
                    failed: summary.failed,
                    succeeded: summary.succeeded,
                })
            } else {
                WorkflowEvent::Succeeded
            }
        };
        self.store(&report);

        let summary = report.summary();
        info!(
            rid = %rid,
            status = report.status.as_ref(),
            succeeded = summary.succeeded,
            failed = summary.failed,
            aborted = report.aborted,
            "run finished"
        );
        self.channel.publish(&rid, &NodeId::new(), GraphEvent::Workflow(final_event));
        guard.finished = true;

        Ok(report)
    }

    fn store(
        &self,
        report: &RunReport,
    ) {
        *self.report.write().unwrap() = report.clone();
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use serde_json::json;

    use super::Dispatcher;
    use crate::{
        CardflowError, Result,
        dispatcher::{ResultProvider, RunStatus},
        events::{GraphEvent, NodeEvent, WorkflowEvent},
        runtime::{Channel, ChannelEvent, ChannelOptions},
        workflow::{
            Graph, Workflow,
            edge::Edge,
            node::{AnalysisResult, CardStatus, MergeStrategy, Node},
        },
    };

    /// Succeeds with the card type and symbol, except for the listed pairs.
    struct FakeProvider {
        fail: Vec<(String, String)>,
    }

    impl FakeProvider {
        fn ok() -> Self {
            Self {
                fail: Vec::new(),
            }
        }

        fn failing(
            card_type: &str,
            symbol: &str,
        ) -> Self {
            Self {
                fail: vec![(card_type.to_string(), symbol.to_string())],
            }
        }
    }

    #[async_trait]
    impl ResultProvider for FakeProvider {
        async fn resolve(
            &self,
            card_type: &str,
            symbol: &str,
        ) -> Result<AnalysisResult> {
            if self.fail.iter().any(|(c, s)| c == card_type && s == symbol) {
                return Err(CardflowError::Provider(format!("no data for {}", symbol)));
            }
            Ok(json!({"card": card_type, "symbol": symbol}))
        }
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn dispatcher() -> (Dispatcher, Arc<Channel>) {
        let channel = Arc::new(Channel::new());
        (Dispatcher::new(channel.clone(), Duration::ZERO), channel)
    }

    #[tokio::test]
    async fn test_end_to_end_two_symbols() {
        let workflow = Workflow::from(Graph::from_parts(vec![Node::card("n1", "valuation-summary")], vec![]).unwrap());
        let (dispatcher, _) = dispatcher();

        let report = dispatcher.run(&workflow, &symbols(&["TCS", "INFY"]), &FakeProvider::ok()).await.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.progress, 100);
        assert_eq!(report.results.keys().cloned().collect::<Vec<_>>(), vec!["n1-INFY".to_string(), "n1-TCS".to_string()]);
        assert!(report.errors.is_empty());

        let card = workflow.get_node("n1").unwrap().as_card().cloned().unwrap();
        assert_eq!(card.status, CardStatus::Success);
        assert_eq!(card.symbol.as_deref(), Some("INFY"));
        assert!(!dispatcher.is_running());
        assert_eq!(dispatcher.report(), report);
    }

    #[tokio::test]
    async fn test_single_symbol_key_scheme() {
        let workflow = Workflow::from(Graph::from_parts(vec![Node::card("n1", "dcf"), Node::card("n2", "dcf")], vec![]).unwrap());
        let (dispatcher, _) = dispatcher();
        let report = dispatcher.run(&workflow, &symbols(&["TCS"]), &FakeProvider::ok()).await.unwrap();
        assert!(report.results.contains_key("n1"));
        assert!(report.results.contains_key("n2"));
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let workflow = Workflow::from(
            Graph::from_parts(
                vec![Node::card("n1", "dcf"), Node::card("n2", "ratios"), Node::merge("m", MergeStrategy::All)],
                vec![Edge::new("e1", "n1", "m"), Edge::new("e2", "n2", "m")],
            )
            .unwrap(),
        );
        let (dispatcher, _) = dispatcher();
        let report = dispatcher.run(&workflow, &symbols(&["TCS", "INFY"]), &FakeProvider::failing("ratios", "TCS")).await.unwrap();

        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors["n2-TCS"], "no data for TCS");
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.total_steps, 4);
        // the later INFY step overwrote the node's visible status
        assert_eq!(workflow.get_node("n2").unwrap().as_card().unwrap().status, CardStatus::Success);
    }

    #[tokio::test]
    async fn test_events_follow_symbol_major_order() {
        let workflow = Workflow::from(Graph::from_parts(vec![Node::card("a", "dcf"), Node::card("b", "dcf")], vec![]).unwrap());
        let (dispatcher, channel) = dispatcher();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        ChannelEvent::channel(channel, ChannelOptions::default()).unwrap().on_event(move |e| {
            if let GraphEvent::Node(NodeEvent::Running {
                symbol,
                progress,
            }) = &e.event
            {
                sink.lock().unwrap().push(format!("{}:{}:{}", e.nid, symbol, progress));
            }
        });

        dispatcher.run(&workflow, &symbols(&["TCS", "INFY"]), &FakeProvider::ok()).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["a:TCS:25", "b:TCS:50", "a:INFY:75", "b:INFY:100"]);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let workflow = Workflow::from(Graph::from_parts(vec![Node::card("n1", "dcf")], vec![]).unwrap());
        let (dispatcher, channel) = dispatcher();
        let mut rx = channel.subscribe();

        dispatcher.run(&workflow, &symbols(&["TCS"]), &FakeProvider::failing("dcf", "TCS")).await.unwrap();
        assert_eq!(dispatcher.status(), RunStatus::Error);

        dispatcher.reset(&workflow).unwrap();
        assert_eq!(dispatcher.status(), RunStatus::Idle);
        let card = workflow.get_node("n1").unwrap().as_card().cloned().unwrap();
        assert_eq!(card.status, CardStatus::Idle);
        assert!(card.error.is_none());

        let mut last = None;
        while let Ok(e) = rx.try_recv() {
            last = Some(e.event.clone());
        }
        assert_eq!(last, Some(GraphEvent::Workflow(WorkflowEvent::Reset)));
    }

    #[tokio::test]
    async fn test_no_cards_completes_immediately() {
        let workflow = Workflow::from(Graph::from_parts(vec![Node::merge("m", MergeStrategy::Any)], vec![]).unwrap());
        let (dispatcher, _) = dispatcher();
        let report = dispatcher.run(&workflow, &symbols(&["TCS"]), &FakeProvider::ok()).await.unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.progress, 100);
        assert_eq!(report.total_steps, 0);
    }

    /// Cancels the run from inside the first provider call.
    struct CancellingProvider {
        dispatcher: Arc<Dispatcher>,
    }

    #[async_trait]
    impl ResultProvider for CancellingProvider {
        async fn resolve(
            &self,
            _: &str,
            _: &str,
        ) -> Result<AnalysisResult> {
            self.dispatcher.cancel();
            Ok(json!(null))
        }
    }

    #[tokio::test]
    async fn test_cancel_before_next_step() {
        let workflow = Workflow::from(Graph::from_parts(vec![Node::card("a", "dcf"), Node::card("b", "dcf")], vec![]).unwrap());
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(Channel::new()), Duration::ZERO));
        let provider = CancellingProvider {
            dispatcher: dispatcher.clone(),
        };

        let report = dispatcher.run(&workflow, &symbols(&["TCS"]), &provider).await.unwrap();
        assert!(report.aborted);
        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(report.completed_steps, 1);
        assert!(report.results.contains_key("a"));
        assert_eq!(workflow.get_node("b").unwrap().as_card().unwrap().status, CardStatus::Idle);
    }

    /// Signals once the first step is in flight, then never resolves.
    struct StalledProvider {
        entered: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl ResultProvider for StalledProvider {
        async fn resolve(
            &self,
            _: &str,
            _: &str,
        ) -> Result<AnalysisResult> {
            self.entered.notify_one();
            std::future::pending::<()>().await;
            Ok(json!(null))
        }
    }

    #[tokio::test]
    async fn test_dropped_run_is_aborted() {
        let workflow = Workflow::from(Graph::from_parts(vec![Node::card("a", "dcf"), Node::card("b", "dcf")], vec![]).unwrap());
        let (dispatcher, channel) = dispatcher();
        let dispatcher = Arc::new(dispatcher);
        let mut rx = channel.subscribe();

        let entered = Arc::new(tokio::sync::Notify::new());
        let provider = StalledProvider {
            entered: entered.clone(),
        };
        let runner = dispatcher.clone();
        let run_workflow = workflow.clone();
        let handle = tokio::spawn(async move { runner.run(&run_workflow, &symbols(&["TCS"]), &provider).await });

        entered.notified().await;
        assert_eq!(workflow.get_node("a").unwrap().as_card().unwrap().status, CardStatus::Running);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        assert!(!dispatcher.is_running());
        let report = dispatcher.report();
        assert_eq!(report.status, RunStatus::Error);
        assert!(report.aborted);
        assert_eq!(report.completed_steps, 1);
        assert!(report.finished_at.is_some());
        assert_eq!(workflow.get_node("a").unwrap().as_card().unwrap().status, CardStatus::Idle);

        let mut last = None;
        while let Ok(e) = rx.try_recv() {
            last = Some(e.event.clone());
        }
        assert!(matches!(last, Some(GraphEvent::Workflow(WorkflowEvent::Aborted(_)))));

        // a fresh run starts normally afterwards
        let report = dispatcher.run(&workflow, &symbols(&["TCS"]), &FakeProvider::ok()).await.unwrap();
        assert_eq!(report.status, RunStatus::Completed);
    }
}
