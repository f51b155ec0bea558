//! Editor session engine - the main entry point for Cardflow.
//!
//! The engine owns everything one editor session needs:
//! - The live workflow graph and its symbol list
//! - Undo/redo history and the clipboard slot
//! - The dispatcher that runs the graph, and the event channel it publishes on
//! - The store used to save and reopen workflows
//!
//! Structural edits are rejected with [`CardflowError::Busy`] while a run is
//! in progress, so the dispatcher is the only writer during a run.

use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::{
    CardflowError, Config, Result, ShareLock,
    catalog::{CardCatalog, CardMeta, TemplateCatalog},
    clipboard::{self, Clipboard},
    dispatcher::{Dispatcher, ResultProvider, RunReport, RunStatus},
    history::History,
    layout,
    model::{OutputMode, WorkflowModel},
    runtime::Channel,
    store::{MemStore, WorkflowStore, data},
    utils,
    validator::{self, RunGate, ValidationResult},
    workflow::{
        Graph, Workflow,
        edge::{Edge, EdgeId},
        node::{Node, NodeId, Position},
    },
};

/// What happened to a run request after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The run went ahead.
    Ran(RunReport),
    /// Only non-blocking issues; ask the user and retry with `confirmed`.
    NeedsConfirmation(ValidationResult),
    /// Blocking errors; the run cannot start.
    Blocked(ValidationResult),
}

/// One editor session.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().build()?;
/// engine.add_node(Node::card("n1", "valuation-summary"))?;
/// engine.set_symbols(vec!["TCS".to_string()])?;
///
/// match engine.request_run(&provider, false).await? {
///     RunOutcome::Ran(report) => println!("{:?}", report.status),
///     RunOutcome::NeedsConfirmation(issues) => { /* ask, then request_run(.., true) */ }
///     RunOutcome::Blocked(issues) => { /* show issues */ }
/// }
/// ```
pub struct Engine {
    /// Id of the workflow record this session edits.
    id: ShareLock<String>,
    name: ShareLock<String>,
    output_mode: ShareLock<OutputMode>,
    symbols: ShareLock<Vec<String>>,

    /// Live graph, shared with the dispatcher.
    workflow: Workflow,
    history: ShareLock<History>,
    clipboard: ShareLock<Clipboard>,

    dispatcher: Dispatcher,
    channel: Arc<Channel>,
    store: Arc<dyn WorkflowStore>,

    config: Config,
}

impl Engine {
    /// Creates a new session with the given configuration and an in-memory store.
    pub fn new_with_config(config: Config) -> Self {
        let store = Arc::new(MemStore::new(config.store.capacity));
        Self::new_with_store(config, store)
    }

    pub fn new_with_store(
        config: Config,
        store: Arc<dyn WorkflowStore>,
    ) -> Self {
        let channel = Arc::new(Channel::new());
        let dispatcher = Dispatcher::new(channel.clone(), config.executor.step_delay());

        Self {
            id: Arc::new(RwLock::new(utils::longid())),
            name: Arc::new(RwLock::new("Untitled workflow".to_string())),
            output_mode: Arc::new(RwLock::new(OutputMode::default())),
            symbols: Arc::new(RwLock::new(Vec::new())),
            workflow: Workflow::new(),
            history: Arc::new(RwLock::new(History::new(config.history_capacity))),
            clipboard: Arc::new(RwLock::new(Clipboard::new())),
            dispatcher,
            channel,
            store,
            config,
        }
    }

    pub fn id(&self) -> String {
        self.id.read().unwrap().clone()
    }

    pub fn name(&self) -> String {
        self.name.read().unwrap().clone()
    }

    pub fn set_name(
        &self,
        name: impl Into<String>,
    ) {
        *self.name.write().unwrap() = name.into();
    }

    pub fn output_mode(&self) -> OutputMode {
        *self.output_mode.read().unwrap()
    }

    pub fn set_output_mode(
        &self,
        mode: OutputMode,
    ) {
        *self.output_mode.write().unwrap() = mode;
    }

    pub fn symbols(&self) -> Vec<String> {
        self.symbols.read().unwrap().clone()
    }

    /// Replaces the symbol list; rejected while a run is in progress.
    pub fn set_symbols(
        &self,
        symbols: Vec<String>,
    ) -> Result<()> {
        self.ensure_idle()?;
        *self.symbols.write().unwrap() = symbols;
        Ok(())
    }

    /// Deep copy of the live graph; changes to it do not reach the session.
    pub fn graph(&self) -> Graph {
        self.workflow.snapshot()
    }

    /// Returns the event channel runs publish on.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Human-readable dump of the graph.
    pub fn schema(&self) -> String {
        self.workflow.schema()
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.dispatcher.is_running() {
            return Err(CardflowError::Busy);
        }
        Ok(())
    }

    /// Applies a history-worthy edit: the pre-edit graph is recorded only if `f` succeeds.
    fn edit<R>(
        &self,
        f: impl FnOnce(&mut Graph) -> Result<R>,
    ) -> Result<R> {
        self.ensure_idle()?;
        self.workflow.update(|graph| {
            let mut next = graph.clone();
            let out = f(&mut next)?;
            self.history.write().unwrap().save_state(graph);
            *graph = next;
            Ok(out)
        })
    }

    /// Replaces the graph with what `f` derives from it; nothing is recorded when `f` returns `None`.
    fn edit_if(
        &self,
        f: impl FnOnce(&Graph) -> Option<Graph>,
    ) -> Result<bool> {
        self.ensure_idle()?;
        self.workflow.update(|graph| {
            let Some(next) = f(graph) else {
                return Ok(false);
            };
            self.history.write().unwrap().save_state(graph);
            *graph = next;
            Ok(true)
        })
    }

    /// Replaces the graph wholesale as one undoable action.
    fn apply(
        &self,
        next: Graph,
    ) -> Result<()> {
        self.edit(move |graph| {
            *graph = next;
            Ok(())
        })
    }

    pub fn add_node(
        &self,
        node: Node,
    ) -> Result<()> {
        self.edit(|graph| graph.add_node(node))
    }

    /// Removes a node and its incident edges.
    pub fn remove_node(
        &self,
        id: &str,
    ) -> Result<Node> {
        self.edit(|graph| graph.remove_node(id).ok_or(CardflowError::Node(format!("node {} not found", id))))
    }

    pub fn connect(
        &self,
        edge: Edge,
    ) -> Result<()> {
        self.edit(|graph| graph.add_edge(edge))
    }

    pub fn disconnect(
        &self,
        id: &EdgeId,
    ) -> Result<Edge> {
        self.edit(|graph| graph.remove_edge(id).ok_or(CardflowError::Edge(format!("edge {} not found", id))))
    }

    pub fn move_node(
        &self,
        id: &str,
        position: Position,
    ) -> Result<()> {
        self.edit(|graph| graph.move_node(id, position))
    }

    /// Selects exactly `ids`; selection is not recorded in history.
    pub fn select(
        &self,
        ids: &[NodeId],
    ) {
        self.workflow.update(|graph| graph.select(ids));
    }

    pub fn clear_selection(&self) {
        self.workflow.update(Graph::clear_selection);
    }

    pub fn can_undo(&self) -> bool {
        self.history.read().unwrap().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.read().unwrap().can_redo()
    }

    /// Restores the previous snapshot; returns false when there is nothing to undo.
    pub fn undo(&self) -> Result<bool> {
        self.restore(|history, current| history.undo(current))
    }

    /// Re-applies the next snapshot; returns false when there is nothing to redo.
    pub fn redo(&self) -> Result<bool> {
        self.restore(|history, current| history.redo(current))
    }

    fn restore(
        &self,
        step: impl FnOnce(&mut History, &Graph) -> Option<Graph>,
    ) -> Result<bool> {
        self.ensure_idle()?;
        self.workflow.update(|graph| {
            let mut history = self.history.write().unwrap();
            let Some(snapshot) = step(&mut history, graph) else {
                return Ok(false);
            };
            // recording the applied snapshot consumes the history's re-entrancy guard
            history.save_state(&snapshot);
            *graph = snapshot;
            Ok(true)
        })
    }

    /// Copies the selected nodes and the edges between them; returns the number of nodes copied.
    pub fn copy(&self) -> usize {
        self.workflow.read(|graph| {
            let selected = graph.selected_nodes();
            self.clipboard.write().unwrap().copy(&selected, &graph.edges).map(|p| p.nodes.len()).unwrap_or(0)
        })
    }

    /// Pastes the clipboard; returns false when it is empty.
    pub fn paste(&self) -> Result<bool> {
        let offset = self.config.paste_offset;
        self.edit_if(|graph| self.clipboard.read().unwrap().paste(&graph.nodes, &graph.edges, offset))
    }

    /// Duplicates the selection; returns false when nothing is selected.
    pub fn duplicate(&self) -> Result<bool> {
        let offset = self.config.paste_offset;
        self.edit_if(|graph| clipboard::duplicate(&graph.selected_nodes(), &graph.nodes, &graph.edges, offset))
    }

    /// Deletes the selection; returns the number of nodes removed.
    pub fn delete_selected(&self) -> Result<usize> {
        let mut removed = 0;
        self.edit_if(|graph| {
            let selected = graph.selected_nodes();
            removed = selected.len();
            (!selected.is_empty()).then(|| clipboard::delete_selected(&selected, &graph.nodes, &graph.edges))
        })?;
        Ok(removed)
    }

    /// Repositions every node with the configured layout options.
    pub fn auto_layout(&self) -> Result<()> {
        let options = self.config.layout;
        self.edit(|graph| {
            graph.nodes = layout::layout(&graph.nodes, &graph.edges, &options);
            Ok(())
        })
    }

    /// Replaces the graph with a catalog template, laid out.
    pub fn load_template(
        &self,
        catalog: &dyn TemplateCatalog,
        name: &str,
    ) -> Result<()> {
        let template = catalog.template(name).ok_or(CardflowError::Workflow(format!("template {} not found", name)))?;
        let mut graph = Graph::from_parts(template.nodes, template.edges)?;
        graph.nodes = layout::layout(&graph.nodes, &graph.edges, &self.config.layout);
        self.apply(graph)?;
        info!(template = %name, nodes = self.workflow.node_count(), "template loaded");
        Ok(())
    }

    /// Card catalog metadata for a card node.
    pub fn describe_card(
        &self,
        catalog: &dyn CardCatalog,
        node_id: &str,
    ) -> Option<CardMeta> {
        let node = self.workflow.get_node(node_id)?;
        catalog.describe(&node.as_card()?.card_type)
    }

    pub fn validate(&self) -> ValidationResult {
        let symbols = self.symbols();
        self.workflow.read(|graph| validator::validate(&graph.nodes, &graph.edges, &symbols))
    }

    /// Validates, then runs only if the gate allows it.
    ///
    /// With issues that do not block, the run goes ahead only when `confirmed`.
    pub async fn request_run(
        &self,
        provider: &dyn ResultProvider,
        confirmed: bool,
    ) -> Result<RunOutcome> {
        let validation = self.validate();
        match validation.gate() {
            RunGate::Blocked => Ok(RunOutcome::Blocked(validation)),
            RunGate::Confirm if !confirmed => Ok(RunOutcome::NeedsConfirmation(validation)),
            RunGate::Proceed | RunGate::Confirm => Ok(RunOutcome::Ran(self.run(provider).await?)),
        }
    }

    /// Runs the graph against the current symbols without validating.
    pub async fn run(
        &self,
        provider: &dyn ResultProvider,
    ) -> Result<RunReport> {
        let symbols = self.symbols();
        self.dispatcher.run(&self.workflow, &symbols, provider).await
    }

    pub fn is_running(&self) -> bool {
        self.dispatcher.is_running()
    }

    pub fn run_status(&self) -> RunStatus {
        self.dispatcher.status()
    }

    pub fn report(&self) -> RunReport {
        self.dispatcher.report()
    }

    /// Asks an in-progress run to stop before its next step.
    pub fn cancel(&self) {
        self.dispatcher.cancel();
    }

    /// Clears the run report and all card statuses.
    pub fn reset(&self) -> Result<()> {
        self.dispatcher.reset(&self.workflow)
    }

    /// Serializable record of this session.
    pub fn to_model(&self) -> WorkflowModel {
        let graph = self.workflow.snapshot();
        WorkflowModel {
            id: self.id(),
            name: self.name(),
            nodes: graph.nodes,
            edges: graph.edges,
            output_mode: self.output_mode(),
            symbols: self.symbols(),
        }
    }

    /// Replaces the session with a stored record; history and clipboard start empty.
    pub fn from_model(
        &self,
        model: &WorkflowModel,
    ) -> Result<()> {
        self.ensure_idle()?;
        let mut graph = Graph::try_from(model)?;
        graph.reset_transient();

        self.workflow.replace(graph);
        self.history.write().unwrap().clear();
        self.clipboard.write().unwrap().clear();
        *self.id.write().unwrap() = model.id.clone();
        self.set_name(model.name.clone());
        self.set_output_mode(model.output_mode);
        *self.symbols.write().unwrap() = model.symbols.clone();
        debug!(id = %model.id, "workflow loaded");
        Ok(())
    }

    /// Saves the session to the store; returns the workflow id.
    pub fn save(&self) -> Result<String> {
        let model = self.to_model();
        let now = utils::time::time_millis();
        self.store.save(&data::Workflow {
            id: model.id.clone(),
            name: model.name.clone(),
            data: model.to_json()?,
            create_time: now,
            update_time: now,
        })?;
        info!(id = %model.id, name = %model.name, "workflow saved");
        Ok(model.id)
    }

    /// Opens a stored workflow into this session.
    pub fn open(
        &self,
        id: &str,
    ) -> Result<()> {
        let record = self.store.find(id)?;
        let model = WorkflowModel::from_json(&record.data)?;
        self.from_model(&model)
    }

    pub fn list_saved(&self) -> Result<Vec<data::Workflow>> {
        self.store.list()
    }

    pub fn delete_saved(
        &self,
        id: &str,
    ) -> Result<bool> {
        self.store.delete(id)
    }
}
