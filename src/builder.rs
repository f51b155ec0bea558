use std::{path::Path, sync::Arc, time::Duration};

use crate::{
    CardflowError, Config, Engine, Result, layout::LayoutOptions, store::WorkflowStore, workflow::node::Position,
};

#[derive(Default)]
pub struct EngineBuilder {
    config: Config,
    store: Option<Arc<dyn WorkflowStore>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    /// Loads the configuration from a TOML file.
    pub fn config_file<T: AsRef<Path>>(
        mut self,
        path: T,
    ) -> Result<Self> {
        self.config = Config::create(path)?;
        Ok(self)
    }

    pub fn history_capacity(
        mut self,
        n: usize,
    ) -> Self {
        self.config.history_capacity = n;
        self
    }

    pub fn paste_offset(
        mut self,
        offset: Position,
    ) -> Self {
        self.config.paste_offset = offset;
        self
    }

    pub fn layout(
        mut self,
        options: LayoutOptions,
    ) -> Self {
        self.config.layout = options;
        self
    }

    pub fn step_delay(
        mut self,
        delay: Duration,
    ) -> Self {
        self.config.executor.step_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Uses `store` instead of the default in-memory store.
    pub fn store(
        mut self,
        store: Arc<dyn WorkflowStore>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(&self) -> Result<Engine> {
        if self.config.history_capacity == 0 {
            return Err(CardflowError::Config("history_capacity must be greater than 0".to_string()));
        }
        if self.config.store.capacity == 0 {
            return Err(CardflowError::Config("store capacity must be greater than 0".to_string()));
        }

        let engine = match &self.store {
            Some(store) => Engine::new_with_store(self.config.clone(), store.clone()),
            None => Engine::new_with_config(self.config.clone()),
        };

        Ok(engine)
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use crate::{CardflowError, EngineBuilder, store::MemStore, workflow::node::Node};

    #[test]
    fn test_build_defaults() {
        let engine = EngineBuilder::new().build().unwrap();
        assert_eq!(engine.config().history_capacity, 50);
        assert!(engine.graph().is_empty());
    }

    #[test]
    fn test_build_rejects_zero_capacity() {
        let err = EngineBuilder::new().history_capacity(0).build().err().unwrap();
        assert!(matches!(err, CardflowError::Config(_)));
    }

    #[test]
    fn test_shared_store() {
        let store = Arc::new(MemStore::default());
        let first = EngineBuilder::new().store(store.clone()).step_delay(Duration::from_millis(5)).build().unwrap();
        first.add_node(Node::card("a", "dcf")).unwrap();
        let id = first.save().unwrap();

        let second = EngineBuilder::new().store(store).build().unwrap();
        second.open(&id).unwrap();
        assert_eq!(second.graph().nodes.len(), 1);
        assert_eq!(first.config().executor.step_delay_ms, 5);
    }
}
