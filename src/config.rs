use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::{Result, clipboard::DEFAULT_PASTE_OFFSET, history::DEFAULT_HISTORY_CAPACITY, layout::LayoutOptions, workflow::node::Position};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// number of undo snapshots kept, defaults to 50
    pub history_capacity: usize,
    /// offset applied to pasted and duplicated nodes, defaults to (50, 50)
    pub paste_offset: Position,
    /// auto-layout options
    pub layout: LayoutOptions,
    /// executor config
    pub executor: ExecutorConfig,
    /// store config
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// simulated latency before each step in milliseconds, 0 disables it
    pub step_delay_ms: u64,
}

impl ExecutorConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// maximum number of workflows kept by the in-memory store
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            paste_offset: DEFAULT_PASTE_OFFSET,
            layout: LayoutOptions::default(),
            executor: ExecutorConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        Ok(config)
    }
}
