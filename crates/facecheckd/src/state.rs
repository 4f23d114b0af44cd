use crate::config::Config;
use crate::engine::MatchEngine;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: MatchEngine,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, engine: MatchEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            started_at: Instant::now(),
        }
    }

    /// Build state from configuration, constructing the configured comparator.
    pub fn from_config(config: Config) -> Result<Self, crate::config::ConfigError> {
        let engine = MatchEngine::new(config.build_comparator()?, config.policy());
        Ok(Self::new(config, engine))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
