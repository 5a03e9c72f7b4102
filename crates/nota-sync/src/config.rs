//! Autosave configuration.

use std::time::Duration;

use nota_core::defaults;

/// Configuration for the autosave engine.
#[derive(Debug, Clone)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a save starts.
    pub debounce: Duration,
    /// Upper bound on one persist round-trip; exceeding it is a save failure.
    pub persist_timeout: Duration,
    /// Broadcast buffer for autosave events.
    pub event_capacity: usize,
    /// Per-session command channel capacity.
    pub command_capacity: usize,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(defaults::AUTOSAVE_DEBOUNCE_MS),
            persist_timeout: Duration::from_millis(defaults::AUTOSAVE_PERSIST_TIMEOUT_MS),
            event_capacity: defaults::EVENT_BUS_CAPACITY,
            command_capacity: defaults::AUTOSAVE_COMMAND_CAPACITY,
        }
    }
}

impl AutosaveConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTA_AUTOSAVE_DEBOUNCE_MS` | `1000` | Quiet period before a save |
    /// | `NOTA_AUTOSAVE_TIMEOUT_MS` | `10000` | Persist timeout |
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = std::env::var("NOTA_AUTOSAVE_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.debounce = Duration::from_millis(ms);
        }

        if let Some(ms) = std::env::var("NOTA_AUTOSAVE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            config.persist_timeout = Duration::from_millis(ms);
        }

        config
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
