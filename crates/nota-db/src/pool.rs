//! PostgreSQL pool setup for the note store.
//!
//! A note app issues short single-row queries; a handful of connections
//! is plenty, and a slow database should surface quickly to the autosave
//! engine rather than stall it.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use nota_core::{Error, Result};

/// Connections opened at most.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Seconds to wait for a free connection.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Sizing for the note store pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long `acquire` waits before failing with a storage error.
    pub acquire_timeout: Duration,
    /// Idle connections are closed after this long. `None` keeps them.
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Some(Duration::from_secs(300)),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `DATABASE_MAX_CONNECTIONS` and `DATABASE_CONNECT_TIMEOUT_SECS`.
    ///
    /// Missing or unparseable values keep the defaults; a zero connection
    /// limit is raised to one.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS")
            .unwrap_or(defaults.max_connections)
            .max(1);
        let acquire_timeout = env_parse("DATABASE_CONNECT_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.acquire_timeout);

        Self {
            max_connections,
            acquire_timeout,
            ..defaults
        }
    }

    pub fn max_connections(self, max_connections: u32) -> Self {
        Self {
            max_connections,
            ..self
        }
    }

    pub fn min_connections(self, min_connections: u32) -> Self {
        Self {
            min_connections,
            ..self
        }
    }

    pub fn connect_timeout(self, acquire_timeout: Duration) -> Self {
        Self {
            acquire_timeout,
            ..self
        }
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections.min(self.max_connections))
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// Connect with [`PoolConfig::default`].
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();
    let pool = config
        .options()
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Note store pool ready"
    );
    Ok(pool)
}

/// Emit pool occupancy; warns when every connection is checked out.
pub fn log_pool_metrics(pool: &PgPool) {
    let (size, idle) = (pool.size(), pool.num_idle() as u32);
    if size > 0 && idle == 0 {
        warn!(
            subsystem = "database",
            component = "pool",
            pool_size = size,
            "All note store connections are busy"
        );
    } else {
        debug!(
            subsystem = "database",
            component = "pool",
            pool_size = size,
            pool_idle = idle,
            "Note store pool occupancy"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_suit_a_small_app() {
        let config = PoolConfig::new();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.min_connections, 0);
        assert_eq!(config.acquire_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builders_only_touch_their_field() {
        let config = PoolConfig::new()
            .max_connections(1)
            .connect_timeout(Duration::from_secs(2));
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.acquire_timeout, Duration::from_secs(2));
        assert_eq!(config.idle_timeout, PoolConfig::default().idle_timeout);
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        std::env::set_var("NOTA_POOL_TEST_VALUE", " 7 ");
        assert_eq!(env_parse::<u32>("NOTA_POOL_TEST_VALUE"), Some(7));
        std::env::set_var("NOTA_POOL_TEST_VALUE", "seven");
        assert_eq!(env_parse::<u32>("NOTA_POOL_TEST_VALUE"), None);
        std::env::remove_var("NOTA_POOL_TEST_VALUE");
    }
}
