//! Connection configuration for the search cluster.

use std::env;
use std::time::Duration;

/// Default host when neither `ES_URI` nor `ES_HOST` is set.
const DEFAULT_HOST: &str = "localhost";

/// Default port when `ES_PORT` is not set.
const DEFAULT_PORT: u16 = 9200;

/// Default pool checkout timeout in seconds.
const DEFAULT_CHECKOUT_TIMEOUT_SECS: f64 = 5.0;

/// Connection settings for the search cluster, resolved from the
/// environment.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Cluster base URI.
    pub uri: String,
    /// Maximum concurrently checked-out connections.
    pub conn_pool: usize,
    /// Connections kept idle between checkouts.
    pub idle_pool: usize,
    /// How long a checkout may wait for a free connection.
    pub checkout_timeout: Duration,
}

impl SearchConfig {
    /// Resolve the configuration from the environment.
    ///
    /// `ES_URI` wins over `ES_HOST`/`ES_PORT`/`ES_TLS`. Pool sizing defaults
    /// to one connection per managed table with a quarter kept idle;
    /// `ES_CONN_POOL`, `ES_IDLE_POOL` and `ES_CONN_POOL_TIMEOUT` (seconds)
    /// override.
    pub fn from_env(managed_tables: usize) -> Self {
        let uri = env::var("ES_URI").unwrap_or_else(|_| {
            let host = env::var("ES_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
            let port = env::var("ES_PORT")
                .ok()
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT);
            let scheme = if env::var("ES_TLS").map(|value| value == "true").unwrap_or(false) {
                "https"
            } else {
                "http"
            };
            format!("{scheme}://{host}:{port}")
        });

        let conn_pool = env::var("ES_CONN_POOL")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(|| managed_tables.max(1));
        let idle_pool = env::var("ES_IDLE_POOL")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(|| (conn_pool / 4).max(1));
        let checkout_timeout = env::var("ES_CONN_POOL_TIMEOUT")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .unwrap_or(DEFAULT_CHECKOUT_TIMEOUT_SECS);

        Self {
            uri,
            conn_pool,
            idle_pool,
            checkout_timeout: Duration::from_secs_f64(checkout_timeout),
        }
    }
}
