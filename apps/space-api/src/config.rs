use std::time::Duration;

/// Default depth of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Space API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// HMAC secret used to verify bearer tokens.
    pub jwt_secret: String,
    /// PostgreSQL connection string. When unset the in-memory store is used.
    pub database_url: Option<String>,
    /// Frames a connection may have queued before the hub drops it.
    pub outbound_buffer: usize,
    /// Close a live connection after this long without an inbound frame.
    pub idle_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            port: parsed_var("PORT").unwrap_or(8080),
            jwt_secret: required_var("JWT_SECRET"),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            outbound_buffer: parsed_var("WS_OUTBOUND_BUFFER")
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_OUTBOUND_BUFFER),
            idle_timeout: parsed_var("WS_IDLE_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
