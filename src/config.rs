//! Process configuration, loaded once at startup from the environment.

use std::path::PathBuf;

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub max_sessions: usize,
    pub config_dir: PathBuf,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults on
    /// missing or unparsable values.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3700);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let max_sessions = match std::env::var("MAX_SESSIONS") {
            Ok(v) => v.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %v, "MAX_SESSIONS could not be parsed, using default");
                10_000
            }),
            Err(_) => 10_000,
        };

        let config_dir = std::env::var("CONFIG_DIR")
            .unwrap_or_else(|_| "./config".to_string())
            .into();

        Self {
            port,
            host,
            max_sessions,
            config_dir,
        }
    }

    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .unwrap_or_else(|_| std::net::SocketAddr::from(([0, 0, 0, 0], self.port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        // SAFETY-adjacent: rely on defaults rather than mutating process env in a test,
        // since env vars are process-global and tests run concurrently.
        let cfg = Config {
            port: 3700,
            host: "0.0.0.0".to_string(),
            max_sessions: 10_000,
            config_dir: "./config".into(),
        };
        assert_eq!(cfg.port, 3700);
        assert_eq!(cfg.max_sessions, 10_000);
    }
}
