//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the hash server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `80`, `0` auto-assigns).
    pub port: u16,
    /// Seconds between heartbeat comments on each SSE stream.
    pub heartbeat_interval_secs: u64,
    /// Capacity of each session's outbound frame queue.
    pub send_queue_capacity: usize,
    /// Origins allowed for cross-origin requests. `None` allows any origin.
    pub allowed_origins: Option<Vec<String>>,
    /// Max upstream request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 80,
            heartbeat_interval_secs: 30,
            send_queue_capacity: 256,
            allowed_origins: None,
            max_body_bytes: 4 * 1024 * 1024, // 4 MiB
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Heartbeat period as a `Duration` (at least one second).
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}

/// Split a comma-separated origin list, dropping blanks.
///
/// Returns `None` when nothing remains, which means "allow any origin".
pub fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    (!origins.is_empty()).then_some(origins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 80);
        assert_eq!(cfg.heartbeat_interval_secs, 30);
        assert_eq!(cfg.send_queue_capacity, 256);
        assert!(cfg.allowed_origins.is_none());
    }

    #[test]
    fn bind_addr_format() {
        let cfg = ServerConfig {
            host: "127.0.0.1".into(),
            port: 3000,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn heartbeat_interval_never_zero() {
        let cfg = ServerConfig {
            heartbeat_interval_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(1));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: ServerConfig = serde_json::from_str(r#"{"port": 8080}"#).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.heartbeat_interval_secs, 30);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig {
            allowed_origins: Some(vec!["https://a.example".into()]),
            ..ServerConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn parse_origins_splits_and_trims() {
        assert_eq!(
            parse_origins(" https://a.example , https://b.example,"),
            Some(vec!["https://a.example".to_string(), "https://b.example".to_string()])
        );
    }

    #[test]
    fn parse_origins_blank_is_none() {
        assert_eq!(parse_origins(""), None);
        assert_eq!(parse_origins(" , ,"), None);
    }
}
