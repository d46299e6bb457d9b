//! Engine configuration.
//!
//! Plain serde structs with defaults; callers load them from JSON or build
//! them in code.

use crate::core::logging::LoggingConfig;
use crate::core::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Aries message type prefix.
pub const DEFAULT_DOC_URI: &str = "https://didcomm.org/";

/// Protocol engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix used when building message types
    pub doc_uri: String,
    /// How long a coprotocol waits for a correlated reply, in milliseconds
    pub time_to_live_ms: u64,
    /// Stamp `~timing` on outbound messages that lack one
    pub stamp_timing: bool,
    /// Send a problem report to the counterparty when an exchange fails
    pub send_problem_reports: bool,
    /// Logging setup
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load config from a JSON document. Missing keys fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the coprotocol time-to-live.
    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the message type prefix.
    pub fn with_doc_uri(mut self, doc_uri: &str) -> Self {
        self.doc_uri = doc_uri.to_string();
        self
    }

    /// Enable or disable problem reports on failure.
    pub fn with_problem_reports(mut self, enabled: bool) -> Self {
        self.send_problem_reports = enabled;
        self
    }

    /// Coprotocol time-to-live as a Duration.
    pub fn time_to_live(&self) -> Duration {
        Duration::from_millis(self.time_to_live_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            doc_uri: DEFAULT_DOC_URI.to_string(),
            time_to_live_ms: 60_000,
            stamp_timing: true,
            send_problem_reports: true,
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.doc_uri, DEFAULT_DOC_URI);
        assert_eq!(config.time_to_live(), Duration::from_secs(60));
        assert!(config.stamp_timing);
        assert!(config.send_problem_reports);
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json(r#"{"time_to_live_ms": 5000}"#).unwrap();
        assert_eq!(config.time_to_live(), Duration::from_secs(5));
        assert_eq!(config.doc_uri, DEFAULT_DOC_URI);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(EngineConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_time_to_live(Duration::from_millis(10))
            .with_doc_uri("did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/")
            .with_problem_reports(false);
        assert_eq!(config.time_to_live(), Duration::from_millis(10));
        assert!(config.doc_uri.starts_with("did:sov"));
        assert!(!config.send_problem_reports);
    }

    #[test]
    fn test_sub_second_time_to_live() {
        let config = EngineConfig::default().with_time_to_live(Duration::from_millis(250));
        assert_eq!(config.time_to_live_ms, 250);
        assert_eq!(config.time_to_live(), Duration::from_millis(250));
    }
}
