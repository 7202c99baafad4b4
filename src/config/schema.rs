use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExporterConfig {
    #[serde(default = "default_client_state_path")]
    pub client_state_path: PathBuf,

    #[serde(default = "default_metrics_path")]
    #[validate(length(min = 1), custom = "validate_metrics_path")]
    pub metrics_path: String,

    #[serde(default = "default_metrics_port")]
    #[validate(range(min = 1))]
    pub metrics_port: u16,

    /// Omitting the log path disables the log watcher entirely.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,

    /// Upper bound on the state file read performed per scrape.
    #[serde(default = "default_read_timeout_ms")]
    #[validate(range(min = 1))]
    pub read_timeout_ms: u64,

    /// How often the log watcher polls for appended lines.
    #[serde(default = "default_poll_interval_ms")]
    #[validate(range(min = 10))]
    pub poll_interval_ms: u64,

    /// Serve the last successful snapshot for this long instead of
    /// re-reading the state file on every scrape. 0 means every scrape
    /// reads the file.
    #[serde(default)]
    pub cache_ttl_ms: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            client_state_path: default_client_state_path(),
            metrics_path: default_metrics_path(),
            metrics_port: default_metrics_port(),
            log_file_path: None,
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            cache_ttl_ms: 0,
        }
    }
}

fn validate_metrics_path(path: &str) -> Result<(), ValidationError> {
    if !path.starts_with('/') {
        return Err(ValidationError::new("metrics_path_not_absolute"));
    }
    Ok(())
}

fn default_client_state_path() -> PathBuf {
    PathBuf::from("/var/lib/boinc-client/client_state.xml")
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_metrics_port() -> u16 {
    9100
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_poll_interval_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ExporterConfig::default();
        assert_eq!(
            config.client_state_path,
            PathBuf::from("/var/lib/boinc-client/client_state.xml")
        );
        assert_eq!(config.metrics_path, "/metrics");
        assert_eq!(config.metrics_port, 9100);
        assert!(config.log_file_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn metrics_path_must_be_absolute() {
        let config = ExporterConfig {
            metrics_path: "metrics".to_string(),
            ..ExporterConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
