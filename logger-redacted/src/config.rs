// Logger configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default filter directive, e.g. `info` or `billing_service=debug`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    pub redaction_enabled: bool,
    /// Replace redacted values by a short hash so occurrences can be correlated
    pub hash_for_correlation: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            redaction_enabled: true,
            hash_for_correlation: false,
        }
    }
}
