use serde::{Deserialize, Serialize};

/// Connection settings for the hosted accounting API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_integrations_base_url")]
    pub integrations_base_url: String,
    /// Business account that owns customers and invoices
    pub business_id: String,
    /// Personal account that owns the connected bank sites
    #[serde(default)]
    pub personal_id: String,
    pub bearer_token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://api.waveapps.com".to_string()
}

fn default_integrations_base_url() -> String {
    "https://integrations.waveapps.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
