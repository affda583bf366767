use accounting_service::AccountingConfig;
use anyhow::{Context, Result};
use billing_service::BillingConfig;
use config::{Config, Environment, File};
use email_service::EmailConfig;
use logger_redacted::LoggerConfig;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "BILLING_OPS";

/// Everything `billing-ops` needs for one run
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Connection to the accounting API; every command fails without it
    pub accounting: Option<AccountingConfig>,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub logging: LoggerConfig,
    /// Falls back to `EmailConfig::from_env()` when absent
    pub email: Option<EmailConfig>,
}

impl AppConfig {
    /// Optional YAML file, overridden by `BILLING_OPS__SECTION__KEY` variables
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid billing-ops configuration")
    }

    pub fn accounting(&self) -> Result<&AccountingConfig> {
        self.accounting
            .as_ref()
            .context("Missing [accounting] configuration (business_id, bearer_token)")
    }

    pub fn email(&self) -> Result<EmailConfig> {
        match &self.email {
            Some(email) => Ok(email.clone()),
            None => EmailConfig::from_env().context("No [email] configuration and no EMAIL_* variables"),
        }
    }
}
