use crate::error::{BillingError, BillingResult, WriteOperation};
use crate::service::BillingContext;
use accounting_service::{ConnectedSite, REFRESH_STARTED};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct BankRefreshReport {
    /// Sites the provider accepted a refresh for
    pub refreshed: Vec<ConnectedSite>,
    pub messages: Vec<String>,
}

/// Asks the bank feed provider to refresh every connected site, one at a time
pub struct BankConnectionRefresher {
    ctx: BillingContext,
}

impl BankConnectionRefresher {
    pub fn new(ctx: BillingContext) -> Self {
        Self { ctx }
    }

    pub async fn refresh(&self) -> BillingResult<BankRefreshReport> {
        let sites = self.ctx.api.list_connected_sites().await?;
        let pause = Duration::from_millis(self.ctx.config.bank_refresh_pause_ms);
        let mut report = BankRefreshReport::default();

        for site in sites {
            let label = site.name.clone().unwrap_or_else(|| site.id.to_string());
            let response = self
                .ctx
                .api
                .refresh_connected_site(site.id)
                .await
                .map_err(|source| BillingError::RemoteWriteUnreachable {
                    operation: WriteOperation::RefreshBankConnection,
                    url: format!("connected-sites/{}", site.id),
                    source,
                })?;

            if response.is_success() && response.payload.as_deref() == Some(REFRESH_STARTED) {
                info!(site = %label, "Bank connection refresh started");
                report.messages.push(format!("Refresh started for {}", label));
                report.refreshed.push(site);
                // provider rate limit
                tokio::time::sleep(pause).await;
            } else {
                warn!(site = %label, status = response.status, "Bank connection refresh not accepted");
                report.messages.push(format!(
                    "Refresh not accepted for {}: HTTP {} {}",
                    label,
                    response.status,
                    response.payload.unwrap_or_default()
                ));
            }
        }

        Ok(report)
    }
}
