use crate::config::AccountingConfig;
use crate::models::{CustomerId, InvoiceQuery};

/// URL layout of the accounting API
#[derive(Debug, Clone)]
pub struct Endpoints {
    api_base: String,
    integrations_base: String,
    business_id: String,
    personal_id: String,
}

impl Endpoints {
    pub fn new(config: &AccountingConfig) -> Self {
        Self {
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            integrations_base: config.integrations_base_url.trim_end_matches('/').to_string(),
            business_id: config.business_id.clone(),
            personal_id: config.personal_id.clone(),
        }
    }

    fn business(&self) -> String {
        format!("{}/businesses/{}", self.api_base, self.business_id)
    }

    pub fn customers(&self) -> String {
        format!("{}/customers/", self.business())
    }

    pub fn customer(&self, customer_id: CustomerId) -> String {
        format!("{}/customers/{}/", self.business(), customer_id)
    }

    pub fn transaction_history(&self, customer_id: CustomerId) -> String {
        format!(
            "{}/customers/{}/statements/transaction-history/",
            self.business(),
            customer_id
        )
    }

    pub fn invoices(&self, query: InvoiceQuery) -> String {
        format!("{}/invoices/{}", self.business(), query.to_query_string())
    }

    pub fn connected_sites(&self) -> String {
        format!("{}/{}/bank/connected-sites", self.integrations_base, self.personal_id)
    }

    pub fn refresh_connected_site(&self, site_id: i64) -> String {
        format!(
            "{}/{}/bank/refresh-accounts/{}",
            self.integrations_base, self.personal_id, site_id
        )
    }
}
