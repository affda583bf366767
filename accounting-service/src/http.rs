use crate::api::AccountingApi;
use crate::config::AccountingConfig;
use crate::endpoints::Endpoints;
use crate::error::{AccountingError, AccountingResult};
use crate::models::*;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// `reqwest` implementation of [`AccountingApi`]
pub struct HttpAccountingClient {
    client: reqwest::Client,
    endpoints: Endpoints,
    bearer_token: String,
}

impl HttpAccountingClient {
    /// Create a new client for the configured business
    pub fn new(config: &AccountingConfig) -> AccountingResult<Self> {
        if config.business_id.trim().is_empty() {
            return Err(AccountingError::Config("business_id is required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AccountingError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            endpoints: Endpoints::new(config),
            bearer_token: config.bearer_token.clone(),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Typed GET; any non-success status is an error
    async fn get<T: DeserializeOwned>(&self, url: &str) -> AccountingResult<T> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(AccountingError::NotFound(url.to_string()));
            }
            return Err(AccountingError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.json::<T>().await.map_err(|e| AccountingError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Typed POST; a rejected write is reported through the response status
    async fn post<TResp, TReq>(&self, url: &str, body: &TReq) -> AccountingResult<ApiResponse<TResp>>
    where
        TResp: DeserializeOwned,
        TReq: Serialize + ?Sized + Sync,
    {
        debug!(url = %url, "POST");
        let request = self.client.post(url).json(body);
        self.write(url, request).await
    }

    /// Typed PATCH; a rejected write is reported through the response status
    async fn patch<TResp, TReq>(&self, url: &str, body: &TReq) -> AccountingResult<ApiResponse<TResp>>
    where
        TResp: DeserializeOwned,
        TReq: Serialize + ?Sized + Sync,
    {
        debug!(url = %url, "PATCH");
        let request = self.client.patch(url).json(body);
        self.write(url, request).await
    }

    async fn write<TResp: DeserializeOwned>(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> AccountingResult<ApiResponse<TResp>> {
        let response = request
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), body = %error_text, "Write rejected by accounting API");
            return Ok(ApiResponse::failed(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| transport(url, e))?;
        Ok(ApiResponse {
            status: status.as_u16(),
            payload: decode_payload(url, &body),
        })
    }
}

/// Payload of an accepted write; some endpoints answer with an empty body
fn decode_payload<TResp: DeserializeOwned>(url: &str, body: &str) -> Option<TResp> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(body) {
        Ok(payload) => Some(payload),
        Err(e) => {
            debug!(url = %url, error = %e, body = %body, "Accepted write with an undecodable body");
            None
        }
    }
}

fn transport(url: &str, error: reqwest::Error) -> AccountingError {
    AccountingError::Transport {
        url: url.to_string(),
        message: error.to_string(),
    }
}

#[async_trait]
impl AccountingApi for HttpAccountingClient {
    async fn list_customers(&self) -> AccountingResult<Vec<Customer>> {
        self.get(&self.endpoints.customers()).await
    }

    async fn get_customer(&self, customer_id: CustomerId) -> AccountingResult<Customer> {
        self.get(&self.endpoints.customer(customer_id)).await
    }

    async fn transaction_history(&self, customer_id: CustomerId) -> AccountingResult<TransactionHistory> {
        self.get(&self.endpoints.transaction_history(customer_id)).await
    }

    async fn list_invoices(&self, query: InvoiceQuery) -> AccountingResult<Vec<Invoice>> {
        self.get(&self.endpoints.invoices(query)).await
    }

    async fn list_invoice_items(&self, items_url: &str) -> AccountingResult<Vec<InvoiceItem>> {
        self.get(items_url).await
    }

    async fn list_payments(&self, payments_url: &str) -> AccountingResult<Vec<Payment>> {
        self.get(payments_url).await
    }

    async fn add_invoice_item(
        &self,
        items_url: &str,
        item: &InvoiceItemDraft,
    ) -> AccountingResult<ApiResponse<InvoiceItem>> {
        self.post(items_url, item).await
    }

    async fn update_invoice_item(
        &self,
        item_url: &str,
        item: &InvoiceItemDraft,
    ) -> AccountingResult<ApiResponse<InvoiceItem>> {
        self.patch(item_url, item).await
    }

    async fn update_customer(
        &self,
        customer_url: &str,
        patch: &CustomerPatch,
    ) -> AccountingResult<ApiResponse<Customer>> {
        self.patch(customer_url, patch).await
    }

    async fn update_invoice_payments(
        &self,
        invoice_url: &str,
        flags: &InvoicePaymentFlags,
    ) -> AccountingResult<ApiResponse<Invoice>> {
        self.patch(invoice_url, flags).await
    }

    async fn list_connected_sites(&self) -> AccountingResult<Vec<ConnectedSite>> {
        self.get(&self.endpoints.connected_sites()).await
    }

    async fn refresh_connected_site(&self, site_id: i64) -> AccountingResult<ApiResponse<String>> {
        let url = self.endpoints.refresh_connected_site(site_id);
        self.post(&url, &serde_json::Value::Null).await
    }
}
