#![allow(dead_code)]

use accounting_service::*;
use async_trait::async_trait;
use billing_service::settings::{self, CustomerSettings};
use billing_service::{BillingConfig, BillingContext, BillingService, FixedClock};
use chrono::{NaiveDate, NaiveDateTime};
use email_service::Outbox;
use std::sync::Arc;
use std::time::Duration;

pub const LATE_FEE_PRODUCT: i64 = 99;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(day: NaiveDate, hour: u32) -> NaiveDateTime {
    day.and_hms_opt(hour, 0, 0).unwrap()
}

/// Engine wired to in-memory collaborators
pub struct Harness {
    pub api: Arc<InMemoryAccounting>,
    pub outbox: Arc<Outbox>,
    pub clock: Arc<FixedClock>,
    pub service: BillingService,
}

impl Harness {
    pub fn new(now: NaiveDateTime) -> Self {
        Self::with_config(
            now,
            BillingConfig {
                late_fee_product_id: LATE_FEE_PRODUCT,
                bank_refresh_pause_ms: 0,
                ..Default::default()
            },
        )
    }

    pub fn with_config(now: NaiveDateTime, config: BillingConfig) -> Self {
        Self::wrapping(now, config, |api| api)
    }

    /// Engine talking to the store through `wrap`, inspected directly
    pub fn wrapping<F>(now: NaiveDateTime, config: BillingConfig, wrap: F) -> Self
    where
        F: FnOnce(Arc<InMemoryAccounting>) -> Arc<dyn AccountingApi>,
    {
        let api = Arc::new(InMemoryAccounting::new().with_today(now.date()));
        let outbox = Arc::new(Outbox::new());
        let clock = Arc::new(FixedClock::new(now));
        let ctx = BillingContext::new(wrap(api.clone()), outbox.clone(), clock.clone(), config).unwrap();

        Self {
            api,
            outbox,
            clock,
            service: BillingService::new(ctx),
        }
    }

    pub fn store_settings(&self, customer_id: CustomerId, customer_settings: &CustomerSettings) {
        let blob = settings::encode(customer_settings).unwrap();
        self.api.update_customer_with(customer_id, |customer| {
            customer.shipping_details = Some(ShippingDetails {
                delivery_instructions: Some(blob),
                ..Default::default()
            });
        });
    }

    pub fn stored_settings(&self, customer_id: CustomerId) -> Option<CustomerSettings> {
        self.api.customer(customer_id).and_then(|customer| settings::decode(&customer))
    }

    pub fn added_items(&self) -> usize {
        self.api
            .journal()
            .iter()
            .filter(|write| matches!(write, WriteRecord::ItemAdded { .. }))
            .count()
    }
}

/// Store whose customer writes take a while to land
pub struct SlowCustomerWrites {
    pub inner: Arc<InMemoryAccounting>,
    pub delay: Duration,
}

#[async_trait]
impl AccountingApi for SlowCustomerWrites {
    async fn list_customers(&self) -> AccountingResult<Vec<Customer>> {
        self.inner.list_customers().await
    }

    async fn get_customer(&self, customer_id: CustomerId) -> AccountingResult<Customer> {
        self.inner.get_customer(customer_id).await
    }

    async fn transaction_history(&self, customer_id: CustomerId) -> AccountingResult<TransactionHistory> {
        self.inner.transaction_history(customer_id).await
    }

    async fn list_invoices(&self, query: InvoiceQuery) -> AccountingResult<Vec<Invoice>> {
        self.inner.list_invoices(query).await
    }

    async fn list_invoice_items(&self, items_url: &str) -> AccountingResult<Vec<InvoiceItem>> {
        self.inner.list_invoice_items(items_url).await
    }

    async fn list_payments(&self, payments_url: &str) -> AccountingResult<Vec<Payment>> {
        self.inner.list_payments(payments_url).await
    }

    async fn add_invoice_item(
        &self,
        items_url: &str,
        item: &InvoiceItemDraft,
    ) -> AccountingResult<ApiResponse<InvoiceItem>> {
        self.inner.add_invoice_item(items_url, item).await
    }

    async fn update_invoice_item(
        &self,
        item_url: &str,
        item: &InvoiceItemDraft,
    ) -> AccountingResult<ApiResponse<InvoiceItem>> {
        self.inner.update_invoice_item(item_url, item).await
    }

    async fn update_customer(
        &self,
        customer_url: &str,
        patch: &CustomerPatch,
    ) -> AccountingResult<ApiResponse<Customer>> {
        tokio::time::sleep(self.delay).await;
        self.inner.update_customer(customer_url, patch).await
    }

    async fn update_invoice_payments(
        &self,
        invoice_url: &str,
        flags: &InvoicePaymentFlags,
    ) -> AccountingResult<ApiResponse<Invoice>> {
        self.inner.update_invoice_payments(invoice_url, flags).await
    }

    async fn list_connected_sites(&self) -> AccountingResult<Vec<ConnectedSite>> {
        self.inner.list_connected_sites().await
    }

    async fn refresh_connected_site(&self, site_id: i64) -> AccountingResult<ApiResponse<String>> {
        self.inner.refresh_connected_site(site_id).await
    }
}
