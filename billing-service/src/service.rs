use crate::bank_refresh::{BankConnectionRefresher, BankRefreshReport};
use crate::clock::Clock;
use crate::config::BillingConfig;
use crate::consolidation::{ConsolidationReport, InvoiceConsolidator};
use crate::defaults::{CustomerDefaultsInitializer, DefaultsReport};
use crate::error::BillingResult;
use crate::eviction::{EvictionPacket, EvictionPacketBuilder};
use crate::late_fees::{LateFeeAccrualEngine, LateFeePass, LateFeeReport};
use crate::notifier::{LateCustomer, NotificationReport, OverdueNotifier};
use crate::payments::{InvoicePaymentLockdown, LockdownReport};
use accounting_service::{AccountingApi, CustomerId};
use chrono::{NaiveDate, NaiveDateTime};
use email_service::NotificationGateway;
use logger_redacted::PiiRedactor;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Collaborators and rules shared by every billing operation
#[derive(Clone)]
pub struct BillingContext {
    pub api: Arc<dyn AccountingApi>,
    pub gateway: Arc<dyn NotificationGateway>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<BillingConfig>,
    pub redactor: PiiRedactor,
}

impl BillingContext {
    pub fn new(
        api: Arc<dyn AccountingApi>,
        gateway: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
        config: BillingConfig,
    ) -> BillingResult<Self> {
        config.validate()?;
        Ok(Self {
            api,
            gateway,
            clock,
            config: Arc::new(config),
            redactor: PiiRedactor::default(),
        })
    }

    pub fn with_redactor(mut self, redactor: PiiRedactor) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

/// Entry point for the billing operations. Each call is independent and
/// reads its working set fresh from the accounting service.
pub struct BillingService {
    ctx: BillingContext,
}

impl BillingService {
    pub fn new(ctx: BillingContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BillingContext {
        &self.ctx
    }

    /// Customers with a positive balance, largest balance first
    pub async fn late_customers(&self, as_of: NaiveDateTime) -> BillingResult<Vec<LateCustomer>> {
        OverdueNotifier::new(self.ctx.clone()).late_customers(as_of).await
    }

    /// Send payment reminders to eligible late customers
    pub async fn notify_late_customers(&self) -> BillingResult<NotificationReport> {
        OverdueNotifier::new(self.ctx.clone()).notify().await
    }

    /// One accrual pass, without catch-up
    pub async fn accrue_late_fees_once(&self, default_rate: Option<Decimal>) -> BillingResult<LateFeePass> {
        LateFeeAccrualEngine::new(self.ctx.clone()).accrue_once(default_rate).await
    }

    /// Accrue late fees, catching up on missed days
    pub async fn charge_late_fees(&self, default_rate: Option<Decimal>) -> BillingResult<LateFeeReport> {
        LateFeeAccrualEngine::new(self.ctx.clone())
            .charge_late_fees(default_rate)
            .await
    }

    pub async fn consolidate_invoices(&self, customer_id: Option<CustomerId>) -> BillingResult<ConsolidationReport> {
        InvoiceConsolidator::new(self.ctx.clone()).consolidate(customer_id).await
    }

    pub async fn refresh_bank_connections(&self) -> BillingResult<BankRefreshReport> {
        BankConnectionRefresher::new(self.ctx.clone()).refresh().await
    }

    pub async fn apply_customer_defaults(&self) -> BillingResult<DefaultsReport> {
        CustomerDefaultsInitializer::new(self.ctx.clone()).apply_defaults().await
    }

    pub async fn disable_invoice_payments(&self) -> BillingResult<LockdownReport> {
        InvoicePaymentLockdown::new(self.ctx.clone()).disable_payments().await
    }

    pub async fn eviction_packet(&self, customer_id: CustomerId) -> BillingResult<EvictionPacket> {
        EvictionPacketBuilder::new(self.ctx.clone()).build(customer_id).await
    }
}
