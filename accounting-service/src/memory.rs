use crate::api::{AccountingApi, REFRESH_STARTED};
use crate::error::{AccountingError, AccountingResult};
use crate::models::*;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicI64, Ordering};

const SCHEME: &str = "memory://";

/// Write calls observed by [`InMemoryAccounting`], in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRecord {
    ItemAdded { items_url: String, item: InvoiceItemDraft },
    ItemUpdated { item_url: String, item: InvoiceItemDraft },
    CustomerUpdated { customer_url: String, patch: CustomerPatch },
    InvoicePaymentsUpdated { invoice_url: String, flags: InvoicePaymentFlags },
    SiteRefreshed { site_id: i64 },
}

#[derive(Debug, Clone)]
struct InvoiceRecord {
    id: InvoiceId,
    invoice_number: String,
    customer_id: CustomerId,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    disable_bank_payments: bool,
    disable_credit_card_payments: bool,
}

/// In-memory accounting backend for tests.
///
/// Amount due is derived from the stored items minus recorded payments, and
/// "overdue" is judged against the store's own `today`, so late fees added by
/// one pass raise the base of the next pass the way the hosted service does.
pub struct InMemoryAccounting {
    customers: DashMap<CustomerId, Customer>,
    invoices: DashMap<InvoiceId, InvoiceRecord>,
    items: DashMap<InvoiceId, Vec<InvoiceItem>>,
    payments: DashMap<InvoiceId, Vec<Payment>>,
    statements: DashMap<CustomerId, TransactionHistory>,
    sites: DashMap<i64, ConnectedSite>,
    failing_statements: DashSet<CustomerId>,
    failing_writes: DashSet<String>,
    journal: Mutex<Vec<WriteRecord>>,
    next_id: AtomicI64,
    today: RwLock<NaiveDate>,
}

impl InMemoryAccounting {
    pub fn new() -> Self {
        Self {
            customers: DashMap::new(),
            invoices: DashMap::new(),
            items: DashMap::new(),
            payments: DashMap::new(),
            statements: DashMap::new(),
            sites: DashMap::new(),
            failing_statements: DashSet::new(),
            failing_writes: DashSet::new(),
            journal: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
            today: RwLock::new(Local::now().date_naive()),
        }
    }

    pub fn with_today(self, today: NaiveDate) -> Self {
        *self.today.write() = today;
        self
    }

    pub fn set_today(&self, today: NaiveDate) {
        *self.today.write() = today;
    }

    pub fn customer_url(customer_id: CustomerId) -> String {
        format!("{SCHEME}customers/{customer_id}/")
    }

    pub fn invoice_url(invoice_id: InvoiceId) -> String {
        format!("{SCHEME}invoices/{invoice_id}/")
    }

    pub fn items_url(invoice_id: InvoiceId) -> String {
        format!("{SCHEME}invoices/{invoice_id}/items/")
    }

    pub fn payments_url(invoice_id: InvoiceId) -> String {
        format!("{SCHEME}invoices/{invoice_id}/payments/")
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Insert an active customer with no contact data or settings
    pub fn create_customer(&self, customer_id: CustomerId, name: &str) -> Customer {
        let customer = Customer {
            id: customer_id,
            url: Self::customer_url(customer_id),
            name: name.to_string(),
            first_name: None,
            last_name: None,
            active: true,
            address1: None,
            address2: None,
            shipping_details: None,
        };
        self.customers.insert(customer_id, customer.clone());
        customer
    }

    pub fn update_customer_with<F>(&self, customer_id: CustomerId, update: F)
    where
        F: FnOnce(&mut Customer),
    {
        if let Some(mut customer) = self.customers.get_mut(&customer_id) {
            update(customer.value_mut());
        }
    }

    pub fn create_invoice(
        &self,
        customer_id: CustomerId,
        invoice_number: &str,
        invoice_date: NaiveDate,
        due_date: NaiveDate,
    ) -> InvoiceId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.invoices.insert(
            id,
            InvoiceRecord {
                id,
                invoice_number: invoice_number.to_string(),
                customer_id,
                invoice_date,
                due_date,
                disable_bank_payments: false,
                disable_credit_card_payments: false,
            },
        );
        self.items.insert(id, Vec::new());
        self.payments.insert(id, Vec::new());
        id
    }

    pub fn add_item(
        &self,
        invoice_id: InvoiceId,
        product_id: ProductId,
        description: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> InvoiceItem {
        let item = InvoiceItem {
            url: self.next_item_url(invoice_id),
            product: ProductRef { id: product_id },
            description: description.to_string(),
            quantity,
            price,
        };
        self.items.entry(invoice_id).or_default().push(item.clone());
        item
    }

    pub fn add_payment(&self, invoice_id: InvoiceId, amount: Decimal, payment_date: NaiveDate) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.payments.entry(invoice_id).or_default().push(Payment {
            id,
            amount,
            payment_date: Some(payment_date),
        });
    }

    pub fn set_statement(&self, customer_id: CustomerId, snapshot: TransactionSnapshot) {
        self.statements.insert(
            customer_id,
            TransactionHistory {
                transaction_history: vec![snapshot],
            },
        );
    }

    pub fn add_connected_site(&self, site_id: i64, name: &str) {
        self.sites.insert(
            site_id,
            ConnectedSite {
                id: site_id,
                name: Some(name.to_string()),
            },
        );
    }

    /// Make the statement read of this customer fail
    pub fn fail_statement_for(&self, customer_id: CustomerId) {
        self.failing_statements.insert(customer_id);
    }

    /// Reject every write whose URL contains `fragment`
    pub fn fail_writes_to(&self, fragment: &str) {
        self.failing_writes.insert(fragment.to_string());
    }

    /// Accept writes again after [`fail_writes_to`](Self::fail_writes_to)
    pub fn restore_writes(&self) {
        self.failing_writes.clear();
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn customer(&self, customer_id: CustomerId) -> Option<Customer> {
        self.customers.get(&customer_id).map(|entry| entry.value().clone())
    }

    pub fn invoice(&self, invoice_id: InvoiceId) -> Option<Invoice> {
        let record = self.invoices.get(&invoice_id).map(|entry| entry.value().clone())?;
        self.materialize(&record)
    }

    pub fn items(&self, invoice_id: InvoiceId) -> Vec<InvoiceItem> {
        self.items
            .get(&invoice_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn journal(&self) -> Vec<WriteRecord> {
        self.journal.lock().clone()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn next_item_url(&self, invoice_id: InvoiceId) -> String {
        let item_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{}{}/", Self::items_url(invoice_id), item_id)
    }

    fn materialize(&self, record: &InvoiceRecord) -> Option<Invoice> {
        let customer = self.customer(record.customer_id)?;
        let billed: Decimal = self.items(record.id).iter().map(InvoiceItem::total).sum();
        let paid: Decimal = self
            .payments
            .get(&record.id)
            .map(|entry| entry.value().iter().map(|payment| payment.amount).sum())
            .unwrap_or(Decimal::ZERO);
        let today = *self.today.read();

        let mut invoice = Invoice {
            id: record.id,
            url: Self::invoice_url(record.id),
            invoice_number: record.invoice_number.clone(),
            customer,
            invoice_amount_due: billed - paid,
            invoice_date: record.invoice_date,
            due_date: record.due_date,
            items_url: Self::items_url(record.id),
            payments_url: Self::payments_url(record.id),
            disable_bank_payments: record.disable_bank_payments,
            disable_credit_card_payments: record.disable_credit_card_payments,
            status: None,
        };
        invoice.status = Some(if invoice.is_overdue(today) { "overdue" } else { "sent" }.to_string());
        Some(invoice)
    }

    fn rejects(&self, url: &str) -> bool {
        self.failing_writes.iter().any(|fragment| url.contains(fragment.as_str()))
    }

    fn record(&self, write: WriteRecord) {
        self.journal.lock().push(write);
    }
}

impl Default for InMemoryAccounting {
    fn default() -> Self {
        Self::new()
    }
}

/// `memory://invoices/{id}/...` -> `id`
fn invoice_id_from(url: &str) -> AccountingResult<InvoiceId> {
    url.strip_prefix(SCHEME)
        .and_then(|rest| rest.strip_prefix("invoices/"))
        .and_then(|rest| rest.split('/').next())
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| AccountingError::NotFound(url.to_string()))
}

#[async_trait]
impl AccountingApi for InMemoryAccounting {
    async fn list_customers(&self) -> AccountingResult<Vec<Customer>> {
        let mut customers: Vec<Customer> =
            self.customers.iter().map(|entry| entry.value().clone()).collect();
        customers.sort_by_key(|customer| customer.id);
        Ok(customers)
    }

    async fn get_customer(&self, customer_id: CustomerId) -> AccountingResult<Customer> {
        self.customer(customer_id)
            .ok_or_else(|| AccountingError::NotFound(Self::customer_url(customer_id)))
    }

    async fn transaction_history(&self, customer_id: CustomerId) -> AccountingResult<TransactionHistory> {
        if self.failing_statements.contains(&customer_id) {
            return Err(AccountingError::Status {
                status: 500,
                url: format!("{}statements/transaction-history/", Self::customer_url(customer_id)),
            });
        }
        Ok(self
            .statements
            .get(&customer_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn list_invoices(&self, query: InvoiceQuery) -> AccountingResult<Vec<Invoice>> {
        let records: Vec<InvoiceRecord> = self
            .invoices
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|record| query.customer_id.map_or(true, |id| record.customer_id == id))
            .collect();
        let today = *self.today.read();

        let mut invoices: Vec<Invoice> = records
            .iter()
            .filter_map(|record| self.materialize(record))
            .filter(|invoice| match query.status {
                Some(InvoiceStatus::Overdue) => invoice.is_overdue(today),
                None => true,
            })
            .collect();
        invoices.sort_by_key(|invoice| invoice.id);
        Ok(invoices)
    }

    async fn list_invoice_items(&self, items_url: &str) -> AccountingResult<Vec<InvoiceItem>> {
        let invoice_id = invoice_id_from(items_url)?;
        Ok(self.items(invoice_id))
    }

    async fn list_payments(&self, payments_url: &str) -> AccountingResult<Vec<Payment>> {
        let invoice_id = invoice_id_from(payments_url)?;
        Ok(self
            .payments
            .get(&invoice_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn add_invoice_item(
        &self,
        items_url: &str,
        item: &InvoiceItemDraft,
    ) -> AccountingResult<ApiResponse<InvoiceItem>> {
        if self.rejects(items_url) {
            return Ok(ApiResponse::failed(500));
        }
        let invoice_id = invoice_id_from(items_url)?;
        if !self.invoices.contains_key(&invoice_id) {
            return Err(AccountingError::NotFound(items_url.to_string()));
        }

        let stored = self.add_item(
            invoice_id,
            item.product.id,
            &item.description,
            item.quantity,
            item.price,
        );
        self.record(WriteRecord::ItemAdded {
            items_url: items_url.to_string(),
            item: item.clone(),
        });
        Ok(ApiResponse::ok(stored))
    }

    async fn update_invoice_item(
        &self,
        item_url: &str,
        item: &InvoiceItemDraft,
    ) -> AccountingResult<ApiResponse<InvoiceItem>> {
        if self.rejects(item_url) {
            return Ok(ApiResponse::failed(500));
        }
        let invoice_id = invoice_id_from(item_url)?;

        let updated = {
            let mut items = self
                .items
                .get_mut(&invoice_id)
                .ok_or_else(|| AccountingError::NotFound(item_url.to_string()))?;
            let stored = items
                .iter_mut()
                .find(|stored| stored.url == item_url)
                .ok_or_else(|| AccountingError::NotFound(item_url.to_string()))?;
            stored.product = item.product;
            stored.description = item.description.clone();
            stored.quantity = item.quantity;
            stored.price = item.price;
            stored.clone()
        };

        self.record(WriteRecord::ItemUpdated {
            item_url: item_url.to_string(),
            item: item.clone(),
        });
        Ok(ApiResponse::ok(updated))
    }

    async fn update_customer(
        &self,
        customer_url: &str,
        patch: &CustomerPatch,
    ) -> AccountingResult<ApiResponse<Customer>> {
        if self.rejects(customer_url) {
            return Ok(ApiResponse::failed(500));
        }

        let updated = {
            let mut customer = self
                .customers
                .iter_mut()
                .find(|entry| entry.value().url == customer_url)
                .ok_or_else(|| AccountingError::NotFound(customer_url.to_string()))?;
            customer.shipping_details = Some(patch.shipping_details.clone());
            customer.value().clone()
        };

        self.record(WriteRecord::CustomerUpdated {
            customer_url: customer_url.to_string(),
            patch: patch.clone(),
        });
        Ok(ApiResponse::ok(updated))
    }

    async fn update_invoice_payments(
        &self,
        invoice_url: &str,
        flags: &InvoicePaymentFlags,
    ) -> AccountingResult<ApiResponse<Invoice>> {
        if self.rejects(invoice_url) {
            return Ok(ApiResponse::failed(500));
        }
        let invoice_id = invoice_id_from(invoice_url)?;

        let record = {
            let mut record = self
                .invoices
                .get_mut(&invoice_id)
                .ok_or_else(|| AccountingError::NotFound(invoice_url.to_string()))?;
            record.disable_bank_payments = flags.disable_bank_payments;
            record.disable_credit_card_payments = flags.disable_credit_card_payments;
            record.value().clone()
        };

        self.record(WriteRecord::InvoicePaymentsUpdated {
            invoice_url: invoice_url.to_string(),
            flags: *flags,
        });
        let invoice = self
            .materialize(&record)
            .ok_or_else(|| AccountingError::NotFound(invoice_url.to_string()))?;
        Ok(ApiResponse::ok(invoice))
    }

    async fn list_connected_sites(&self) -> AccountingResult<Vec<ConnectedSite>> {
        let mut sites: Vec<ConnectedSite> = self.sites.iter().map(|entry| entry.value().clone()).collect();
        sites.sort_by_key(|site| site.id);
        Ok(sites)
    }

    async fn refresh_connected_site(&self, site_id: i64) -> AccountingResult<ApiResponse<String>> {
        let url = format!("{SCHEME}bank/refresh-accounts/{site_id}");
        if self.rejects(&url) || !self.sites.contains_key(&site_id) {
            return Ok(ApiResponse::failed(404));
        }
        self.record(WriteRecord::SiteRefreshed { site_id });
        Ok(ApiResponse::ok(REFRESH_STARTED.to_string()))
    }
}
