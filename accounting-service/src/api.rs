use crate::error::AccountingResult;
use crate::models::*;
use async_trait::async_trait;

/// Narrow contract the billing engine consumes.
///
/// Reads return `Err` on any transport or status failure. Writes return
/// `Err` only on transport failure; a remote rejection comes back as an
/// [`ApiResponse`] whose `is_success()` is false, and the caller decides
/// how fatal that is.
#[async_trait]
pub trait AccountingApi: Send + Sync {
    /// All customers of the business
    async fn list_customers(&self) -> AccountingResult<Vec<Customer>>;

    async fn get_customer(&self, customer_id: CustomerId) -> AccountingResult<Customer>;

    /// Transaction-history statement of one customer
    async fn transaction_history(&self, customer_id: CustomerId) -> AccountingResult<TransactionHistory>;

    /// Invoices matching the query, customers embedded
    async fn list_invoices(&self, query: InvoiceQuery) -> AccountingResult<Vec<Invoice>>;

    async fn list_invoice_items(&self, items_url: &str) -> AccountingResult<Vec<InvoiceItem>>;

    async fn list_payments(&self, payments_url: &str) -> AccountingResult<Vec<Payment>>;

    async fn add_invoice_item(
        &self,
        items_url: &str,
        item: &InvoiceItemDraft,
    ) -> AccountingResult<ApiResponse<InvoiceItem>>;

    async fn update_invoice_item(
        &self,
        item_url: &str,
        item: &InvoiceItemDraft,
    ) -> AccountingResult<ApiResponse<InvoiceItem>>;

    async fn update_customer(
        &self,
        customer_url: &str,
        patch: &CustomerPatch,
    ) -> AccountingResult<ApiResponse<Customer>>;

    async fn update_invoice_payments(
        &self,
        invoice_url: &str,
        flags: &InvoicePaymentFlags,
    ) -> AccountingResult<ApiResponse<Invoice>>;

    /// Bank sites connected to the personal account
    async fn list_connected_sites(&self) -> AccountingResult<Vec<ConnectedSite>>;

    /// Ask the bank feed provider to refresh one site; the payload is the provider's status line
    async fn refresh_connected_site(&self, site_id: i64) -> AccountingResult<ApiResponse<String>>;
}

/// Status line the bank feed provider answers with when a refresh was accepted
pub const REFRESH_STARTED: &str = "Successfully started refreshing connected site";
