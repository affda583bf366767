use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type CustomerId = i64;
pub type InvoiceId = i64;
pub type ProductId = i64;

/// Customer record as returned by the accounting API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: CustomerId,
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub active: bool,
    /// Free-text address line, used as the first notification endpoint
    #[serde(default)]
    pub address1: Option<String>,
    /// Free-text address line, used as the second notification endpoint
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
}

impl Customer {
    /// Raw text of the field the billing engine stores its settings in
    pub fn settings_blob(&self) -> Option<&str> {
        self.shipping_details
            .as_ref()
            .and_then(|details| details.delivery_instructions.as_deref())
    }
}

/// Shipping details block of a customer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShippingDetails {
    #[serde(default)]
    pub ship_to_contact: Option<String>,
    #[serde(default)]
    pub delivery_instructions: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Body of a customer PATCH limited to the shipping details
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerPatch {
    pub shipping_details: ShippingDetails,
}

/// Invoice with its customer embedded (`embed_customer=true`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: InvoiceId,
    pub url: String,
    pub invoice_number: String,
    pub customer: Customer,
    pub invoice_amount_due: Decimal,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items_url: String,
    pub payments_url: String,
    #[serde(default)]
    pub disable_bank_payments: bool,
    #[serde(default)]
    pub disable_credit_card_payments: bool,
    #[serde(default)]
    pub status: Option<String>,
}

impl Invoice {
    /// Positive amount due and past its due date
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.invoice_amount_due > Decimal::ZERO && self.due_date < today
    }

    /// Either payment method is still accepted
    pub fn accepts_payments(&self) -> bool {
        !self.disable_bank_payments || !self.disable_credit_card_payments
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductRef {
    pub id: ProductId,
}

/// Line item already stored on an invoice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceItem {
    pub url: String,
    pub product: ProductRef,
    #[serde(default)]
    pub description: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl InvoiceItem {
    pub fn total(&self) -> Decimal {
        self.quantity * self.price
    }
}

/// Line item body for create and update calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceItemDraft {
    pub product: ProductRef,
    pub description: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoicePaymentFlags {
    pub disable_credit_card_payments: bool,
    pub disable_bank_payments: bool,
}

impl InvoicePaymentFlags {
    pub fn disable_all() -> Self {
        Self {
            disable_credit_card_payments: true,
            disable_bank_payments: true,
        }
    }
}

/// Payment recorded against an invoice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
}

/// Transaction-history statement response
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionHistory {
    #[serde(default)]
    pub transaction_history: Vec<TransactionSnapshot>,
}

/// Latest ledger view of a customer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionSnapshot {
    pub ending_balance: Decimal,
    #[serde(default)]
    pub events: Vec<TransactionEvent>,
}

impl TransactionSnapshot {
    /// Most recent payment event
    pub fn last_payment(&self) -> Option<&TransactionEvent> {
        self.events
            .iter()
            .filter(|event| event.event_type == EventKind::Payment)
            .max_by_key(|event| event.date)
    }

    /// Most recent invoice event with a positive total
    pub fn last_invoice(&self) -> Option<&TransactionEvent> {
        self.events
            .iter()
            .filter(|event| event.event_type == EventKind::Invoice && event.total > Decimal::ZERO)
            .max_by_key(|event| event.date)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Payment,
    Invoice,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionEvent {
    pub event_type: EventKind,
    pub date: NaiveDate,
    pub total: Decimal,
    #[serde(default)]
    pub invoice: Option<EventInvoice>,
}

/// Invoice reference carried by an `invoice` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventInvoice {
    pub id: InvoiceId,
    #[serde(default)]
    pub invoice_number: String,
    pub invoice_amount_due: Decimal,
    #[serde(default)]
    pub items_url: String,
}

/// Bank feed linked to the personal account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectedSite {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Overdue => "overdue",
        }
    }
}

/// Filter for invoice listing. Customers are always embedded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<CustomerId>,
}

impl InvoiceQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn overdue() -> Self {
        Self {
            status: Some(InvoiceStatus::Overdue),
            customer_id: None,
        }
    }

    pub fn for_customer(mut self, customer_id: Option<CustomerId>) -> Self {
        self.customer_id = customer_id;
        self
    }

    /// Query string including the leading `?`
    pub fn to_query_string(&self) -> String {
        let mut query = String::from("?embed_customer=true");
        if let Some(status) = self.status {
            query.push_str("&status=");
            query.push_str(status.as_str());
        }
        if let Some(customer_id) = self.customer_id {
            query.push_str(&format!("&customer.id={customer_id}"));
        }
        query
    }
}

/// Outcome of a write call: the HTTP status plus the decoded body when there is one
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub payload: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            status: 200,
            payload: Some(payload),
        }
    }

    pub fn failed(status: u16) -> Self {
        Self {
            status,
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
