use crate::config::PropertyAddress;
use crate::error::BillingResult;
use crate::service::BillingContext;
use crate::settings::{self, CustomerSettings};
use crate::tenants::{parse_tenants, Tenant};
use accounting_service::{Customer, CustomerId, EventInvoice, EventKind, InvoiceItem, TransactionSnapshot};
use serde::Serialize;
use tracing::{debug, info};

/// Everything the eviction documents are filled from
#[derive(Debug, Clone, Serialize)]
pub struct EvictionPacket {
    pub customer: Customer,
    pub snapshot: Option<TransactionSnapshot>,
    pub tenants: Vec<Tenant>,
    pub address: Option<PropertyAddress>,
    pub settings: Option<CustomerSettings>,
    /// Invoice whose amount due equals the ending balance
    pub invoice: Option<EventInvoice>,
    pub invoice_items: Vec<InvoiceItem>,
}

/// Invoice event that accounts for the whole ending balance
pub fn balance_invoice(snapshot: &TransactionSnapshot) -> Option<&EventInvoice> {
    snapshot
        .events
        .iter()
        .filter(|event| event.event_type == EventKind::Invoice)
        .filter_map(|event| event.invoice.as_ref())
        .find(|invoice| invoice.invoice_amount_due == snapshot.ending_balance)
}

pub struct EvictionPacketBuilder {
    ctx: BillingContext,
}

impl EvictionPacketBuilder {
    pub fn new(ctx: BillingContext) -> Self {
        Self { ctx }
    }

    pub async fn build(&self, customer_id: CustomerId) -> BillingResult<EvictionPacket> {
        let customer = self.ctx.api.get_customer(customer_id).await?;
        let tenants = parse_tenants(&customer.name)?;

        let snapshot = self
            .ctx
            .api
            .transaction_history(customer_id)
            .await?
            .transaction_history
            .into_iter()
            .next();

        let invoice = snapshot.as_ref().and_then(balance_invoice).cloned();
        let invoice_items = match &invoice {
            Some(invoice) if !invoice.items_url.is_empty() => {
                self.ctx.api.list_invoice_items(&invoice.items_url).await?
            }
            _ => Vec::new(),
        };
        if invoice.is_none() {
            debug!(customer = %customer.name, "No invoice matches the ending balance");
        }

        let address = self.ctx.config.property_for(&customer.name).cloned();
        let customer_settings = settings::decode(&customer);

        info!(
            customer = %customer.name,
            tenants = tenants.len(),
            has_address = address.is_some(),
            "Eviction packet assembled"
        );
        Ok(EvictionPacket {
            customer,
            snapshot,
            tenants,
            address,
            settings: customer_settings,
            invoice,
            invoice_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accounting_service::TransactionEvent;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_invoice_matches_ending_balance() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let invoice_event = |id, due| TransactionEvent {
            event_type: EventKind::Invoice,
            date: day,
            total: due,
            invoice: Some(EventInvoice {
                id,
                invoice_number: id.to_string(),
                invoice_amount_due: due,
                items_url: format!("i/{id}/items/"),
            }),
        };
        let snapshot = TransactionSnapshot {
            ending_balance: dec!(1200.00),
            events: vec![
                TransactionEvent {
                    event_type: EventKind::Payment,
                    date: day,
                    total: dec!(1200.00),
                    invoice: None,
                },
                invoice_event(1, dec!(600.00)),
                invoice_event(2, dec!(1200.00)),
            ],
        };

        assert_eq!(balance_invoice(&snapshot).map(|i| i.id), Some(2));

        let unmatched = TransactionSnapshot {
            ending_balance: dec!(5),
            ..snapshot
        };
        assert!(balance_invoice(&unmatched).is_none());
    }
}
