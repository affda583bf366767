use crate::clock::US_DATE;
use crate::error::{ensure_written, BillingResult, WriteOperation};
use crate::fanout::run_to_completion;
use crate::messages::{MessageLog, MessageSender};
use crate::service::BillingContext;
use crate::settings;
use accounting_service::{CustomerId, Invoice, InvoiceId, InvoiceItem, InvoiceItemDraft, InvoiceQuery};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// At least one payment is recorded; left for manual handling
    HasPayments,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInvoice {
    pub customer_id: CustomerId,
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct ConsolidationReport {
    /// Source invoices whose items were moved
    pub processed: Vec<Invoice>,
    pub skipped: Vec<SkippedInvoice>,
    pub messages: Vec<String>,
}

#[derive(Default)]
struct CustomerMerge {
    processed: Vec<Invoice>,
    skipped: Vec<SkippedInvoice>,
}

/// Oldest invoice of a customer's group. Ties fall to the lowest id.
pub fn pick_target(invoices: &[Invoice]) -> Option<&Invoice> {
    invoices
        .iter()
        .min_by_key(|invoice| (invoice.invoice_date, invoice.id))
}

fn transferred_description(item: &InvoiceItem, source: &Invoice, today: NaiveDate) -> String {
    format!(
        "Transferred item: [{}] from invoice: {} for period from: {} to: {} transferred on: {}",
        item.description,
        source.invoice_number,
        source.invoice_date.format(US_DATE),
        source.due_date.format(US_DATE),
        today.format(US_DATE)
    )
}

fn voided_description(item: &InvoiceItem, target: &Invoice, today: NaiveDate) -> String {
    format!(
        "[{}] price: {} was moved to invoice: {} on: {}",
        item.description,
        item.price,
        target.invoice_number,
        today.format(US_DATE)
    )
}

/// Merges a customer's unpaid invoices into the oldest one
pub struct InvoiceConsolidator {
    ctx: BillingContext,
}

impl InvoiceConsolidator {
    pub fn new(ctx: BillingContext) -> Self {
        Self { ctx }
    }

    pub async fn consolidate(&self, customer_id: Option<CustomerId>) -> BillingResult<ConsolidationReport> {
        let mut invoices: Vec<Invoice> = self
            .ctx
            .api
            .list_invoices(InvoiceQuery::all().for_customer(customer_id))
            .await?
            .into_iter()
            .filter(|invoice| !invoice.invoice_amount_due.is_zero())
            .collect();
        invoices.sort_by(|a, b| a.customer.name.cmp(&b.customer.name).then(a.customer.id.cmp(&b.customer.id)));

        let groups = group_by_customer(invoices);
        debug!(customers = groups.len(), "Consolidating invoices");

        let log = MessageLog::new();
        let merges: Vec<CustomerMerge> = run_to_completion(groups, self.ctx.config.max_concurrency, |group| {
            self.consolidate_customer(group, log.sender())
        })
        .await?;

        let mut report = ConsolidationReport::default();
        for merge in merges {
            report.processed.extend(merge.processed);
            report.skipped.extend(merge.skipped);
        }
        report.messages = log.drain();

        info!(
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            "Invoice consolidation done"
        );
        Ok(report)
    }

    async fn consolidate_customer(&self, group: Vec<Invoice>, messages: MessageSender) -> BillingResult<CustomerMerge> {
        let mut merge = CustomerMerge::default();
        if group.len() < 2 {
            return Ok(merge);
        }
        let Some(target) = pick_target(&group) else {
            return Ok(merge);
        };
        let customer = &target.customer;

        if customer.name.starts_with(&self.ctx.config.consolidation_excluded_prefix) {
            debug!(customer = %customer.name, "Excluded from consolidation by name");
            return Ok(merge);
        }
        if !settings::decode(customer).map_or(false, |s| s.consolidates_invoices()) {
            debug!(customer = %customer.name, "Consolidation not enabled");
            return Ok(merge);
        }

        let mut sources: Vec<&Invoice> = group.iter().filter(|invoice| invoice.id != target.id).collect();
        sources.sort_by(|a, b| b.invoice_date.cmp(&a.invoice_date).then(b.id.cmp(&a.id)));

        for source in sources {
            let payments = self.ctx.api.list_payments(&source.payments_url).await?;
            if !payments.is_empty() {
                info!(
                    customer = %customer.name,
                    invoice = %source.invoice_number,
                    payments = payments.len(),
                    "Invoice has payments, not consolidating"
                );
                messages.push(format!(
                    "Skipping invoice {} of {}: it has {} payment(s)",
                    source.invoice_number,
                    customer.name,
                    payments.len()
                ));
                merge.skipped.push(SkippedInvoice {
                    customer_id: customer.id,
                    invoice_id: source.id,
                    invoice_number: source.invoice_number.clone(),
                    reason: SkipReason::HasPayments,
                });
                continue;
            }

            let moved = self.transfer_items(source, target).await?;
            messages.push(format!(
                "Moved {} item(s) from invoice {} to invoice {} for {}",
                moved, source.invoice_number, target.invoice_number, customer.name
            ));
            merge.processed.push(source.clone());
        }

        Ok(merge)
    }

    /// Copy every billable item of `source` onto `target`, then void the original
    async fn transfer_items(&self, source: &Invoice, target: &Invoice) -> BillingResult<usize> {
        let today = self.ctx.today();
        let items = self.ctx.api.list_invoice_items(&source.items_url).await?;
        let mut moved = 0;

        for item in items.iter().filter(|item| !item.total().is_zero()) {
            let copy = InvoiceItemDraft {
                product: item.product,
                description: transferred_description(item, source, today),
                quantity: item.quantity,
                price: item.price,
            };
            ensure_written(
                WriteOperation::TransferItem,
                &target.items_url,
                self.ctx.api.add_invoice_item(&target.items_url, &copy).await,
            )?;

            let voided = InvoiceItemDraft {
                product: item.product,
                description: voided_description(item, target, today),
                quantity: item.quantity,
                price: Decimal::ZERO,
            };
            ensure_written(
                WriteOperation::VoidSourceItem,
                &item.url,
                self.ctx.api.update_invoice_item(&item.url, &voided).await,
            )?;

            debug!(
                from = %source.invoice_number,
                to = %target.invoice_number,
                item = %item.description,
                "Item transferred"
            );
            moved += 1;
        }

        Ok(moved)
    }
}

/// Split name-sorted invoices into one run per customer, keeping order
fn group_by_customer(invoices: Vec<Invoice>) -> Vec<Vec<Invoice>> {
    let mut groups: Vec<Vec<Invoice>> = Vec::new();
    for invoice in invoices {
        match groups.last_mut() {
            Some(group) if group[0].customer.id == invoice.customer.id => group.push(invoice),
            _ => groups.push(vec![invoice]),
        }
    }
    groups
}
