use crate::error::{ensure_written, BillingResult, WriteOperation};
use crate::fanout::run_to_completion;
use crate::messages::{MessageLog, MessageSender};
use crate::service::BillingContext;
use accounting_service::{Invoice, InvoicePaymentFlags, InvoiceQuery};
use rust_decimal::Decimal;
use tracing::info;

#[derive(Debug, Default)]
pub struct LockdownReport {
    pub updated: Vec<Invoice>,
    pub messages: Vec<String>,
}

/// Turns off online payment methods on every invoice with money still owed
pub struct InvoicePaymentLockdown {
    ctx: BillingContext,
}

impl InvoicePaymentLockdown {
    pub fn new(ctx: BillingContext) -> Self {
        Self { ctx }
    }

    pub async fn disable_payments(&self) -> BillingResult<LockdownReport> {
        let open: Vec<Invoice> = self
            .ctx
            .api
            .list_invoices(InvoiceQuery::all())
            .await?
            .into_iter()
            .filter(|invoice| invoice.invoice_amount_due > Decimal::ZERO && invoice.accepts_payments())
            .collect();

        let log = MessageLog::new();
        let mut updated: Vec<Invoice> = run_to_completion(open, self.ctx.config.max_concurrency, |invoice| {
            self.lock(invoice, log.sender())
        })
        .await?;
        updated.sort_by_key(|invoice| invoice.id);

        info!(invoices = updated.len(), "Invoice payments disabled");
        Ok(LockdownReport {
            updated,
            messages: log.drain(),
        })
    }

    async fn lock(&self, invoice: Invoice, messages: MessageSender) -> BillingResult<Invoice> {
        let flags = InvoicePaymentFlags::disable_all();
        let response = ensure_written(
            WriteOperation::DisablePayments,
            &invoice.url,
            self.ctx.api.update_invoice_payments(&invoice.url, &flags).await,
        )?;

        messages.push(format!("Disabled payments on invoice_number: {}", invoice.invoice_number));
        Ok(response.payload.unwrap_or(Invoice {
            disable_bank_payments: true,
            disable_credit_card_payments: true,
            ..invoice
        }))
    }
}
