use crate::clock::US_DATE;
use crate::error::{ensure_written, BillingError, BillingResult, WriteOperation};
use crate::fanout::run_to_completion;
use crate::messages::{MessageLog, MessageSender};
use crate::service::BillingContext;
use crate::settings::{self, CustomerSettings};
use accounting_service::{CustomerId, Invoice, InvoiceId, InvoiceItemDraft, InvoiceQuery, ProductRef};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info};

/// A late fee line item that was added
#[derive(Debug, Clone, PartialEq)]
pub struct ChargedFee {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub base_amount: Decimal,
    pub rate: Decimal,
    pub fee: Decimal,
    /// Day the fee accrued for
    pub as_of: NaiveDate,
}

/// Outcome of a single accrual pass
#[derive(Debug, Default)]
pub struct LateFeePass {
    pub charged: Vec<ChargedFee>,
    /// Customers whose next charge date is still on or before today
    pub lagging: Vec<CustomerId>,
    pub messages: Vec<String>,
}

#[derive(Debug, Default)]
pub struct LateFeeReport {
    pub charged: Vec<ChargedFee>,
    pub passes: usize,
    /// Customers still behind when the pass limit was hit
    pub unresolved_catch_up: Vec<CustomerId>,
    pub messages: Vec<String>,
}

#[derive(Default)]
struct CustomerCharge {
    charged: Vec<ChargedFee>,
    lagging: Option<CustomerId>,
}

/// `amount_due * rate`, rounded to cents
pub fn late_fee(amount_due: Decimal, rate: Decimal) -> Decimal {
    (amount_due * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Charge date of a customer whose fee accrues today, if any
pub fn due_charge_date(customer_settings: &CustomerSettings, today: NaiveDate) -> Option<NaiveDate> {
    if !customer_settings.charges_late_fee() {
        return None;
    }
    customer_settings
        .next_late_fee_charge_date
        .filter(|next| *next <= today)
}

/// Adds late fees to overdue invoices, driven by each customer's
/// `NextLateFeeChargeDate`
pub struct LateFeeAccrualEngine {
    ctx: BillingContext,
}

impl LateFeeAccrualEngine {
    pub fn new(ctx: BillingContext) -> Self {
        Self { ctx }
    }

    /// Exactly one pass over the overdue invoices. Each charged customer's
    /// date moves forward by one day.
    pub async fn accrue_once(&self, default_rate: Option<Decimal>) -> BillingResult<LateFeePass> {
        let rate = default_rate.unwrap_or(self.ctx.config.default_late_fee_rate);
        self.run_pass(rate, None).await
    }

    /// Repeat passes for lagging customers until every charge date is in the
    /// future or the configured pass limit is reached.
    pub async fn charge_late_fees(&self, default_rate: Option<Decimal>) -> BillingResult<LateFeeReport> {
        let rate = default_rate.unwrap_or(self.ctx.config.default_late_fee_rate);
        let max_passes = self.ctx.config.max_catch_up_passes;
        let mut report = LateFeeReport::default();
        let mut queue: Option<BTreeSet<CustomerId>> = None;

        while report.passes < max_passes {
            let pass = self.run_pass(rate, queue.as_ref()).await?;
            report.passes += 1;
            report.charged.extend(pass.charged);
            report.messages.extend(pass.messages);

            if pass.lagging.is_empty() {
                queue = None;
                break;
            }
            debug!(pass = report.passes, lagging = pass.lagging.len(), "Catching up on late fees");
            queue = Some(pass.lagging.into_iter().collect());
        }

        if let Some(unresolved) = queue {
            report.unresolved_catch_up = unresolved.into_iter().collect();
            error!(
                passes = report.passes,
                customers = ?report.unresolved_catch_up,
                "Late fee catch-up stopped at the pass limit; check NextLateFeeChargeDate of these customers"
            );
            report.messages.push(format!(
                "Catch-up incomplete after {} passes for customers: {:?}",
                report.passes, report.unresolved_catch_up
            ));
        }

        info!(
            fees = report.charged.len(),
            passes = report.passes,
            "Late fee accrual done"
        );
        Ok(report)
    }

    async fn run_pass(&self, rate: Decimal, only: Option<&BTreeSet<CustomerId>>) -> BillingResult<LateFeePass> {
        let now = self.ctx.now();
        let overdue = self.ctx.api.list_invoices(InvoiceQuery::overdue()).await?;

        let mut by_customer: BTreeMap<CustomerId, Vec<Invoice>> = BTreeMap::new();
        for invoice in overdue {
            if only.map_or(true, |queue| queue.contains(&invoice.customer.id)) {
                by_customer.entry(invoice.customer.id).or_default().push(invoice);
            }
        }

        let log = MessageLog::new();
        let results: Vec<CustomerCharge> =
            run_to_completion(by_customer.into_values(), self.ctx.config.max_concurrency, |invoices| {
                self.charge_customer(invoices, rate, now, log.sender())
            })
            .await?;

        let mut pass = LateFeePass::default();
        for result in results {
            pass.charged.extend(result.charged);
            pass.lagging.extend(result.lagging);
        }
        pass.lagging.sort_unstable();
        pass.messages = log.drain();
        Ok(pass)
    }

    /// Charge every eligible overdue invoice of one customer against the same
    /// charge date, then advance the date once.
    async fn charge_customer(
        &self,
        invoices: Vec<Invoice>,
        default_rate: Decimal,
        now: NaiveDateTime,
        messages: MessageSender,
    ) -> BillingResult<CustomerCharge> {
        let today = now.date();
        let Some(customer) = invoices.first().map(|invoice| invoice.customer.clone()) else {
            return Ok(CustomerCharge::default());
        };
        let Some(mut customer_settings) = settings::decode(&customer) else {
            return Ok(CustomerCharge::default());
        };
        let Some(as_of) = due_charge_date(&customer_settings, today) else {
            return Ok(CustomerCharge::default());
        };
        let Some(threshold) = customer_settings.late_fee_charge_above_balance else {
            return Ok(CustomerCharge::default());
        };
        let rate = customer_settings.late_fee_percent_rate.unwrap_or(default_rate);

        let eligible: Vec<&Invoice> = invoices
            .iter()
            .filter(|invoice| threshold <= invoice.invoice_amount_due)
            .collect();
        if eligible.is_empty() {
            return Ok(CustomerCharge::default());
        }

        let mut charged = Vec::with_capacity(eligible.len());
        for invoice in eligible {
            let fee = late_fee(invoice.invoice_amount_due, rate);
            let item = InvoiceItemDraft {
                product: ProductRef {
                    id: self.ctx.config.late_fee_product_id,
                },
                description: format!(
                    "Late Charge: {}% from PastDueAmount: {} as of date: {} added on: {}",
                    (rate * Decimal::ONE_HUNDRED).normalize(),
                    invoice.invoice_amount_due,
                    as_of.format(US_DATE),
                    today.format(US_DATE)
                ),
                quantity: Decimal::ONE,
                price: fee,
            };

            ensure_written(
                WriteOperation::AddLateFee,
                &invoice.items_url,
                self.ctx.api.add_invoice_item(&invoice.items_url, &item).await,
            )?;

            info!(
                customer = %customer.name,
                invoice = %invoice.invoice_number,
                fee = %fee,
                as_of = %as_of,
                "Late fee added"
            );
            messages.push(format!(
                "Added late fee {} to invoice {} of {} for {}",
                fee, invoice.invoice_number, customer.name, as_of
            ));
            charged.push(ChargedFee {
                customer_id: customer.id,
                customer_name: customer.name.clone(),
                invoice_id: invoice.id,
                invoice_number: invoice.invoice_number.clone(),
                base_amount: invoice.invoice_amount_due,
                rate,
                fee,
                as_of,
            });
        }

        let next = as_of
            .succ_opt()
            .ok_or_else(|| BillingError::Config(format!("charge date {} cannot advance", as_of)))?;
        customer_settings.next_late_fee_charge_date = Some(next);
        settings::save_updated(self.ctx.api.as_ref(), &customer, &customer_settings).await?;

        Ok(CustomerCharge {
            charged,
            lagging: (next <= today).then_some(customer.id),
        })
    }
}
