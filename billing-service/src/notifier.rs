use crate::clock::US_DATE;
use crate::config::BillingConfig;
use crate::contacts::extract_email;
use crate::error::{BillingError, BillingResult};
use crate::fanout::run_to_completion;
use crate::messages::{MessageLog, MessageSender};
use crate::service::BillingContext;
use crate::settings::{self, CustomerSettings};
use accounting_service::{Customer, CustomerId, TransactionEvent, TransactionSnapshot};
use chrono::{Duration, Months, NaiveDate, NaiveDateTime, Timelike};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// Customer with an outstanding balance and its latest statement
#[derive(Debug, Clone)]
pub struct LateCustomer {
    pub customer: Customer,
    pub snapshot: TransactionSnapshot,
}

impl LateCustomer {
    pub fn balance(&self) -> Decimal {
        self.snapshot.ending_balance
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentAlert {
    pub customer_id: CustomerId,
    pub recipient_name: String,
    /// Redacted contact address
    pub to: String,
    pub message_id: String,
}

#[derive(Debug, Default)]
pub struct NotificationReport {
    pub alerted: Vec<CustomerId>,
    pub sent: Vec<SentAlert>,
    pub skipped: Vec<CustomerId>,
    pub messages: Vec<String>,
}

/// Inputs of the reminder rule for one customer
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEligibility {
    pub days_since_last_alert: i64,
    pub min_days_between_alerts: i64,
    pub days_since_payment: i64,
    pub last_invoice_date: NaiveDate,
    pub hour: u32,
    pub send_sms_alerts: bool,
}

impl AlertEligibility {
    pub fn evaluate(
        settings: &CustomerSettings,
        last_payment: Option<&TransactionEvent>,
        last_invoice: &TransactionEvent,
        now: NaiveDateTime,
        config: &BillingConfig,
    ) -> Self {
        let last_alert = settings.last_sms_alert_sent.unwrap_or(now);
        let custom_interval = settings
            .custom_days_between_sms_alerts
            .unwrap_or(config.default_days_between_alerts);

        let never_paid = now
            .checked_sub_months(Months::new(config.never_paid_lookback_years.unsigned_abs() * 12))
            .unwrap_or(NaiveDateTime::MIN);
        let paid_at = last_payment
            .and_then(|payment| payment.date.and_hms_opt(0, 0, 0))
            .unwrap_or(never_paid);

        Self {
            days_since_last_alert: (now - last_alert).num_days(),
            min_days_between_alerts: custom_interval.max(config.default_days_between_alerts),
            days_since_payment: (now - paid_at).num_days(),
            last_invoice_date: last_invoice.date,
            hour: now.hour(),
            send_sms_alerts: settings.sends_sms_alerts(),
        }
    }

    pub fn is_eligible(&self, today: NaiveDate, config: &BillingConfig) -> bool {
        self.days_since_last_alert >= self.min_days_between_alerts
            && self.days_since_payment >= config.min_days_since_payment
            && self.last_invoice_date <= today - Duration::days(config.min_invoice_age_days)
            && self.hour > config.alert_after_hour
            && self.send_sms_alerts
    }
}

enum AlertOutcome {
    Alerted(Vec<SentAlert>),
    Skipped,
}

/// Picks late customers and sends them a balance reminder
pub struct OverdueNotifier {
    ctx: BillingContext,
}

impl OverdueNotifier {
    pub fn new(ctx: BillingContext) -> Self {
        Self { ctx }
    }

    /// Active customers with a positive ending balance, largest first.
    ///
    /// A statement that cannot be fetched drops the customer from the list;
    /// it does not fail the call. Events after `as_of` are ignored.
    pub async fn late_customers(&self, as_of: NaiveDateTime) -> BillingResult<Vec<LateCustomer>> {
        let excluded = self.ctx.config.excluded_name_prefix.as_str();
        let customers: Vec<Customer> = self
            .ctx
            .api
            .list_customers()
            .await?
            .into_iter()
            .filter(|customer| customer.active && !customer.name.starts_with(excluded))
            .collect();

        let api = &self.ctx.api;
        let mut late: Vec<LateCustomer> = stream::iter(customers)
            .map(|customer| async move {
                match api.transaction_history(customer.id).await {
                    Ok(history) => history
                        .transaction_history
                        .into_iter()
                        .next()
                        .map(|snapshot| LateCustomer {
                            snapshot: as_of_snapshot(snapshot, as_of.date()),
                            customer,
                        }),
                    Err(e) => {
                        warn!(customer = %customer.name, error = %e, "Statement unavailable, customer left out");
                        None
                    }
                }
            })
            .buffer_unordered(self.ctx.config.max_concurrency)
            .filter_map(|late| async move { late })
            .filter(|late| futures::future::ready(late.balance() > Decimal::ZERO))
            .collect()
            .await;

        late.sort_by(|a, b| {
            b.balance()
                .cmp(&a.balance())
                .then_with(|| a.customer.name.cmp(&b.customer.name))
        });
        debug!(count = late.len(), as_of = %as_of, "Late customers found");
        Ok(late)
    }

    pub async fn notify(&self) -> BillingResult<NotificationReport> {
        let now = self.ctx.now();
        let late = self.late_customers(now).await?;
        let log = MessageLog::new();

        let outcomes: Vec<(CustomerId, AlertOutcome)> =
            run_to_completion(late, self.ctx.config.max_concurrency, |late| {
                let messages = log.sender();
                async move {
                    let customer_id = late.customer.id;
                    let outcome = self.alert_customer(late, now, messages).await?;
                    Ok::<_, BillingError>((customer_id, outcome))
                }
            })
            .await?;

        let mut report = NotificationReport::default();
        for (customer_id, outcome) in outcomes {
            match outcome {
                AlertOutcome::Alerted(sent) => {
                    report.alerted.push(customer_id);
                    report.sent.extend(sent);
                }
                AlertOutcome::Skipped => report.skipped.push(customer_id),
            }
        }
        report.messages = log.drain();

        info!(
            alerted = report.alerted.len(),
            messages_sent = report.sent.len(),
            skipped = report.skipped.len(),
            "Late customer reminders done"
        );
        Ok(report)
    }

    async fn alert_customer(
        &self,
        late: LateCustomer,
        now: NaiveDateTime,
        messages: MessageSender,
    ) -> BillingResult<AlertOutcome> {
        let config = &self.ctx.config;
        let customer = &late.customer;

        let Some(mut customer_settings) = settings::decode(customer) else {
            messages.push(format!("Skipping SmsAlert, no settings for: {}.", customer.name));
            return Ok(AlertOutcome::Skipped);
        };
        let Some(last_invoice) = late.snapshot.last_invoice() else {
            messages.push(format!("Skipping SmsAlert, no invoice on record for: {}.", customer.name));
            return Ok(AlertOutcome::Skipped);
        };
        let last_payment = late.snapshot.last_payment();

        let eligibility = AlertEligibility::evaluate(&customer_settings, last_payment, last_invoice, now, config);
        if !eligibility.is_eligible(now.date(), config) {
            messages.push(format!(
                "Skipping SmsAlert LastSmsAlertSent: {}, minDaysBetweenAlerts: {:02}, lastInvoice.date: {}, \
                 daysSinceLastPayment: {}, SendSmsAlerts: {}, for: {}.",
                customer_settings
                    .last_sms_alert_sent
                    .map(|sent| sent.format(US_DATE).to_string())
                    .unwrap_or_default(),
                eligibility.min_days_between_alerts,
                eligibility.last_invoice_date.format(US_DATE),
                eligibility.days_since_payment,
                eligibility.send_sms_alerts,
                customer.name
            ));
            return Ok(AlertOutcome::Skipped);
        }

        let contacts = [
            (customer.address1.as_deref(), customer.first_name.as_deref()),
            (customer.address2.as_deref(), customer.last_name.as_deref()),
        ];

        let mut sent = Vec::new();
        for (address, name) in contacts {
            let Some(to) = address.and_then(extract_email) else {
                continue;
            };
            let name = name.unwrap_or(customer.name.as_str()).trim().to_uppercase();
            let body = compose_alert(&name, &late.snapshot, last_payment, &customer_settings, now.date(), config);
            let redacted = self.ctx.redactor.redact(&to);

            messages.push(format!("alerting late customer: {} on {}", name, redacted));
            let message_id = self.ctx.gateway.send_message(&to, &body).await?;
            info!(customer = %customer.name, to = %redacted, "Late payment reminder sent");

            sent.push(SentAlert {
                customer_id: customer.id,
                recipient_name: name,
                to: redacted,
                message_id,
            });
        }

        customer_settings.last_sms_alert_sent = Some(now);
        settings::save_updated(self.ctx.api.as_ref(), customer, &customer_settings).await?;
        Ok(AlertOutcome::Alerted(sent))
    }
}

/// Statement as it looked at the end of `as_of`
fn as_of_snapshot(mut snapshot: TransactionSnapshot, as_of: NaiveDate) -> TransactionSnapshot {
    snapshot.events.retain(|event| event.date <= as_of);
    snapshot
}

/// Reminder text
pub fn compose_alert(
    name: &str,
    snapshot: &TransactionSnapshot,
    last_payment: Option<&TransactionEvent>,
    customer_settings: &CustomerSettings,
    today: NaiveDate,
    config: &BillingConfig,
) -> String {
    let daily_charge = if customer_settings.signed_lease_agreement == Some(true) {
        format!("${}", customer_settings.late_fee_daily_amount.unwrap_or_default())
    } else {
        let rate = customer_settings
            .late_fee_percent_rate
            .unwrap_or(config.default_late_fee_rate);
        format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
    };
    let payment = match last_payment {
        Some(payment) => format!(
            "your last payment of: ${} was received on: {}.",
            payment.total,
            payment.date.format(US_DATE)
        ),
        None => "we have not received any payment yet.".to_string(),
    };

    format!(
        "Hello {}, as of today {} your balance due is ${} and {} \
         You can see your history here: {} . \
         Please let me know when can you make your next payment. \
         IMPORTANT NOTE: there is a {} daily charge for any past due balance!",
        name,
        today.format(US_DATE),
        snapshot.ending_balance,
        payment,
        customer_settings.statement_url.as_deref().unwrap_or_default(),
        daily_charge
    )
}
