//! Per-customer billing settings.
//!
//! The accounting service has no place for custom data, so the settings live
//! as a JSON document in the customer's shipping delivery instructions. This
//! module is the only code that knows about that field: [`decode`] and
//! [`encode`] are the codec boundary, [`merge_defaults`] heals unset fields and
//! [`save_updated`] writes the document back.

use crate::config::SettingsDefaults;
use crate::error::{ensure_written, BillingResult, WriteOperation};
use accounting_service::{AccountingApi, Customer, CustomerPatch};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;
use tracing::{debug, info};

pub const SETTINGS_SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SettingsBlobError {
    #[error("customer has no settings blob")]
    Missing,

    #[error("malformed settings blob: {0}")]
    Malformed(String),

    #[error("failed to encode settings: {0}")]
    Encode(String),
}

/// Billing policy of one customer. `None` means "unset, needs a default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerSettings {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub charge_late_fee: Option<bool>,
    #[serde(default, with = "blob_time::date")]
    pub next_late_fee_charge_date: Option<NaiveDate>,
    #[serde(default)]
    pub late_fee_percent_rate: Option<Decimal>,
    #[serde(default)]
    pub late_fee_daily_amount: Option<Decimal>,
    #[serde(default)]
    pub late_fee_charge_above_balance: Option<Decimal>,
    #[serde(default)]
    pub consolidate_invoices: Option<bool>,
    #[serde(default)]
    pub signed_lease_agreement: Option<bool>,
    #[serde(default, with = "blob_time::date_time")]
    pub last_sms_alert_sent: Option<NaiveDateTime>,
    #[serde(default)]
    pub custom_days_between_sms_alerts: Option<i64>,
    #[serde(default)]
    pub send_sms_alerts: Option<bool>,
    #[serde(default)]
    pub statement_url: Option<String>,
    // Stored documents carry the misspelled key
    #[serde(
        default,
        rename = "EvictonNoticeDate",
        alias = "EvictionNoticeDate",
        with = "blob_time::date"
    )]
    pub eviction_notice_date: Option<NaiveDate>,
    #[serde(default)]
    pub eviction_court_case_number: Option<String>,
    #[serde(default)]
    pub eviction_court_assigned_judge: Option<String>,
}

impl CustomerSettings {
    /// Fully populated settings for a customer that has none
    pub fn from_defaults(defaults: &SettingsDefaults, today: NaiveDate) -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            charge_late_fee: Some(defaults.charge_late_fee),
            next_late_fee_charge_date: Some(today),
            late_fee_percent_rate: Some(defaults.late_fee_percent_rate),
            late_fee_daily_amount: Some(defaults.late_fee_daily_amount),
            late_fee_charge_above_balance: Some(defaults.late_fee_charge_above_balance),
            consolidate_invoices: Some(defaults.consolidate_invoices),
            signed_lease_agreement: Some(defaults.signed_lease_agreement),
            last_sms_alert_sent: Some(today.and_time(NaiveTime::MIN)),
            custom_days_between_sms_alerts: Some(defaults.custom_days_between_sms_alerts),
            send_sms_alerts: Some(defaults.send_sms_alerts),
            statement_url: Some(defaults.statement_url.clone()),
            eviction_notice_date: Some(today),
            eviction_court_case_number: Some(defaults.eviction_court_case_number.clone()),
            eviction_court_assigned_judge: Some(defaults.eviction_court_assigned_judge.clone()),
        }
    }

    pub fn charges_late_fee(&self) -> bool {
        self.charge_late_fee == Some(true)
    }

    pub fn consolidates_invoices(&self) -> bool {
        self.consolidate_invoices == Some(true)
    }

    pub fn sends_sms_alerts(&self) -> bool {
        self.send_sms_alerts == Some(true)
    }
}

/// Settings of a customer, or `None` when the blob is missing or unreadable
pub fn decode(customer: &Customer) -> Option<CustomerSettings> {
    let blob = customer.settings_blob()?;
    match decode_strict(blob) {
        Ok(settings) => Some(settings),
        Err(e) => {
            debug!(customer = %customer.name, error = %e, "Ignoring unreadable settings blob");
            None
        }
    }
}

pub fn decode_strict(blob: &str) -> Result<CustomerSettings, SettingsBlobError> {
    if blob.trim().is_empty() {
        return Err(SettingsBlobError::Missing);
    }
    serde_json::from_str(blob).map_err(|e| SettingsBlobError::Malformed(e.to_string()))
}

pub fn encode(settings: &CustomerSettings) -> Result<String, SettingsBlobError> {
    let current = CustomerSettings {
        schema_version: SETTINGS_SCHEMA_VERSION,
        ..settings.clone()
    };
    serde_json::to_string(&current).map_err(|e| SettingsBlobError::Encode(e.to_string()))
}

/// Result of [`merge_defaults`]
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSettings {
    pub settings: CustomerSettings,
    pub changed: bool,
    /// One note per field that was touched
    pub changes: Vec<String>,
}

fn note(changes: &mut Vec<String>, field: &str, value: &impl Display) {
    changes.push(format!("Setting default value {} to {}", field, value));
}

macro_rules! fill {
    ($settings:ident, $changes:ident, $field:ident, $name:literal, $value:expr) => {
        if $settings.$field.is_none() {
            let value = $value;
            note(&mut $changes, $name, &value);
            $settings.$field = Some(value);
        }
    };
}

/// Fill every unset field from `defaults`. Set fields are kept, except that a
/// paused customer (`ChargeLateFee == false`) never keeps a past charge date.
pub fn merge_defaults(settings: &CustomerSettings, defaults: &SettingsDefaults, today: NaiveDate) -> MergedSettings {
    let mut merged = settings.clone();
    let mut changes = Vec::new();

    fill!(merged, changes, charge_late_fee, "ChargeLateFee", defaults.charge_late_fee);
    fill!(merged, changes, next_late_fee_charge_date, "NextLateFeeChargeDate", today);
    fill!(merged, changes, late_fee_percent_rate, "LateFeePercentRate", defaults.late_fee_percent_rate);
    fill!(merged, changes, late_fee_daily_amount, "LateFeeDailyAmount", defaults.late_fee_daily_amount);
    fill!(
        merged,
        changes,
        late_fee_charge_above_balance,
        "LateFeeChargeAboveBalance",
        defaults.late_fee_charge_above_balance
    );

    if merged.charge_late_fee == Some(false) && merged.next_late_fee_charge_date.map_or(false, |date| date < today) {
        merged.next_late_fee_charge_date = Some(today);
        changes.push(format!("Setting todays date for NextLateFeeChargeDate to {}", today));
    }

    fill!(merged, changes, consolidate_invoices, "ConsolidateInvoices", defaults.consolidate_invoices);
    fill!(merged, changes, signed_lease_agreement, "SignedLeaseAgreement", defaults.signed_lease_agreement);
    fill!(merged, changes, last_sms_alert_sent, "LastSmsAlertSent", today.and_time(NaiveTime::MIN));
    fill!(
        merged,
        changes,
        custom_days_between_sms_alerts,
        "CustomDaysBetweenSmsAlerts",
        defaults.custom_days_between_sms_alerts
    );
    fill!(merged, changes, send_sms_alerts, "SendSmsAlerts", defaults.send_sms_alerts);
    fill!(merged, changes, statement_url, "StatementUrl", defaults.statement_url.clone());
    fill!(merged, changes, eviction_notice_date, "EvictionNoticeDate", today);
    fill!(
        merged,
        changes,
        eviction_court_case_number,
        "EvictionCourtCaseNumber",
        defaults.eviction_court_case_number.clone()
    );
    fill!(
        merged,
        changes,
        eviction_court_assigned_judge,
        "EvictionCourtAssignedJudge",
        defaults.eviction_court_assigned_judge.clone()
    );

    MergedSettings {
        changed: !changes.is_empty(),
        settings: merged,
        changes,
    }
}

/// Write `settings` into the customer's blob field. Other shipping details are kept.
pub async fn save_updated(
    api: &dyn AccountingApi,
    customer: &Customer,
    settings: &CustomerSettings,
) -> BillingResult<Customer> {
    let blob = encode(settings)?;
    let mut shipping_details = customer.shipping_details.clone().unwrap_or_default();
    shipping_details.delivery_instructions = Some(blob);

    let patch = CustomerPatch { shipping_details };
    let response = ensure_written(
        WriteOperation::SaveSettings,
        &customer.url,
        api.update_customer(&customer.url, &patch).await,
    )?;

    info!(customer = %customer.name, "Customer settings saved");
    Ok(response.payload.unwrap_or_else(|| Customer {
        shipping_details: Some(patch.shipping_details),
        ..customer.clone()
    }))
}

/// Date handling for the blob: values are written as local date-times without
/// offset and read back from that form, plain dates, or RFC 3339.
mod blob_time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub(super) fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
    }

    pub(super) mod date_time {
        use super::{parse, FORMAT};
        use chrono::NaiveDateTime;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&dt.format(FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid date-time: {}", raw))))
                .transpose()
        }
    }

    pub(super) mod date {
        use super::{parse, FORMAT};
        use chrono::{NaiveDate, NaiveTime};
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(date) => serializer.serialize_str(&date.and_time(NaiveTime::MIN).format(FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| {
                    parse(&raw)
                        .map(|dt| dt.date())
                        .ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw)))
                })
                .transpose()
        }
    }
}
