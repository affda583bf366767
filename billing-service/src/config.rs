use crate::error::{BillingError, BillingResult};
use accounting_service::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rules and thresholds of the billing engine. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Product the late-fee line items are booked against
    pub late_fee_product_id: ProductId,
    /// Rate used when a customer has no `LateFeePercentRate`
    pub default_late_fee_rate: Decimal,
    pub default_days_between_alerts: i64,
    pub min_days_since_payment: i64,
    pub min_invoice_age_days: i64,
    /// Reminders only go out after this local hour
    pub alert_after_hour: u32,
    /// Stand-in age of the last payment for customers that never paid
    pub never_paid_lookback_years: i32,
    pub excluded_name_prefix: String,
    pub consolidation_excluded_prefix: String,
    pub unconfigured_name_prefix: String,
    pub max_concurrency: usize,
    pub max_catch_up_passes: usize,
    pub bank_refresh_pause_ms: u64,
    pub property_addresses: Vec<PropertyAddress>,
    pub settings_defaults: SettingsDefaults,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            late_fee_product_id: 0,
            default_late_fee_rate: Decimal::new(2, 2),
            default_days_between_alerts: 3,
            min_days_since_payment: 7,
            min_invoice_age_days: 5,
            alert_after_hour: 8,
            never_paid_lookback_years: 10,
            excluded_name_prefix: "XX".to_string(),
            consolidation_excluded_prefix: "XXX".to_string(),
            unconfigured_name_prefix: "??".to_string(),
            max_concurrency: 8,
            max_catch_up_passes: 62,
            bank_refresh_pause_ms: 250,
            property_addresses: Vec::new(),
            settings_defaults: SettingsDefaults::default(),
        }
    }
}

impl BillingConfig {
    pub fn validate(&self) -> BillingResult<()> {
        if self.max_concurrency == 0 {
            return Err(BillingError::Config("max_concurrency must be at least 1".to_string()));
        }
        if self.max_catch_up_passes == 0 {
            return Err(BillingError::Config("max_catch_up_passes must be at least 1".to_string()));
        }
        if self.default_late_fee_rate.is_sign_negative() {
            return Err(BillingError::Config("default_late_fee_rate must not be negative".to_string()));
        }
        if self.alert_after_hour > 23 {
            return Err(BillingError::Config("alert_after_hour must be within 0..=23".to_string()));
        }
        Ok(())
    }

    /// Property whose id matches the leading four characters of a customer name
    pub fn property_for(&self, customer_name: &str) -> Option<&PropertyAddress> {
        let unit: String = customer_name.chars().take(4).collect();
        self.property_addresses.iter().find(|address| address.id == unit)
    }
}

/// Rental property, keyed by the unit code customer names start with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyAddress {
    pub id: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// Values written into unset customer settings fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SettingsDefaults {
    pub charge_late_fee: bool,
    pub late_fee_percent_rate: Decimal,
    pub late_fee_daily_amount: Decimal,
    pub late_fee_charge_above_balance: Decimal,
    pub consolidate_invoices: bool,
    pub signed_lease_agreement: bool,
    pub custom_days_between_sms_alerts: i64,
    pub send_sms_alerts: bool,
    pub statement_url: String,
    pub eviction_court_case_number: String,
    pub eviction_court_assigned_judge: String,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            charge_late_fee: false,
            late_fee_percent_rate: Decimal::new(2, 2),
            late_fee_daily_amount: Decimal::from(10),
            late_fee_charge_above_balance: Decimal::from(340),
            consolidate_invoices: true,
            signed_lease_agreement: false,
            custom_days_between_sms_alerts: 5,
            send_sms_alerts: true,
            statement_url: "StatementUrl".to_string(),
            eviction_court_case_number: "0000000000000".to_string(),
            eviction_court_assigned_judge: "JUDGEJUDGEJUDGE".to_string(),
        }
    }
}
