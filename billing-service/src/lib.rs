//! Billing automation engine for a property-management business
//!
//! Runs the recurring billing chores against the accounting service:
//! - Late fee accrual on overdue invoices, with bounded catch-up of missed days
//! - Consolidation of a customer's unpaid invoices into the oldest one
//! - Payment reminders to late customers through the notification gateway
//! - Default settings for new customers, payment lockdown, bank feed refresh
//! - Eviction packet assembly from tenants encoded in customer names
//!
//! Per-customer state lives in a settings blob on the customer record
//! itself (see [`settings`]); nothing is cached between runs.

pub mod bank_refresh;
pub mod clock;
pub mod config;
pub mod consolidation;
pub mod contacts;
pub mod defaults;
pub mod error;
pub mod eviction;
mod fanout;
pub mod late_fees;
pub mod messages;
pub mod notifier;
pub mod payments;
pub mod service;
pub mod settings;
pub mod tenants;

pub use bank_refresh::*;
pub use clock::*;
pub use config::*;
pub use consolidation::*;
pub use contacts::*;
pub use defaults::*;
pub use error::*;
pub use eviction::*;
pub use late_fees::*;
pub use messages::*;
pub use notifier::*;
pub use payments::*;
pub use service::*;
pub use settings::{CustomerSettings, MergedSettings, SettingsBlobError, SETTINGS_SCHEMA_VERSION};
pub use tenants::*;
