//! Accounting API client for the billing engine
//!
//! The billing engine never talks HTTP directly. It goes through the
//! [`AccountingApi`] contract defined here, which covers the handful of
//! resources the engine needs, all scoped under one business identifier:
//! - Customers (read, patch of the shipping-details blob)
//! - Invoices, invoice items and invoice payments
//! - Customer transaction-history statements
//! - Connected bank sites (scoped under the personal identifier)
//!
//! Two implementations ship with the crate:
//! - [`HttpAccountingClient`]: `reqwest` client with typed `get`/`post`/`patch`
//! - [`InMemoryAccounting`]: `DashMap` backed store for tests

pub mod api;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod memory;
pub mod models;

pub use api::*;
pub use config::*;
pub use endpoints::*;
pub use error::*;
pub use http::*;
pub use memory::*;
pub use models::*;
