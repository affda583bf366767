//! Logging support for the billing tools.
//!
//! [`init_tracing`] installs the global `tracing` subscriber (human or JSON
//! output, `RUST_LOG` aware). [`PiiRedactor`] masks e-mail addresses and phone
//! numbers so customer contact endpoints do not end up in log lines or
//! operation reports verbatim.
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, LoggerConfig, PiiRedactor};
//!
//! init_tracing(&LoggerConfig::default()).ok();
//! let redactor = PiiRedactor::default();
//! tracing::info!(to = %redactor.redact("5551234567@vtext.com"), "Reminder sent");
//! ```

pub mod config;
pub mod redactor;
pub mod subscriber;

pub use config::*;
pub use redactor::*;
pub use subscriber::*;
