//! Notification gateway for customer reminders.
//!
//! Messages are plain text sent over SMTP; carriers relay them as SMS when
//! the recipient is an e-mail-to-SMS address. [`Outbox`] is an in-memory
//! gateway that records messages instead of sending them.

pub mod error;
pub mod gateway;
pub mod outbox;
pub mod service;

pub use error::*;
pub use gateway::*;
pub use outbox::*;
pub use service::*;
