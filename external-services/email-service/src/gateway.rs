use crate::error::EmailResult;
use async_trait::async_trait;

/// Delivery contract used by the billing engine.
///
/// Sending is a single attempt; the returned string is the message id.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_message(&self, to: &str, body: &str) -> EmailResult<String>;
}
