use crate::error::{EmailError, EmailResult};
use crate::gateway::NotificationGateway;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: String,
    pub to: String,
    pub body: String,
}

/// Gateway that keeps messages in memory; used by `billing-ops notify --outbox` and tests
#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<SentMessage>>,
    rejected: Mutex<HashSet<String>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make delivery to `to` fail
    pub fn reject(&self, to: &str) {
        self.rejected.lock().insert(to.to_string());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<SentMessage> {
        self.sent.lock().iter().filter(|m| m.to == to).cloned().collect()
    }
}

#[async_trait]
impl NotificationGateway for Outbox {
    async fn send_message(&self, to: &str, body: &str) -> EmailResult<String> {
        if self.rejected.lock().contains(to) {
            return Err(EmailError::SendFailed(format!("recipient rejected: {}", to)));
        }

        let message_id = Uuid::new_v4().to_string();
        self.sent.lock().push(SentMessage {
            message_id: message_id.clone(),
            to: to.to_string(),
            body: body.to_string(),
        });
        debug!(message_id = %message_id, "Message queued in outbox");
        Ok(message_id)
    }
}
