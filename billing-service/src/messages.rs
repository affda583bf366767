use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Append-only operation log shared by concurrent workers.
///
/// Workers push through cloned [`MessageSender`]s; the owner drains the log
/// once the fan-out is done. Entry order is not meaningful.
pub struct MessageLog {
    sender: UnboundedSender<String>,
    receiver: UnboundedReceiver<String>,
}

#[derive(Clone)]
pub struct MessageSender(UnboundedSender<String>);

impl MessageSender {
    pub fn push(&self, message: impl Into<String>) {
        // Only fails once the log is drained, after all workers finished
        let _ = self.0.send(message.into());
    }
}

impl MessageLog {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded_channel();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> MessageSender {
        MessageSender(self.sender.clone())
    }

    pub fn drain(mut self) -> Vec<String> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push(message);
        }
        messages
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}
