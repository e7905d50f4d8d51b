use tokio::sync::mpsc;
use vigil_bridge::MessageFromBackend;
use vigil_bridge::notification::NotificationMessage;

/// Destination of user-facing notifications raised by backend components.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: NotificationMessage);
}

/// Path to the frontend for messages raised inside synchronous callbacks.
///
/// [`FrontendRelay::deliver`] never drops: messages wait in an unbounded
/// queue that one task drains into the bounded bridge, in order.
/// [`FrontendRelay::offer`] bypasses the queue and gives up when the bridge
/// is full, for high-rate messages that are superseded by the next one.
#[derive(Clone)]
pub struct FrontendRelay {
    queue: mpsc::UnboundedSender<MessageFromBackend>,
    bridge: mpsc::Sender<MessageFromBackend>,
}

impl FrontendRelay {
    /// Starts the draining task on the current runtime.
    pub fn spawn(bridge: mpsc::Sender<MessageFromBackend>) -> Self {
        let (queue, mut pending) = mpsc::unbounded_channel();
        let target = bridge.clone();
        tokio::spawn(async move {
            while let Some(message) = pending.recv().await {
                if target.send(message).await.is_err() {
                    log::debug!("Frontend bridge closed, relay stopped");
                    break;
                }
            }
        });
        Self { queue, bridge }
    }

    pub fn deliver(&self, message: MessageFromBackend) -> anyhow::Result<()> {
        self.queue
            .send(message)
            .map_err(|_| anyhow::anyhow!("frontend relay is closed"))
    }

    /// Returns whether the bridge took the message.
    pub fn offer(&self, message: MessageFromBackend) -> bool {
        match self.bridge.try_send(message) {
            Ok(()) => true,
            Err(error) => {
                log::trace!("Skipping message, frontend is not keeping up: {error}");
                false
            }
        }
    }
}

impl NotificationSink for FrontendRelay {
    fn notify(&self, message: NotificationMessage) {
        if let Err(error) = self.deliver(MessageFromBackend::NotificationMessage(message)) {
            log::warn!("Dropping notification: {error}");
        }
    }
}

impl NotificationSink for mpsc::UnboundedSender<NotificationMessage> {
    fn notify(&self, message: NotificationMessage) {
        if self.send(message).is_err() {
            log::debug!("Notification receiver is gone");
        }
    }
}
