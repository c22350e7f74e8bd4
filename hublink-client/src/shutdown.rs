//! Cooperative shutdown signal for the receive loop.

use std::sync::Arc;
use tokio::sync::watch;

/// A cloneable, level-triggered shutdown signal.
///
/// Once triggered it stays triggered; every clone observes it, including
/// clones created afterwards.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Signals shutdown to every clone.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes once the signal has been triggered.
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as self, so this only returns once set.
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
