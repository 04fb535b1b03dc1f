//! Shutdown coordination for the gateway.

use std::sync::Arc;

use tokio::sync::watch;

/// Why the gateway stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// `/quitquitquit` was requested on the overlay surface.
    QuitRequested,
    /// The process received an interrupt.
    Signal,
    /// The embedding application asked for it.
    Requested,
}

/// Coordinator for shutdown.
///
/// Cloneable handle over a watch channel; the first trigger wins and later
/// triggers are ignored.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self, reason: ShutdownReason) {
        let accepted = self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
        if accepted {
            tracing::info!(reason = ?reason, "Shutdown triggered");
        }
    }

    /// The reason shutdown was triggered with, if it was.
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`].
pub struct ShutdownSignal {
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownSignal {
    /// Wait until shutdown is triggered. Seen even if it happened before the call.
    pub async fn recv(&mut self) -> ShutdownReason {
        if let Ok(reason) = self.rx.wait_for(Option::is_some).await {
            if let Some(reason) = *reason {
                return reason;
            }
        }
        // All senders gone without a trigger: nothing will ever arrive.
        std::future::pending().await
    }
}
