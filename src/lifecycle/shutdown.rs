//! Graceful stop signal shared by the server and its background tasks.

use tokio::sync::broadcast;

/// Fan-out stop signal.
///
/// Each task calls [`Shutdown::subscribe`] once and exits when its receiver
/// fires. Cloning yields another handle to the same channel, so the signal
/// handler and the server can hold one each.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Notify every subscriber. A no-op when nobody is listening.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Subscribers that have not yet dropped their receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
