//! Signal channels threaded between the bootstrap caller and the supervisor

use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Capacity of the reconnect signal channel
pub const RECONNECT_CHANNEL_CAPACITY: usize = 4;

/// Request for the supervisor to drop and re-establish its edge connections,
/// optionally after a delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconnectSignal {
    pub delay: Duration,
}

/// Fire-once signal the supervisor raises when the first edge connection has
/// registered. Notifying more than once is a no-op.
#[derive(Debug, Clone)]
pub struct ConnectedSignal {
    tx: watch::Sender<bool>,
}

/// Observer side of [`ConnectedSignal`].
#[derive(Debug, Clone)]
pub struct ConnectedWatch {
    rx: watch::Receiver<bool>,
}

impl ConnectedSignal {
    /// Create a signal and its observer.
    pub fn channel() -> (ConnectedSignal, ConnectedWatch) {
        let (tx, rx) = watch::channel(false);
        (ConnectedSignal { tx }, ConnectedWatch { rx })
    }

    /// Mark the tunnel as connected.
    pub fn notify(&self) {
        debug!("connected signal raised");
        // send_replace never fails even with no live observer
        self.tx.send_replace(true);
    }
}

impl ConnectedWatch {
    /// Whether the connected signal has fired.
    pub fn is_connected(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the connected signal fires.
    ///
    /// Returns immediately if it already has; returns without connecting if
    /// the supervisor went away before ever raising the signal.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|connected| *connected).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connected_signal_fires_once() {
        let (signal, mut observer) = ConnectedSignal::channel();
        assert!(!observer.is_connected());

        signal.notify();
        signal.notify();

        observer.wait().await;
        assert!(observer.is_connected());
    }

    #[tokio::test]
    async fn test_wait_after_sender_dropped() {
        let (signal, mut observer) = ConnectedSignal::channel();
        drop(signal);

        // Must not hang when the supervisor never connected
        observer.wait().await;
        assert!(!observer.is_connected());
    }
}
