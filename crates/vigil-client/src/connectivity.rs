//! Reachability sources.
//!
//! The coordinator only ever asks for a point-in-time snapshot. Change
//! notification is a separate concern used by the background scheduler.

use std::sync::Arc;

use tokio::sync::watch;

use vigil_shared::ConnectivitySnapshot;

pub trait ConnectivityMonitor: Send + Sync {
    fn snapshot(&self) -> ConnectivitySnapshot;
}

/// Host-updated connectivity state.
///
/// The platform layer (or the health-check loop in `vigil-sync`) calls [`set`];
/// readers get the latest value without waiting.
///
/// [`set`]: SharedConnectivity::set
#[derive(Debug, Clone)]
pub struct SharedConnectivity {
    tx: Arc<watch::Sender<ConnectivitySnapshot>>,
}

impl SharedConnectivity {
    pub fn new(initial: ConnectivitySnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new snapshot. Returns `true` if the online state flipped.
    pub fn set(&self, snapshot: ConnectivitySnapshot) -> bool {
        let mut flipped = false;
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            flipped = current.is_online() != snapshot.is_online();
            *current = snapshot;
            true
        });
        if flipped {
            tracing::info!(online = snapshot.is_online(), "Connectivity changed");
        }
        flipped
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivitySnapshot> {
        self.tx.subscribe()
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::new(ConnectivitySnapshot::OFFLINE)
    }
}

impl ConnectivityMonitor for SharedConnectivity {
    fn snapshot(&self) -> ConnectivitySnapshot {
        *self.tx.borrow()
    }
}

/// Fixed answer, for tests and for hosts without a connectivity API.
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub ConnectivitySnapshot);

impl StaticConnectivity {
    pub fn online() -> Self {
        Self(ConnectivitySnapshot::ONLINE)
    }

    pub fn offline() -> Self {
        Self(ConnectivitySnapshot::OFFLINE)
    }
}

impl ConnectivityMonitor for StaticConnectivity {
    fn snapshot(&self) -> ConnectivitySnapshot {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shared_connectivity_notifies_on_change() {
        let shared = SharedConnectivity::default();
        let mut rx = shared.subscribe();
        assert!(!shared.snapshot().is_online());

        assert!(shared.set(ConnectivitySnapshot::ONLINE));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_online());

        // Same value: no notification, no flip.
        assert!(!shared.set(ConnectivitySnapshot::ONLINE));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_connected_without_internet_is_not_a_flip() {
        let shared = SharedConnectivity::default();
        let captive = ConnectivitySnapshot {
            connected: true,
            internet_reachable: false,
        };
        assert!(!shared.set(captive));
        assert_eq!(shared.snapshot(), captive);
    }
}
