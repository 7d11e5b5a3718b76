//! Shutdown coordination across servers and background tasks.

use tokio::sync::broadcast;

/// Broadcast-based shutdown coordinator.
///
/// Servers wait on [`Shutdown::wait`] for graceful shutdown; loops such as
/// the health monitor select on a [`Shutdown::subscribe`] receiver.
#[derive(Debug, Clone)]
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

    pub fn trigger(&self) {
        let subscribers = self.tx.send(()).unwrap_or(0);
        tracing::info!(subscribers = subscribers, "Shutdown triggered");
    }

    /// Resolves once [`Shutdown::trigger`] is called.
    pub fn wait(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
