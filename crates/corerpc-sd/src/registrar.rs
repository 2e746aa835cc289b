use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::discovery_client::DiscoveryClient;
use crate::service::Service;

/// Registers a [`Service`] with a discovery backend on `register()` and
/// removes it on `deregister()`. Both are fire-and-log: a failure is
/// traced but not returned, since this is typically called from
/// application startup/shutdown hooks that have nowhere useful to
/// propagate an error to.
pub struct Registrar<C: DiscoveryClient> {
    client: Arc<C>,
    service: Service,
    quit: Mutex<Option<oneshot::Sender<()>>>,
}

impl<C: DiscoveryClient> Registrar<C> {
    pub fn new(client: Arc<C>, service: Service) -> Self {
        Registrar {
            client,
            service,
            // No internal task ever populates this: a caller that
            // wants a quit signal wires one up via `quit_receiver`
            // before calling `register`. Left as an extension point
            // for heartbeat loops the owner may start externally.
            quit: Mutex::new(None),
        }
    }

    pub async fn register(&self) {
        match self.client.register(&self.service).await {
            Ok(()) => {
                tracing::info!(
                    key = %self.service.key,
                    value = %self.service.value,
                    lease_id = ?self.client.lease_id(),
                    "registered service"
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, key = %self.service.key, "failed to register service");
            }
        }
    }

    pub async fn deregister(&self) {
        match self.client.deregister(&self.service).await {
            Ok(()) => {
                tracing::info!(key = %self.service.key, "deregistered service");
            }
            Err(err) => {
                tracing::warn!(error = %err, key = %self.service.key, "failed to deregister service");
            }
        }
        if let Some(quit) = self.quit.lock().take() {
            let _ = quit.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use corerpc_endpoint::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::UnboundedSender;

    struct FakeClient {
        registered: AtomicUsize,
        deregistered: AtomicUsize,
    }

    #[async_trait]
    impl DiscoveryClient for FakeClient {
        async fn get_entries(&self, _prefix: &str) -> Result<Vec<String>, Error> {
            Ok(vec![])
        }
        async fn watch_prefix(&self, _prefix: &str, _ch: UnboundedSender<()>) {}
        async fn register(&self, _service: &Service) -> Result<(), Error> {
            self.registered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn deregister(&self, _service: &Service) -> Result<(), Error> {
            self.deregistered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn lease_id(&self) -> Option<i64> {
            Some(42)
        }
    }

    #[tokio::test]
    async fn register_and_deregister_call_through_to_the_client() {
        let client = Arc::new(FakeClient {
            registered: AtomicUsize::new(0),
            deregistered: AtomicUsize::new(0),
        });
        let registrar = Registrar::new(client.clone(), Service::new("k", "v"));
        registrar.register().await;
        registrar.deregister().await;
        assert_eq!(client.registered.load(Ordering::SeqCst), 1);
        assert_eq!(client.deregistered.load(Ordering::SeqCst), 1);
    }
}
