use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::discovery_client::DiscoveryClient;
use crate::event::Event;
use crate::instance_cache::InstanceCache;
use crate::instancer::Instancer;

/// An [`Instancer`] backed by any [`DiscoveryClient`]: fetches the
/// initial instance set eagerly, then refreshes it every time the
/// client's watch fires, pushing each resulting [`Event`] through an
/// [`InstanceCache`] to subscribers.
///
/// Runs a one-shot initial `get_entries`, then loops alternating
/// between a watch notification (re-fetch) and cancellation, as a
/// `tokio::spawn`'d task torn down via a `CancellationToken`.
pub struct DiscoveryInstancer {
    cache: Arc<InstanceCache>,
    cancel: CancellationToken,
    loop_task: JoinHandle<()>,
}

impl DiscoveryInstancer {
    pub async fn new<C>(client: Arc<C>, prefix: impl Into<String>) -> Self
    where
        C: DiscoveryClient + 'static,
    {
        let prefix = prefix.into();
        let cache = Arc::new(InstanceCache::new());

        match client.get_entries(&prefix).await {
            Ok(instances) => {
                tracing::info!(%prefix, count = instances.len(), "resolved initial instances");
                cache.update(Event::instances(instances));
            }
            Err(err) => {
                tracing::warn!(%prefix, error = %err, "failed to resolve initial instances");
                cache.update(Event::failed(err));
            }
        }

        let cancel = CancellationToken::new();
        let loop_task = tokio::spawn(Self::run(client, prefix, cache.clone(), cancel.clone()));

        DiscoveryInstancer {
            cache,
            cancel,
            loop_task,
        }
    }

    async fn run<C>(client: Arc<C>, prefix: String, cache: Arc<InstanceCache>, cancel: CancellationToken)
    where
        C: DiscoveryClient + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watch_client = client.clone();
        let watch_prefix = prefix.clone();
        tokio::spawn(async move {
            watch_client.watch_prefix(&watch_prefix, tx).await;
        });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                signal = rx.recv() => {
                    if signal.is_none() {
                        return;
                    }
                    match client.get_entries(&prefix).await {
                        Ok(instances) => cache.update(Event::instances(instances)),
                        Err(err) => {
                            tracing::warn!(%prefix, error = %err, "failed to refresh instances");
                            cache.update(Event::failed(err));
                        }
                    }
                }
            }
        }
    }
}

impl Instancer for DiscoveryInstancer {
    fn register(&self, ch: UnboundedSender<Event>) {
        self.cache.register(ch);
    }

    fn deregister(&self, ch: &UnboundedSender<Event>) {
        self.cache.deregister(ch);
    }

    fn stop(&self) {
        self.cancel.cancel();
        self.loop_task.abort();
    }
}

impl Drop for DiscoveryInstancer {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.loop_task.abort();
    }
}
