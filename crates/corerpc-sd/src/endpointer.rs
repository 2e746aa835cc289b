use std::sync::Arc;

use corerpc_endpoint::{BoxEndpoint, Error};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use crate::endpoint_cache::{EndpointCache, EndpointerOptions};
use crate::event::Event;
use crate::factory::Factory;
use crate::instancer::Instancer;

/// The set of currently-healthy endpoints for a service, kept live by
/// subscribing to an [`Instancer`].
pub trait Endpointer<Req, Resp>: Send + Sync {
    fn endpoints(&self) -> Result<Vec<BoxEndpoint<Req, Resp>>, Error>;
}

/// Subscribes to an [`Instancer`] and reconciles every [`Event`] it
/// emits into an [`EndpointCache`], via a background task reading off
/// an mpsc channel: register a channel with the instancer, then run a
/// receive loop that feeds every event it produces into the cache.
pub struct DefaultEndpointer<Req, Resp> {
    cache: Arc<EndpointCache<Req, Resp>>,
    instancer: Arc<dyn Instancer>,
    tx: UnboundedSender<Event>,
    receive_task: JoinHandle<()>,
}

impl<Req, Resp> DefaultEndpointer<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    pub fn new(
        instancer: Arc<dyn Instancer>,
        factory: Factory<Req, Resp>,
        options: EndpointerOptions,
    ) -> Self {
        let cache = Arc::new(EndpointCache::new(factory, options));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let receive_cache = cache.clone();
        let receive_task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                receive_cache.update(event);
            }
        });

        instancer.register(tx.clone());

        DefaultEndpointer {
            cache,
            instancer,
            tx,
            receive_task,
        }
    }

    /// Unsubscribes from the instancer and stops the receive task.
    pub fn close(&self) {
        self.instancer.deregister(&self.tx);
        self.receive_task.abort();
    }
}

impl<Req, Resp> Endpointer<Req, Resp> for DefaultEndpointer<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: Send + Sync + 'static,
{
    fn endpoints(&self) -> Result<Vec<BoxEndpoint<Req, Resp>>, Error> {
        self.cache.endpoints()
    }
}

impl<Req, Resp> Drop for DefaultEndpointer<Req, Resp> {
    fn drop(&mut self) {
        self.receive_task.abort();
    }
}
