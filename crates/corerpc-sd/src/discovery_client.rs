use async_trait::async_trait;
use corerpc_endpoint::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::service::Service;

/// No key was supplied where one is required.
pub const ERR_NO_KEY: &str = "no key provided";
/// No value was supplied where one is required.
pub const ERR_NO_VALUE: &str = "no value provided";

/// Abstracts over a key/value discovery backend (etcd, Consul, ...).
/// `corerpc-sd` depends only on this trait; `corerpc-sd-etcd` supplies
/// the concrete `etcd-client`-backed implementation.
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// Returns the values stored under every key with the given prefix.
    async fn get_entries(&self, prefix: &str) -> Result<Vec<String>, Error>;

    /// Registers `ch` to be notified (an empty "something changed"
    /// signal, not the changed data itself) whenever a key under
    /// `prefix` changes. Runs until the client is dropped or the
    /// backend closes the watch.
    async fn watch_prefix(&self, prefix: &str, ch: UnboundedSender<()>);

    /// Publishes `service` under its key, renewing it for as long as
    /// this client lives.
    async fn register(&self, service: &Service) -> Result<(), Error>;

    /// Removes `service`'s key.
    async fn deregister(&self, service: &Service) -> Result<(), Error>;

    /// The lease id backing the most recent [`register`](Self::register)
    /// call, if the backend uses leases.
    fn lease_id(&self) -> Option<i64>;
}
