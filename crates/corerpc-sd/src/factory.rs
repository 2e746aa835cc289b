use std::sync::Arc;

use corerpc_endpoint::{BoxEndpoint, Error};

/// Released when an instance leaves the cache (e.g. closes a pooled
/// connection).
pub trait Closer: Send + Sync {
    fn close(&self);
}

/// Builds an [`Endpoint`](corerpc_endpoint::Endpoint) (and optionally a
/// [`Closer`] to release when the instance disappears) for a discovered
/// instance address.
pub type Factory<Req, Resp> =
    Arc<dyn Fn(&str) -> Result<(BoxEndpoint<Req, Resp>, Option<Arc<dyn Closer>>), Error> + Send + Sync>;
