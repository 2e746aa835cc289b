use corerpc_endpoint::{BoxEndpoint, Error};

/// Picks one endpoint out of an [`Endpointer`](corerpc_sd::Endpointer)'s
/// current set for a single call.
pub trait Balancer<Req, Resp>: Send + Sync {
    fn endpoint(&self) -> Result<BoxEndpoint<Req, Resp>, Error>;
}

/// Returned when a [`Balancer`] has no endpoints to choose from.
#[derive(Debug, thiserror::Error)]
#[error("no endpoints available")]
pub struct ErrNoEndpoints;
