#![forbid(unsafe_code)]

mod context;
mod endpoint;
mod failer;
mod middleware;

pub use context::{CancelGuard, Context, ContextError};
pub use endpoint::{from_fn, nop, BoxEndpoint, Endpoint, Error, FnEndpoint};
pub use failer::MaybeFailed;
pub use middleware::{chain, identity, Middleware};
