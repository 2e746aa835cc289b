use std::sync::Arc;

use corerpc_endpoint::Context;

use crate::metadata::Metadata;

/// Runs before a server decodes a request; inspects incoming metadata
/// and may derive a new context (e.g. stash a trace id).
pub type ServerRequestFunc = Arc<dyn Fn(Context, &Metadata) -> Context + Send + Sync>;

/// Runs after a server's endpoint returns, before encoding; populates
/// outgoing header/trailer metadata.
pub type ServerResponseFunc =
    Arc<dyn Fn(Context, &mut Metadata, &mut Metadata) -> Context + Send + Sync>;

/// Runs before a client sends a request; populates outgoing metadata.
pub type ClientRequestFunc = Arc<dyn Fn(Context, &mut Metadata) -> Context + Send + Sync>;

/// Runs after a client receives a response; inspects returned header
/// and trailer metadata.
pub type ClientResponseFunc =
    Arc<dyn Fn(Context, &Metadata, &Metadata) -> Context + Send + Sync>;

/// Runs once a server's pipeline finishes, success or failure.
pub type ServerFinalizerFunc = Arc<dyn Fn(&Context, Option<&crate::Error>) + Send + Sync>;

/// Runs once a client's pipeline finishes, success or failure.
pub type ClientFinalizerFunc = Arc<dyn Fn(&Context, Option<&crate::Error>) + Send + Sync>;

/// A [`ClientRequestFunc`] that sets a single outgoing header.
pub fn set_request_header(key: impl Into<String>, val: impl Into<String>) -> ClientRequestFunc {
    let key = key.into();
    let val = val.into();
    Arc::new(move |ctx, md: &mut Metadata| {
        md.insert(&key, val.clone());
        ctx
    })
}

/// A [`ServerResponseFunc`] that sets a single outgoing response header.
pub fn set_response_header(key: impl Into<String>, val: impl Into<String>) -> ServerResponseFunc {
    let key = key.into();
    let val = val.into();
    Arc::new(move |ctx, header: &mut Metadata, _trailer: &mut Metadata| {
        header.insert(&key, val.clone());
        ctx
    })
}

/// A [`ServerResponseFunc`] that sets a single outgoing response trailer.
pub fn set_response_trailer(key: impl Into<String>, val: impl Into<String>) -> ServerResponseFunc {
    let key = key.into();
    let val = val.into();
    Arc::new(move |ctx, _header: &mut Metadata, trailer: &mut Metadata| {
        trailer.insert(&key, val.clone());
        ctx
    })
}
