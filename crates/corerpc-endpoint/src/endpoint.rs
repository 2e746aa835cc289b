use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;

/// A boxed, type-erased error shared across the toolkit's crate
/// boundaries — the same convention `tower`/`hyper` use so that
/// components that don't need to know each other's concrete error
/// types can still compose.
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The single unit of invocation in the system: everything composes
/// to or from something implementing `Endpoint`.
#[async_trait]
pub trait Endpoint<Req, Resp>: Send + Sync {
    async fn call(&self, ctx: Context, request: Req) -> Result<Resp, Error>;
}

/// A reference-counted, dynamically-dispatched endpoint — the type
/// middleware and composition helpers actually move around.
pub type BoxEndpoint<Req, Resp> = Arc<dyn Endpoint<Req, Resp>>;

#[async_trait]
impl<Req, Resp> Endpoint<Req, Resp> for BoxEndpoint<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, ctx: Context, request: Req) -> Result<Resp, Error> {
        (**self).call(ctx, request).await
    }
}

/// Adapts a plain async closure to an [`Endpoint`].
pub struct FnEndpoint<F>(F);

impl<F> FnEndpoint<F> {
    pub fn new(f: F) -> Self {
        FnEndpoint(f)
    }
}

#[async_trait]
impl<F, Fut, Req, Resp> Endpoint<Req, Resp> for FnEndpoint<F>
where
    F: Fn(Context, Req) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Resp, Error>> + Send,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, ctx: Context, request: Req) -> Result<Resp, Error> {
        (self.0)(ctx, request).await
    }
}

/// Builds a boxed endpoint out of a plain async closure.
pub fn from_fn<F, Fut, Req, Resp>(f: F) -> BoxEndpoint<Req, Resp>
where
    F: Fn(Context, Req) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Resp, Error>> + Send + 'static,
    Req: Send + 'static,
    Resp: Send + Sync + 'static,
{
    Arc::new(FnEndpoint::new(f))
}

/// An endpoint that returns `Resp::default()` and never fails.
pub fn nop<Req, Resp>() -> BoxEndpoint<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: Default + Send + Sync + 'static,
{
    from_fn(|_ctx, _req| async { Ok(Resp::default()) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nop_returns_default_and_no_error() {
        let e: BoxEndpoint<(), u32> = nop();
        let resp = e.call(Context::background(), ()).await.unwrap();
        assert_eq!(resp, 0);
    }

    #[tokio::test]
    async fn from_fn_forwards_context_and_request() {
        let e: BoxEndpoint<i32, i32> =
            from_fn(|_ctx, req| async move { Ok(req * 2) });
        let resp = e.call(Context::background(), 21).await.unwrap();
        assert_eq!(resp, 42);
    }
}
