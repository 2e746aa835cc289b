use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use corerpc_endpoint::{BoxEndpoint, Context, Endpoint, Error};

use crate::hooks::{ClientFinalizerFunc, ClientRequestFunc, ClientResponseFunc};
use crate::metadata::Metadata;
use crate::request_method::RequestMethod;

/// Encodes a domain request into the wire-level request type.
pub type EncodeRequestFunc<DomainReq, WireReq> =
    Arc<dyn Fn(&Context, DomainReq) -> Result<WireReq, Error> + Send + Sync>;

/// Decodes a wire-level response into the domain response type.
pub type DecodeResponseFunc<WireResp, DomainResp> =
    Arc<dyn Fn(&Context, WireResp) -> Result<DomainResp, Error> + Send + Sync>;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Performs the actual wire call: sends `WireReq` with the given
/// outgoing metadata and returns the wire response plus whatever
/// header/trailer metadata came back. This is the injection point a
/// concrete transport (e.g. `tonic`'s `Grpc::unary`) fills in; the
/// method name is already baked into the closure by the caller that
/// builds the `Client`.
pub type InvokeFunc<WireReq, WireResp> = Arc<
    dyn Fn(Context, WireReq, Metadata) -> BoxFuture<'static, Result<(WireResp, Metadata, Metadata), Error>>
        + Send
        + Sync,
>;

/// Wraps a wire-level call as an [`Endpoint<DomainReq, DomainResp>`],
/// running the encode/invoke/decode pipeline shared by every transport
/// binding. `WireResp` is a static type parameter rather than a runtime
/// prototype, so there is no reflective allocation step: the compiler
/// already knows how to produce a fresh response value per call.
pub struct Client<DomainReq, WireReq, WireResp, DomainResp> {
    method: String,
    encode: EncodeRequestFunc<DomainReq, WireReq>,
    decode: DecodeResponseFunc<WireResp, DomainResp>,
    invoke: InvokeFunc<WireReq, WireResp>,
    before: Vec<ClientRequestFunc>,
    after: Vec<ClientResponseFunc>,
    finalizer: Vec<ClientFinalizerFunc>,
}

impl<DomainReq, WireReq, WireResp, DomainResp> Client<DomainReq, WireReq, WireResp, DomainResp>
where
    DomainReq: Send + 'static,
    WireReq: Send + 'static,
    WireResp: Send + 'static,
    DomainResp: Send + Sync + 'static,
{
    pub fn new(
        method: impl Into<String>,
        encode: EncodeRequestFunc<DomainReq, WireReq>,
        decode: DecodeResponseFunc<WireResp, DomainResp>,
        invoke: InvokeFunc<WireReq, WireResp>,
    ) -> Self {
        Client {
            method: method.into(),
            encode,
            decode,
            invoke,
            before: Vec::new(),
            after: Vec::new(),
            finalizer: Vec::new(),
        }
    }

    pub fn before(mut self, f: ClientRequestFunc) -> Self {
        self.before.push(f);
        self
    }

    pub fn after(mut self, f: ClientResponseFunc) -> Self {
        self.after.push(f);
        self
    }

    pub fn finalizer(mut self, f: ClientFinalizerFunc) -> Self {
        self.finalizer.push(f);
        self
    }

    /// Turns this client into an [`Endpoint`] the rest of the toolkit
    /// (middleware, load balancing, retries) can compose with.
    pub fn endpoint(self: Arc<Self>) -> BoxEndpoint<DomainReq, DomainResp> {
        self
    }
}

#[async_trait]
impl<DomainReq, WireReq, WireResp, DomainResp> Endpoint<DomainReq, DomainResp>
    for Client<DomainReq, WireReq, WireResp, DomainResp>
where
    DomainReq: Send + 'static,
    WireReq: Send + 'static,
    WireResp: Send + 'static,
    DomainResp: Send + Sync + 'static,
{
    async fn call(&self, ctx: Context, request: DomainReq) -> Result<DomainResp, Error> {
        // Derive a cancellable child scoped to this call; dropping the
        // guard at the end of this function cancels it, mirroring
        // `ctx, cancel := context.WithCancel(ctx); defer cancel()`.
        let (ctx, _cancel_guard) = ctx.with_cancel();
        let mut ctx = ctx.with_value(RequestMethod(self.method.clone()));

        let result: Result<DomainResp, Error> = 'call: {
            let wire_req = match (self.encode)(&ctx, request) {
                Ok(req) => req,
                Err(err) => break 'call Err(err),
            };

            let mut outgoing = Metadata::new();
            for f in &self.before {
                ctx = f(ctx, &mut outgoing);
            }

            let (wire_resp, header, trailer) =
                match (self.invoke)(ctx.clone(), wire_req, outgoing).await {
                    Ok(triple) => triple,
                    Err(err) => break 'call Err(err),
                };

            for f in &self.after {
                ctx = f(ctx, &header, &trailer);
            }

            match (self.decode)(&ctx, wire_resp) {
                Ok(resp) => Ok(resp),
                Err(err) => Err(err),
            }
        };

        for f in &self.finalizer {
            f(&ctx, result.as_ref().err());
        }

        result
    }
}
