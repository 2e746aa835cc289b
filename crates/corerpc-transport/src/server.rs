use std::sync::Arc;

use corerpc_endpoint::{BoxEndpoint, Context, Error, MaybeFailed};

use crate::error_handler::{ErrorHandler, LogErrorHandler};
use crate::hooks::{ServerFinalizerFunc, ServerRequestFunc, ServerResponseFunc};
use crate::metadata::Metadata;

/// Decodes a wire-level request into the domain request an [`Endpoint`]
/// expects. Synchronous: metadata extraction and payload unmarshalling
/// don't need to await anything.
///
/// [`Endpoint`]: corerpc_endpoint::Endpoint
pub type DecodeRequestFunc<WireReq, DomainReq> =
    Arc<dyn Fn(&Context, WireReq) -> Result<DomainReq, Error> + Send + Sync>;

/// Encodes a domain response back into the wire-level response type.
pub type EncodeResponseFunc<DomainResp, WireResp> =
    Arc<dyn Fn(&Context, DomainResp) -> Result<WireResp, Error> + Send + Sync>;

/// Pushes accumulated response headers to the underlying wire
/// connection (e.g. `tonic`'s `Response::metadata_mut`). Only invoked
/// when headers were actually set.
pub type SendHeaderFunc = Arc<dyn Fn(&Metadata) -> Result<(), Error> + Send + Sync>;

/// Pushes accumulated response trailers to the underlying wire
/// connection. Only invoked when trailers were actually set.
pub type SetTrailerFunc = Arc<dyn Fn(&Metadata) -> Result<(), Error> + Send + Sync>;

/// Wraps an [`Endpoint`] with the decode/invoke/encode pipeline shared
/// by every transport binding: extract incoming metadata, run
/// `before` hooks, decode, invoke, check for a domain-level failure,
/// run `after` hooks, encode, emit headers/trailers, run finalizers.
///
/// [`Endpoint`]: corerpc_endpoint::Endpoint
pub struct Server<WireReq, DomainReq, DomainResp, WireResp> {
    endpoint: BoxEndpoint<DomainReq, DomainResp>,
    decode: DecodeRequestFunc<WireReq, DomainReq>,
    encode: EncodeResponseFunc<DomainResp, WireResp>,
    before: Vec<ServerRequestFunc>,
    after: Vec<ServerResponseFunc>,
    finalizer: Vec<ServerFinalizerFunc>,
    error_handler: Arc<dyn ErrorHandler>,
    send_header: Option<SendHeaderFunc>,
    set_trailer: Option<SetTrailerFunc>,
}

impl<WireReq, DomainReq, DomainResp, WireResp> Server<WireReq, DomainReq, DomainResp, WireResp>
where
    DomainReq: Send + 'static,
    DomainResp: MaybeFailed + Send + 'static,
{
    pub fn new(
        endpoint: BoxEndpoint<DomainReq, DomainResp>,
        decode: DecodeRequestFunc<WireReq, DomainReq>,
        encode: EncodeResponseFunc<DomainResp, WireResp>,
    ) -> Self {
        Server {
            endpoint,
            decode,
            encode,
            before: Vec::new(),
            after: Vec::new(),
            finalizer: Vec::new(),
            error_handler: Arc::new(LogErrorHandler),
            send_header: None,
            set_trailer: None,
        }
    }

    pub fn before(mut self, f: ServerRequestFunc) -> Self {
        self.before.push(f);
        self
    }

    pub fn after(mut self, f: ServerResponseFunc) -> Self {
        self.after.push(f);
        self
    }

    pub fn finalizer(mut self, f: ServerFinalizerFunc) -> Self {
        self.finalizer.push(f);
        self
    }

    pub fn error_handler(mut self, eh: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = eh;
        self
    }

    pub fn send_header(mut self, f: SendHeaderFunc) -> Self {
        self.send_header = Some(f);
        self
    }

    pub fn set_trailer(mut self, f: SetTrailerFunc) -> Self {
        self.set_trailer = Some(f);
        self
    }

    /// Runs the full pipeline once. The context is always returned,
    /// even on error, so callers can still read values `before` hooks
    /// stashed (e.g. for logging). On success, also returns the
    /// accumulated response header/trailer metadata alongside the wire
    /// response, for transports (like a unary `tonic` handler) that
    /// build their reply in one shot rather than through
    /// `send_header`/`set_trailer`.
    pub async fn serve(
        &self,
        ctx: Context,
        incoming: &Metadata,
        wire_req: WireReq,
    ) -> (Context, Result<(WireResp, Metadata, Metadata), Error>) {
        let mut ctx = ctx;
        let result: Result<(WireResp, Metadata, Metadata), Error> = 'pipeline: {
            for f in &self.before {
                ctx = f(ctx, incoming);
            }

            let domain_req = match (self.decode)(&ctx, wire_req) {
                Ok(req) => req,
                Err(err) => {
                    self.error_handler.handle(&ctx, &err);
                    break 'pipeline Err(err);
                }
            };

            let domain_resp = match self.endpoint.call(ctx.clone(), domain_req).await {
                Ok(resp) => resp,
                Err(err) => {
                    self.error_handler.handle(&ctx, &err);
                    break 'pipeline Err(err);
                }
            };

            // A domain-level failure doesn't abort the pipeline: the
            // response still gets encoded and returned, it's just also
            // routed through the error handler.
            if let Some(failed) = domain_resp.as_failed() {
                let err: Error = failed.to_string().into();
                self.error_handler.handle(&ctx, &err);
            }

            let mut header = Metadata::new();
            let mut trailer = Metadata::new();
            for f in &self.after {
                ctx = f(ctx, &mut header, &mut trailer);
            }

            let wire_resp = match (self.encode)(&ctx, domain_resp) {
                Ok(resp) => resp,
                Err(err) => {
                    self.error_handler.handle(&ctx, &err);
                    break 'pipeline Err(err);
                }
            };

            if !header.is_empty() {
                if let Some(send) = &self.send_header {
                    if let Err(err) = send(&header) {
                        self.error_handler.handle(&ctx, &err);
                        break 'pipeline Err(err);
                    }
                }
            }
            if !trailer.is_empty() {
                if let Some(set) = &self.set_trailer {
                    if let Err(err) = set(&trailer) {
                        self.error_handler.handle(&ctx, &err);
                        break 'pipeline Err(err);
                    }
                }
            }

            Ok((wire_resp, header, trailer))
        };

        for f in &self.finalizer {
            f(&ctx, result.as_ref().err());
        }

        (ctx, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corerpc_endpoint::from_fn;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Wraps a plain `i32` so tests have a local type to hang the
    /// (foreign) `MaybeFailed` trait off of.
    #[derive(Debug, PartialEq, Eq)]
    struct Num(i32);
    impl MaybeFailed for Num {}

    #[tokio::test]
    async fn happy_path_decodes_invokes_encodes() {
        let endpoint = from_fn(|_ctx, req: i32| async move { Ok::<_, Error>(Num(req * 2)) });
        let server: Server<i32, i32, Num, i32> = Server::new(
            endpoint,
            Arc::new(|_ctx, req| Ok(req)),
            Arc::new(|_ctx, resp: Num| Ok(resp.0)),
        );
        let (_, result) = server.serve(Context::background(), &Metadata::new(), 21).await;
        assert_eq!(result.unwrap().0, 42);
    }

    #[tokio::test]
    async fn decode_error_short_circuits_before_invoking_endpoint() {
        let invoked = Arc::new(AtomicBool::new(false));
        let invoked2 = invoked.clone();
        let endpoint = from_fn(move |_ctx, req: i32| {
            let invoked2 = invoked2.clone();
            async move {
                invoked2.store(true, Ordering::SeqCst);
                Ok::<_, Error>(Num(req))
            }
        });
        let server: Server<i32, i32, Num, i32> = Server::new(
            endpoint,
            Arc::new(|_ctx, _req| Err("bad request".into())),
            Arc::new(|_ctx, resp: Num| Ok(resp.0)),
        );
        let (_, result) = server.serve(Context::background(), &Metadata::new(), 1).await;
        assert!(result.is_err());
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn finalizer_runs_on_both_success_and_error() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls2 = calls.clone();
        let endpoint = from_fn(|_ctx, req: i32| async move { Ok::<_, Error>(Num(req)) });
        let server: Server<i32, i32, Num, i32> = Server::new(
            endpoint,
            Arc::new(|_ctx, _req| Err("nope".into())),
            Arc::new(|_ctx, resp: Num| Ok(resp.0)),
        )
        .finalizer(Arc::new(move |_ctx, err| {
            calls2.lock().unwrap().push(err.is_some());
        }));
        let _ = server.serve(Context::background(), &Metadata::new(), 1).await;
        assert_eq!(&*calls.lock().unwrap(), &[true]);
    }

    #[tokio::test]
    async fn domain_failure_is_reported_but_does_not_abort_pipeline() {
        #[derive(Debug)]
        struct Resp {
            failed: bool,
        }
        impl MaybeFailed for Resp {
            fn as_failed(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
                if self.failed {
                    Some(&DOMAIN_ERR)
                } else {
                    None
                }
            }
        }
        #[derive(Debug)]
        struct DomainErr;
        impl std::fmt::Display for DomainErr {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "domain failure")
            }
        }
        impl std::error::Error for DomainErr {}
        static DOMAIN_ERR: DomainErr = DomainErr;

        let handled = Arc::new(AtomicBool::new(false));
        let handled2 = handled.clone();
        let endpoint = from_fn(|_ctx, _req: i32| async move { Ok::<_, Error>(Resp { failed: true }) });
        let server: Server<i32, i32, Resp, i32> = Server::new(
            endpoint,
            Arc::new(|_ctx, req| Ok(req)),
            Arc::new(|_ctx, _resp| Ok(7)),
        )
        .error_handler(crate::error_handler::from_fn(move |_ctx, _err| {
            handled2.store(true, Ordering::SeqCst);
        }));

        let (_, result) = server.serve(Context::background(), &Metadata::new(), 1).await;
        assert_eq!(result.unwrap().0, 7);
        assert!(handled.load(Ordering::SeqCst));
    }
}
