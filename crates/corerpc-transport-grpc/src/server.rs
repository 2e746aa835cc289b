use corerpc_endpoint::MaybeFailed;
use corerpc_transport::{RequestMethod, Server as CoreServer};

use crate::metadata::{from_tonic, to_tonic};

/// Binds a [`CoreServer`] to one gRPC method: extracts incoming
/// metadata, stamps the method name into the context, and runs the
/// pipeline. Done directly in `handle` rather than as a separate
/// interceptor, since a `CoreServer` already corresponds to exactly
/// one RPC method.
pub struct GrpcServer<WireReq, DomainReq, DomainResp, WireResp> {
    method: String,
    inner: CoreServer<WireReq, DomainReq, DomainResp, WireResp>,
}

impl<WireReq, DomainReq, DomainResp, WireResp> GrpcServer<WireReq, DomainReq, DomainResp, WireResp>
where
    DomainReq: Send + 'static,
    DomainResp: MaybeFailed + Send + 'static,
{
    pub fn new(
        method: impl Into<String>,
        inner: CoreServer<WireReq, DomainReq, DomainResp, WireResp>,
    ) -> Self {
        GrpcServer {
            method: method.into(),
            inner,
        }
    }

    /// Handles one unary RPC: extract metadata, run the pipeline, and
    /// translate the outcome into a `tonic::Response`/`Status`.
    pub async fn handle(
        &self,
        request: tonic::Request<WireReq>,
    ) -> Result<tonic::Response<WireResp>, tonic::Status> {
        let incoming = from_tonic(request.metadata());
        let ctx = corerpc_endpoint::Context::background()
            .with_value(RequestMethod(self.method.clone()));

        let (_, result) = self.inner.serve(ctx, &incoming, request.into_inner()).await;

        match result {
            Ok((wire_resp, header, trailer)) => {
                let mut response = tonic::Response::new(wire_resp);
                *response.metadata_mut() = to_tonic(&header);
                if !trailer.is_empty() {
                    tracing::debug!(
                        entries = trailer.len(),
                        "response trailer metadata is not surfaced by tonic's unary Response API"
                    );
                }
                Ok(response)
            }
            Err(err) => Err(tonic::Status::unknown(err.to_string())),
        }
    }
}
