use std::future::Future;
use std::pin::Pin;

use corerpc_endpoint::{Context, Error};
use corerpc_transport::{InvokeFunc, Metadata};
use tonic::client::Grpc;
use tonic::codec::Codec;
use tonic::transport::Channel;

use crate::metadata::to_tonic;

/// Builds an [`InvokeFunc`] that performs one `tonic` unary call,
/// feeding a `corerpc_transport::Client`'s encode/decode pipeline.
/// Wraps `Grpc::unary` behind the same `InvokeFunc` shape so the
/// generic client pipeline in `corerpc-transport` doesn't need to know
/// it's talking to gRPC at all.
pub fn unary_invoke<C, WireReq, WireResp>(
    channel: Channel,
    path: &'static str,
    codec: C,
) -> InvokeFunc<WireReq, WireResp>
where
    C: Codec<Encode = WireReq, Decode = WireResp> + Clone + Send + Sync + 'static,
    WireReq: Send + Sync + 'static,
    WireResp: Send + Sync + 'static,
{
    std::sync::Arc::new(move |_ctx: Context, wire_req: WireReq, outgoing: Metadata| {
        let mut grpc = Grpc::new(channel.clone());
        let codec = codec.clone();
        let metadata = to_tonic(&outgoing);

        let fut: Pin<Box<dyn Future<Output = Result<(WireResp, Metadata, Metadata), Error>> + Send>> =
            Box::pin(async move {
                grpc.ready().await.map_err(|e| -> Error { Box::new(e) })?;
                let mut request = tonic::Request::new(wire_req);
                *request.metadata_mut() = metadata;
                let path = tonic::codegen::http::uri::PathAndQuery::from_static(path);
                let response = grpc
                    .unary(request, path, codec)
                    .await
                    .map_err(|status| -> Error { Box::new(status) })?;
                let header = crate::metadata::from_tonic(response.metadata());
                let (_metadata, body, _extensions) = response.into_parts();
                Ok((body, header, Metadata::new()))
            });
        fut
    })
}
