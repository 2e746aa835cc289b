#![forbid(unsafe_code)]

mod client;
mod error_handler;
mod hooks;
mod metadata;
mod request_method;
mod server;

pub use client::{Client, DecodeResponseFunc, EncodeRequestFunc, InvokeFunc};
pub use corerpc_endpoint::Error;
pub use error_handler::{from_fn as error_handler_from_fn, ErrorHandler, ErrorHandlerFn, LogErrorHandler};
pub use hooks::{
    set_request_header, set_response_header, set_response_trailer, ClientFinalizerFunc,
    ClientRequestFunc, ClientResponseFunc, ServerFinalizerFunc, ServerRequestFunc,
    ServerResponseFunc,
};
pub use metadata::{encode_key_value, Metadata, BIN_HEADER_SUFFIX};
pub use request_method::RequestMethod;
pub use server::{DecodeRequestFunc, EncodeResponseFunc, SendHeaderFunc, Server, SetTrailerFunc};
