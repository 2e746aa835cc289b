#![forbid(unsafe_code)]

mod client;
mod metadata;
mod server;

pub use client::unary_invoke;
pub use metadata::{from_tonic, to_tonic};
pub use server::GrpcServer;
