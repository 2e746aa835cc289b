#![forbid(unsafe_code)]

mod client;
mod client_options;

pub use client::{connect, Client};
pub use client_options::{ClientOptions, DEFAULT_DIAL_KEEP_ALIVE, DEFAULT_DIAL_TIMEOUT};
