#![forbid(unsafe_code)]

mod discovery_client;
mod discovery_instancer;
mod endpoint_cache;
mod endpointer;
mod event;
mod factory;
mod instance_cache;
mod instancer;
mod registrar;
mod service;

pub use discovery_client::{DiscoveryClient, ERR_NO_KEY, ERR_NO_VALUE};
pub use discovery_instancer::DiscoveryInstancer;
pub use endpoint_cache::{EndpointCache, EndpointerOptions};
pub use endpointer::{DefaultEndpointer, Endpointer};
pub use event::Event;
pub use factory::{Closer, Factory};
pub use instance_cache::InstanceCache;
pub use instancer::{FixedInstancer, Instancer};
pub use registrar::Registrar;
pub use service::{Service, TtlOption, MIN_HEARTBEAT};
