#![forbid(unsafe_code)]

mod balancer;
mod random;
mod retry;

pub use balancer::{Balancer, ErrNoEndpoints};
pub use random::RandomBalancer;
pub use retry::{always_retry, max_retries, retry, retry_with_callback, Callback, RetryError};
