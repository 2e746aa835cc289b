use std::time::Duration;

/// TLS and dial knobs for [`connect`](crate::connect). Defaults: a 3s
/// dial timeout and a 3s keep-alive, no TLS unless a cert/key pair is
/// given.
#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    pub cert: Option<String>,
    pub key: Option<String>,
    pub ca_cert: Option<String>,
    pub dial_timeout: Option<Duration>,
    pub dial_keep_alive: Option<Duration>,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_DIAL_KEEP_ALIVE: Duration = Duration::from_secs(3);

impl ClientOptions {
    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout.unwrap_or(DEFAULT_DIAL_TIMEOUT)
    }

    pub fn dial_keep_alive(&self) -> Duration {
        self.dial_keep_alive.unwrap_or(DEFAULT_DIAL_KEEP_ALIVE)
    }

    pub fn tls_enabled(&self) -> bool {
        self.cert.is_some() && self.key.is_some()
    }
}
