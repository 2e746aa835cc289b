use corerpc_endpoint::MaybeFailed;

/// Grounded on `example/user/proto.LoginReq`.
#[derive(Clone, Debug)]
pub struct LoginRequest {
    pub account: String,
}

/// Grounded on `example/user/proto.LoginRes`. `failed` carries a
/// domain-level rejection (a wrong account) distinct from a transport
/// or encoding failure, surfaced through [`MaybeFailed`].
#[derive(Clone, Debug, Default)]
pub struct LoginResponse {
    pub token: String,
    pub failed: Option<LoginFailed>,
}

#[derive(Clone, Debug)]
pub struct LoginFailed(pub String);

impl std::fmt::Display for LoginFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for LoginFailed {}

impl MaybeFailed for LoginResponse {
    fn as_failed(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.failed
            .as_ref()
            .map(|f| f as &(dyn std::error::Error + Send + Sync + 'static))
    }
}
