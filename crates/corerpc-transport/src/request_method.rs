/// Context value carrying the fully-qualified method name (e.g.
/// `/user.User/Login`), stamped by the server's gating interceptor and
/// readable by `before`/`after` hooks on either side.
///
/// A typed context value rather than a raw string key: lookups go
/// through `Context::value::<RequestMethod>()`, so there's no string
/// key to collide with another component's.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestMethod(pub String);

impl std::fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
