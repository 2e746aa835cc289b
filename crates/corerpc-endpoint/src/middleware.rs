use crate::endpoint::BoxEndpoint;

/// A transformation `Endpoint -> Endpoint`.
pub type Middleware<Req, Resp> =
    std::sync::Arc<dyn Fn(BoxEndpoint<Req, Resp>) -> BoxEndpoint<Req, Resp> + Send + Sync>;

/// Composes middlewares right-to-left: `chain(m1, [m2, m3])(e) ==
/// m1(m2(m3(e)))`. The outer middleware (`outer`) observes the call
/// first and the response last.
pub fn chain<Req, Resp>(
    outer: Middleware<Req, Resp>,
    others: Vec<Middleware<Req, Resp>>,
) -> Middleware<Req, Resp>
where
    Req: 'static,
    Resp: 'static,
{
    std::sync::Arc::new(move |next| {
        let mut next = next;
        for m in others.iter().rev() {
            next = m(next);
        }
        outer(next)
    })
}

/// The two-sided identity middleware: `identity()(e) == e`.
pub fn identity<Req, Resp>() -> Middleware<Req, Resp>
where
    Req: 'static,
    Resp: 'static,
{
    std::sync::Arc::new(|next| next)
}
