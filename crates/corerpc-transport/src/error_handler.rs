use std::sync::Arc;

use corerpc_endpoint::{Context, Error};

/// Reacts to a transport-stage error. The default, [`LogErrorHandler`],
/// just logs; callers that need metrics or alerting supply their own.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, ctx: &Context, err: &Error);
}

/// Logs the error via `tracing` and otherwise does nothing.
#[derive(Default)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle(&self, _ctx: &Context, err: &Error) {
        tracing::warn!(error = %err, "transport error");
    }
}

/// Adapts a plain closure to an [`ErrorHandler`].
pub struct ErrorHandlerFn<F>(F);

impl<F> ErrorHandlerFn<F>
where
    F: Fn(&Context, &Error) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        ErrorHandlerFn(f)
    }
}

impl<F> ErrorHandler for ErrorHandlerFn<F>
where
    F: Fn(&Context, &Error) + Send + Sync,
{
    fn handle(&self, ctx: &Context, err: &Error) {
        (self.0)(ctx, err)
    }
}

/// Boxes a closure as a shareable [`ErrorHandler`].
pub fn from_fn<F>(f: F) -> Arc<dyn ErrorHandler>
where
    F: Fn(&Context, &Error) + Send + Sync + 'static,
{
    Arc::new(ErrorHandlerFn::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn fn_adapter_forwards_to_closure() {
        let seen = Arc::new(Mutex::new(0usize));
        let seen2 = seen.clone();
        let handler = from_fn(move |_ctx, _err| {
            *seen2.lock().unwrap() += 1;
        });
        let err: Error = "boom".into();
        handler.handle(&Context::background(), &err);
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
