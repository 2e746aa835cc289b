use std::sync::Arc;
use std::time::Duration;

use corerpc_endpoint::{from_fn, BoxEndpoint, Context, Error};
use tokio::sync::oneshot;

use crate::balancer::Balancer;

/// Decides, after a failed attempt, whether to try again and/or to
/// substitute a different error for the one that was received.
pub type Callback = Arc<dyn Fn(usize, &Error) -> (bool, Option<Error>) + Send + Sync>;

/// The error [`retry_with_callback`] returns once it gives up: the
/// terminating error plus the message of every attempt that preceded
/// it.
#[derive(Debug)]
pub struct RetryError {
    pub raw_errors: Vec<String>,
    pub final_error: Error,
}

impl std::fmt::Display for RetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.raw_errors.len() > 1 {
            let prior = self.raw_errors[..self.raw_errors.len() - 1].join("; ");
            write!(f, "{} (previously: {})", self.final_error, prior)
        } else {
            write!(f, "{}", self.final_error)
        }
    }
}

impl std::error::Error for RetryError {}

/// A [`Callback`] that keeps trying until `max` attempts have been made.
pub fn max_retries(max: usize) -> Callback {
    Arc::new(move |attempt, _err| (attempt < max, None))
}

/// A [`Callback`] that retries unconditionally, deferring entirely to
/// the overall timeout to bound attempts.
pub fn always_retry() -> Callback {
    Arc::new(|_attempt, _err| (true, None))
}

/// Retries a balanced call up to `max` times, bounded overall by
/// `timeout`.
pub fn retry<Req, Resp>(
    max: usize,
    timeout: Duration,
    balancer: Arc<dyn Balancer<Req, Resp>>,
) -> BoxEndpoint<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Send + Sync + 'static,
{
    retry_with_callback(timeout, balancer, max_retries(max))
}

/// Retries a balanced call, bounded overall by `timeout`, consulting
/// `cb` after every failed attempt to decide whether to keep going and
/// whether to substitute a different error.
///
/// Each attempt races a fresh `Endpoint` pick (from `balancer`) and
/// call against `ctx`'s deadline: a `tokio::spawn`'d task and a
/// oneshot, raced via `select!` against `ctx.done()`. On every exit
/// path the bounded context is cancelled, so an attempt still running
/// in the background observes cancellation immediately rather than
/// running until the original timeout; nothing reads its result.
pub fn retry_with_callback<Req, Resp>(
    timeout: Duration,
    balancer: Arc<dyn Balancer<Req, Resp>>,
    cb: Callback,
) -> BoxEndpoint<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Send + Sync + 'static,
{
    from_fn(move |ctx: Context, request: Req| {
        let balancer = balancer.clone();
        let cb = cb.clone();
        async move {
            // `_cancel_guard` cancels `ctx` (and every attempt context
            // derived from it) when this future exits, whether by
            // success, exhausting retries, or deadline — not only when
            // `timeout` itself has elapsed.
            let (ctx, _cancel_guard) = ctx.with_timeout_cancel(timeout);
            let mut raw_errors: Vec<String> = Vec::new();
            let mut attempt: usize = 1;

            loop {
                let (tx, rx) = oneshot::channel::<Result<Resp, Error>>();
                let attempt_ctx = ctx.clone();
                let attempt_balancer = balancer.clone();
                let attempt_request = request.clone();

                tokio::spawn(async move {
                    let result = match attempt_balancer.endpoint() {
                        Ok(endpoint) => endpoint.call(attempt_ctx, attempt_request).await,
                        Err(err) => Err(err),
                    };
                    let _ = tx.send(result);
                });

                tokio::select! {
                    reason = ctx.done() => {
                        return Err(Box::new(reason) as Error);
                    }
                    received = rx => {
                        let received: Result<Resp, Error> = match received {
                            Ok(result) => result,
                            Err(_) => Err("retry attempt ended without a result".into()),
                        };
                        match received {
                            Ok(resp) => return Ok(resp),
                            Err(err) => {
                                let (keep_trying, replacement) = cb(attempt, &err);
                                raw_errors.push(err.to_string());
                                let err = replacement.unwrap_or(err);
                                if !keep_trying {
                                    return Err(Box::new(RetryError {
                                        raw_errors,
                                        final_error: err,
                                    }) as Error);
                                }
                                attempt += 1;
                            }
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancer::ErrNoEndpoints;
    use corerpc_endpoint::from_fn as endpoint_from_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AlwaysFails;
    impl Balancer<i32, i32> for AlwaysFails {
        fn endpoint(&self) -> Result<BoxEndpoint<i32, i32>, Error> {
            Err(Box::new(ErrNoEndpoints))
        }
    }

    struct CountedFlaky(Arc<AtomicUsize>, usize);
    impl Balancer<i32, i32> for CountedFlaky {
        fn endpoint(&self) -> Result<BoxEndpoint<i32, i32>, Error> {
            let attempt = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            let succeed_at = self.1;
            Ok(endpoint_from_fn(move |_ctx, req: i32| async move {
                if attempt < succeed_at {
                    Err("not yet".into())
                } else {
                    Ok(req)
                }
            }))
        }
    }

    #[tokio::test]
    async fn retry_error_message_lists_prior_attempts() {
        let balancer: Arc<dyn Balancer<i32, i32>> = Arc::new(AlwaysFails);
        let endpoint = retry(3, Duration::from_secs(1), balancer);
        let err = endpoint
            .call(Context::background(), 1)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("no endpoints available"));
        assert!(msg.contains("previously:"));
    }

    #[tokio::test]
    async fn succeeds_once_balancer_recovers_within_budget() {
        let balancer: Arc<dyn Balancer<i32, i32>> =
            Arc::new(CountedFlaky(Arc::new(AtomicUsize::new(0)), 3));
        let endpoint = retry(5, Duration::from_secs(1), balancer);
        let resp = endpoint.call(Context::background(), 9).await.unwrap();
        assert_eq!(resp, 9);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let balancer: Arc<dyn Balancer<i32, i32>> = Arc::new(AlwaysFails);
        let endpoint = retry(2, Duration::from_secs(1), balancer);
        let err = endpoint.call(Context::background(), 1).await.unwrap_err();
        let retry_err = err.downcast_ref::<RetryError>().unwrap();
        assert_eq!(retry_err.raw_errors.len(), 2);
    }

    #[tokio::test]
    async fn deadline_exceeded_short_circuits_before_max_attempts() {
        struct NeverResolves;
        impl Balancer<i32, i32> for NeverResolves {
            fn endpoint(&self) -> Result<BoxEndpoint<i32, i32>, Error> {
                // never completes on its own: only the outer deadline
                // (not this endpoint) should end the call.
                Ok(endpoint_from_fn(|_ctx: Context, _req: i32| async move {
                    std::future::pending::<()>().await;
                    unreachable!()
                }))
            }
        }
        let balancer: Arc<dyn Balancer<i32, i32>> = Arc::new(NeverResolves);
        let endpoint = retry_with_callback(Duration::from_millis(20), balancer, always_retry());
        let err = endpoint.call(Context::background(), 1).await.unwrap_err();
        assert!(err.downcast_ref::<corerpc_endpoint::ContextError>().is_some());
    }

    #[tokio::test]
    async fn bounded_context_is_cancelled_as_soon_as_retry_returns() {
        // the overall timeout (10s) is far longer than the call takes;
        // the attempt's context should be done() immediately on return,
        // not only once that 10s budget would otherwise elapse.
        let (ctx_tx, mut ctx_rx) = tokio::sync::mpsc::unbounded_channel::<Context>();
        struct Capturing(tokio::sync::mpsc::UnboundedSender<Context>);
        impl Balancer<i32, i32> for Capturing {
            fn endpoint(&self) -> Result<BoxEndpoint<i32, i32>, Error> {
                let tx = self.0.clone();
                Ok(endpoint_from_fn(move |ctx: Context, req: i32| {
                    let tx = tx.clone();
                    async move {
                        let _ = tx.send(ctx);
                        Ok(req)
                    }
                }))
            }
        }

        let balancer: Arc<dyn Balancer<i32, i32>> = Arc::new(Capturing(ctx_tx));
        let endpoint = retry(3, Duration::from_secs(10), balancer);
        let resp = endpoint.call(Context::background(), 7).await.unwrap();
        assert_eq!(resp, 7);

        let captured = ctx_rx.try_recv().unwrap();
        assert!(captured.is_done());
    }
}
