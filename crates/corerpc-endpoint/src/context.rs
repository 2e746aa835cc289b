use std::any::{Any, TypeId};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`Context`] stopped waiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextError {
    /// The context's deadline passed.
    DeadlineExceeded,
    /// The context (or a parent) was explicitly cancelled.
    Cancelled,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::DeadlineExceeded => write!(f, "context deadline exceeded"),
            ContextError::Cancelled => write!(f, "context cancelled"),
        }
    }
}

impl std::error::Error for ContextError {}

/// Immutable, chainable request-scoped value lookup.
///
/// Mirrors `context.WithValue`'s linked-list semantics rather than a
/// mutable map: deriving a new context with a value never affects the
/// context it was derived from.
#[derive(Clone)]
struct Values {
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Values>>,
}

/// Carries deadline, cancellation, and a mapping of request-scoped
/// values through a call chain.
///
/// Cheap to clone: the deadline and cancellation token are shared, and
/// the value chain is an `Arc`-linked list.
#[derive(Clone)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: CancellationToken,
    values: Option<Arc<Values>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// An empty context with no deadline and a fresh, unlinked
    /// cancellation token.
    pub fn background() -> Self {
        Context {
            deadline: None,
            cancel: CancellationToken::new(),
            values: None,
        }
    }

    /// Derives a child context that is cancelled when `self` is
    /// cancelled, that the caller can additionally cancel on its own.
    /// Returns the child and a guard; dropping the guard cancels the
    /// child too, so `let (ctx, _guard) = parent.with_cancel();` gives
    /// the usual "cancel on exit" scoping (mirrors `defer cancel()`).
    pub fn with_cancel(&self) -> (Context, CancelGuard) {
        let child_token = self.cancel.child_token();
        let ctx = Context {
            deadline: self.deadline,
            cancel: child_token.clone(),
            values: self.values.clone(),
        };
        (ctx, CancelGuard { token: child_token })
    }

    /// Derives a child context whose deadline is the earlier of
    /// `self`'s existing deadline and `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Context {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Context {
            deadline: Some(deadline),
            cancel: self.cancel.child_token(),
            values: self.values.clone(),
        }
    }

    /// Shorthand for `with_deadline(Instant::now() + timeout)`.
    pub fn with_timeout(&self, timeout: Duration) -> Context {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Like `with_timeout`, but also returns a [`CancelGuard`]: dropping
    /// it (or calling `cancel()` on it) cancels the returned context and
    /// everything derived from it, independent of whether the deadline
    /// has passed yet. Gives callers that want "cancel in-flight work on
    /// early return" scoping without waiting out the timeout.
    pub fn with_timeout_cancel(&self, timeout: Duration) -> (Context, CancelGuard) {
        let (child, guard) = self.with_cancel();
        let ctx = child.with_deadline(Instant::now() + timeout);
        (ctx, guard)
    }

    /// Derives a child context carrying an additional request-scoped
    /// value, keyed by `T`'s type. A later `with_value::<T>` shadows
    /// an earlier one without disturbing the parent chain.
    pub fn with_value<T: Send + Sync + 'static>(&self, value: T) -> Context {
        Context {
            deadline: self.deadline,
            cancel: self.cancel.clone(),
            values: Some(Arc::new(Values {
                key: TypeId::of::<T>(),
                value: Arc::new(value),
                parent: self.values.clone(),
            })),
        }
    }

    /// Looks up the nearest value of type `T` in the chain.
    pub fn value<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let mut node = self.values.as_ref();
        let target = TypeId::of::<T>();
        while let Some(v) = node {
            if v.key == target {
                return v.value.clone().downcast::<T>().ok();
            }
            node = v.parent.as_ref();
        }
        None
    }

    /// The configured deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True if the deadline has passed or the context has been
    /// cancelled.
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Resolves once the context is done, yielding the reason.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => ContextError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.cancel.cancelled().await;
                ContextError::Cancelled
            }
        }
    }

    /// `Some(reason)` if the context is already done, matching `done()`
    /// without awaiting.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        if matches!(self.deadline, Some(d) if Instant::now() >= d) {
            return Some(ContextError::DeadlineExceeded);
        }
        None
    }
}

/// Owns the cancellation half of a context derived via
/// [`Context::with_cancel`]. Cancelling the guard cancels the context
/// and everything derived from it.
pub struct CancelGuard {
    token: CancellationToken,
}

impl CancelGuard {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
