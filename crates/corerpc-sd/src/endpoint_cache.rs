use std::sync::Arc;
use std::time::Duration;

use corerpc_endpoint::{BoxEndpoint, Error};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tokio::time::Instant;

use crate::event::Event;
use crate::factory::{Closer, Factory};

/// How long an [`EndpointCache`] keeps serving its last-known-good
/// endpoint set after a discovery error, before reporting the error
/// to callers of [`endpoints`](EndpointCache::endpoints) instead.
pub struct EndpointerOptions {
    pub invalidate_on_error: bool,
    pub invalidate_timeout: Duration,
}

impl Default for EndpointerOptions {
    fn default() -> Self {
        EndpointerOptions {
            invalidate_on_error: false,
            invalidate_timeout: Duration::from_secs(10),
        }
    }
}

struct Entry<Req, Resp> {
    endpoint: BoxEndpoint<Req, Resp>,
    closer: Option<Arc<dyn Closer>>,
}

struct State<Req, Resp> {
    cache: IndexMap<String, Entry<Req, Resp>>,
    endpoints: Vec<BoxEndpoint<Req, Resp>>,
    err: Option<Error>,
    invalidate_deadline: Option<Instant>,
}

impl<Req, Resp> Default for State<Req, Resp> {
    fn default() -> Self {
        State {
            cache: IndexMap::new(),
            endpoints: Vec::new(),
            err: None,
            invalidate_deadline: None,
        }
    }
}

/// Reconciles instance-set [`Event`]s into a live set of endpoints,
/// opening an endpoint (via `factory`) for each newly-seen instance and
/// closing the ones that drop out. On a discovery error it either
/// serves the last-known-good set for `invalidate_timeout` (if
/// `invalidate_on_error`) or reports the error immediately.
///
/// Reconciles against an `IndexMap` keyed by instance id, running the
/// factory on insertion and the closer on removal, so `endpoints()`
/// always reflects the same order as the last sorted instance list.
pub struct EndpointCache<Req, Resp> {
    factory: Factory<Req, Resp>,
    options: EndpointerOptions,
    state: RwLock<State<Req, Resp>>,
}

impl<Req, Resp> EndpointCache<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    pub fn new(factory: Factory<Req, Resp>, options: EndpointerOptions) -> Self {
        EndpointCache {
            factory,
            options,
            state: RwLock::new(State::default()),
        }
    }

    pub fn update(&self, event: Event) {
        let mut state = self.state.write();

        if event.err.is_none() {
            self.reconcile(&mut state, event.instances);
            state.err = None;
            return;
        }

        let err = event.err.unwrap();
        tracing::warn!(error = %err, "instancer reported a discovery error");
        if !self.options.invalidate_on_error {
            return;
        }
        if state.err.is_some() {
            // an invalidation window is already open; don't extend it
            return;
        }
        state.invalidate_deadline = Some(Instant::now() + self.options.invalidate_timeout);
        state.err = Some(err);
    }

    pub fn endpoints(&self) -> Result<Vec<BoxEndpoint<Req, Resp>>, Error> {
        {
            let state = self.state.read();
            let past_deadline = state
                .invalidate_deadline
                .map(|d| Instant::now() >= d)
                .unwrap_or(false);
            if state.err.is_none() || !past_deadline {
                return Ok(state.endpoints.clone());
            }
        }

        let mut state = self.state.write();
        let past_deadline = state
            .invalidate_deadline
            .map(|d| Instant::now() >= d)
            .unwrap_or(false);
        if state.err.is_none() || !past_deadline {
            return Ok(state.endpoints.clone());
        }
        // the invalidation window elapsed with no good update: drop
        // whatever we were still serving and surface the error. The
        // error stays latched (not taken) so every subsequent call
        // keeps reporting it until a successful update clears it.
        self.reconcile(&mut state, Vec::new());
        Err(state.err.as_ref().unwrap().to_string().into())
    }

    fn reconcile(&self, state: &mut State<Req, Resp>, mut instances: Vec<String>) {
        instances.sort();
        instances.dedup();

        let mut next = IndexMap::with_capacity(instances.len());
        for instance in &instances {
            if let Some(entry) = state.cache.shift_remove(instance) {
                next.insert(instance.clone(), entry);
                continue;
            }
            match (self.factory)(instance) {
                Ok((endpoint, closer)) => {
                    next.insert(instance.clone(), Entry { endpoint, closer });
                }
                Err(err) => {
                    tracing::warn!(%instance, error = %err, "factory failed for instance");
                }
            }
        }

        // whatever's left in `state.cache` dropped out of the instance
        // set; close it before replacing the table.
        for (_, entry) in state.cache.drain(..) {
            if let Some(closer) = entry.closer {
                closer.close();
            }
        }

        state.endpoints = instances
            .iter()
            .filter_map(|i| next.get(i).map(|e| e.endpoint.clone()))
            .collect();
        state.cache = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corerpc_endpoint::from_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn factory_counting_closes(closes: Arc<AtomicUsize>) -> Factory<i32, i32> {
        struct CountingCloser(Arc<AtomicUsize>);
        impl Closer for CountingCloser {
            fn close(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        Arc::new(move |instance: &str| {
            let instance = instance.to_string();
            Ok((
                from_fn(move |_ctx, req: i32| {
                    let instance = instance.clone();
                    async move {
                        let _ = &instance;
                        Ok::<_, Error>(req)
                    }
                }),
                Some(Arc::new(CountingCloser(closes.clone())) as Arc<dyn Closer>),
            ))
        })
    }

    #[test]
    fn reconciles_new_instances_into_endpoints() {
        let cache = EndpointCache::new(
            factory_counting_closes(Arc::new(AtomicUsize::new(0))),
            EndpointerOptions::default(),
        );
        cache.update(Event::instances(vec!["a".into(), "b".into()]));
        assert_eq!(cache.endpoints().unwrap().len(), 2);
    }

    #[test]
    fn removed_instances_are_closed() {
        let closes = Arc::new(AtomicUsize::new(0));
        let cache = EndpointCache::new(factory_counting_closes(closes.clone()), EndpointerOptions::default());
        cache.update(Event::instances(vec!["a".into(), "b".into()]));
        cache.update(Event::instances(vec!["a".into()]));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(cache.endpoints().unwrap().len(), 1);
    }

    #[test]
    fn error_without_invalidate_on_error_keeps_serving_stale_set() {
        let cache = EndpointCache::new(
            factory_counting_closes(Arc::new(AtomicUsize::new(0))),
            EndpointerOptions::default(),
        );
        cache.update(Event::instances(vec!["a".into()]));
        cache.update(Event::failed("discovery down".into()));
        assert_eq!(cache.endpoints().unwrap().len(), 1);
    }

    #[test]
    fn error_with_invalidate_on_error_surfaces_after_deadline() {
        let cache = EndpointCache::new(
            factory_counting_closes(Arc::new(AtomicUsize::new(0))),
            EndpointerOptions {
                invalidate_on_error: true,
                invalidate_timeout: Duration::from_millis(1),
            },
        );
        cache.update(Event::instances(vec!["a".into()]));
        cache.update(Event::failed("discovery down".into()));
        assert!(cache.endpoints().is_ok());
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.endpoints().is_err());
        // the latched error is never taken, so every subsequent read
        // keeps reporting it rather than falling through to an empty
        // "no error" snapshot.
        assert!(cache.endpoints().is_err());
        assert!(cache.endpoints().is_err());
    }
}
