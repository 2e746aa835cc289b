use parking_lot::RwLock;
use tokio::sync::mpsc::UnboundedSender;

use crate::event::Event;

/// Deduplicates and fans out instance events to every registered
/// subscriber. Shared by every concrete [`Instancer`](crate::Instancer)
/// that talks to a live discovery backend.
pub struct InstanceCache {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Event,
    subscribers: Vec<UnboundedSender<Event>>,
}

impl Default for InstanceCache {
    fn default() -> Self {
        InstanceCache {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the cached state and broadcasts to subscribers, unless
    /// the event is identical to the last one observed. The instance
    /// slice is sorted first so dedup and ordering don't depend on
    /// callers constructing events through a sorting helper.
    pub fn update(&self, mut event: Event) {
        event.instances.sort();

        let mut inner = self.inner.write();
        if inner.state.same_as(&event) {
            return;
        }
        inner.state = event.clone();
        inner.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn state(&self) -> Event {
        self.inner.read().state.clone()
    }

    /// Registers `ch` and immediately pushes the current state to it,
    /// so a late subscriber doesn't wait for the next change.
    pub fn register(&self, ch: UnboundedSender<Event>) {
        let mut inner = self.inner.write();
        let current = inner.state.clone();
        let _ = ch.send(current);
        inner.subscribers.push(ch);
    }

    pub fn deregister(&self, ch: &UnboundedSender<Event>) {
        let mut inner = self.inner.write();
        inner.subscribers.retain(|tx| !tx.same_channel(ch));
    }

    /// Structural no-op: there is no background task or OS resource
    /// tied to this cache to release (see SPEC_FULL.md's note on
    /// `InstanceCache::stop`).
    pub fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_pushes_current_state_immediately() {
        let cache = InstanceCache::new();
        cache.update(Event::instances(vec!["a".into()]));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        cache.register(tx);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.instances, vec!["a".to_string()]);
    }

    #[test]
    fn identical_events_are_not_rebroadcast() {
        let cache = InstanceCache::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        cache.register(tx);
        rx.try_recv().unwrap(); // the initial empty-state push

        cache.update(Event::instances(vec!["a".into()]));
        rx.try_recv().unwrap();

        cache.update(Event::instances(vec!["a".into()]));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn update_sorts_unsorted_instances() {
        let cache = InstanceCache::new();
        cache.update(Event {
            instances: vec!["b".to_string(), "a".to_string()],
            err: None,
        });
        assert_eq!(cache.state().instances, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn deregistered_subscribers_stop_receiving() {
        let cache = InstanceCache::new();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        cache.register(tx.clone());
        drop(rx);

        // the dead channel's send() fails, so it's pruned on the next update
        cache.update(Event::instances(vec!["a".into()]));
        cache.deregister(&tx);
    }
}
