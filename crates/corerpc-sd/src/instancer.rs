use tokio::sync::mpsc::UnboundedSender;

use crate::event::Event;

/// A source of instance-set change notifications. Implementations push
/// an [`Event`] to every registered channel whenever the instance set
/// (or a discovery error) changes.
pub trait Instancer: Send + Sync {
    fn register(&self, ch: UnboundedSender<Event>);
    fn deregister(&self, ch: &UnboundedSender<Event>);
    fn stop(&self);
}

/// An [`Instancer`] over a static, never-changing instance list. Useful
/// for tests and for deployments that don't need live discovery.
pub struct FixedInstancer(Vec<String>);

impl FixedInstancer {
    pub fn new(instances: Vec<String>) -> Self {
        FixedInstancer(instances)
    }
}

impl Instancer for FixedInstancer {
    fn register(&self, ch: UnboundedSender<Event>) {
        let _ = ch.send(Event::instances(self.0.clone()));
    }

    fn deregister(&self, _ch: &UnboundedSender<Event>) {}

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_instancer_pushes_its_list_on_register() {
        let instancer = FixedInstancer::new(vec!["10.0.0.1:8080".into()]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        instancer.register(tx);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.instances, vec!["10.0.0.1:8080".to_string()]);
        assert!(event.err.is_none());
    }
}
