use corerpc_endpoint::Error;

/// A snapshot pushed by an [`Instancer`](crate::Instancer) whenever the
/// set of known instance addresses changes, or whenever discovery
/// itself fails.
///
/// `instances` is kept sorted so two events describing the same set
/// compare equal regardless of discovery-backend ordering.
#[derive(Debug, Default)]
pub struct Event {
    pub instances: Vec<String>,
    pub err: Option<Error>,
}

impl Clone for Event {
    fn clone(&self) -> Self {
        Event {
            instances: self.instances.clone(),
            err: self.err.as_ref().map(|e| -> Error { e.to_string().into() }),
        }
    }
}

impl Event {
    pub fn instances(mut instances: Vec<String>) -> Self {
        instances.sort();
        Event {
            instances,
            err: None,
        }
    }

    pub fn failed(err: Error) -> Self {
        Event {
            instances: Vec::new(),
            err: Some(err),
        }
    }

    /// Structural equality used to dedupe repeated events: same
    /// instance set, and errors (if any) with the same message. Errors
    /// aren't `PartialEq`, so messages are compared instead.
    pub fn same_as(&self, other: &Event) -> bool {
        self.instances == other.instances
            && match (&self.err, &other.err) {
                (None, None) => true,
                (Some(a), Some(b)) => a.to_string() == b.to_string(),
                _ => false,
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_are_sorted_on_construction() {
        let e = Event::instances(vec!["b".into(), "a".into()]);
        assert_eq!(e.instances, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn same_as_compares_by_message_not_identity() {
        let a = Event::failed("boom".into());
        let b = Event::failed("boom".into());
        assert!(a.same_as(&b));
    }

    #[test]
    fn same_as_distinguishes_different_instance_sets() {
        let a = Event::instances(vec!["a".into()]);
        let b = Event::instances(vec!["a".into(), "b".into()]);
        assert!(!a.same_as(&b));
    }
}
