/// Lets a response value carry a domain-level failure distinct from a
/// transport failure.
///
/// A response type opts in by overriding `as_failed`; the default
/// always reports no failure. Transports inspect this after a
/// successful endpoint call and surface a non-`None` failure to the
/// caller without treating the transport stage itself as having
/// aborted (see `corerpc_transport`'s server pipeline).
pub trait MaybeFailed {
    fn as_failed(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl MaybeFailed for Plain {}

    #[derive(Debug)]
    struct DomainError;
    impl std::fmt::Display for DomainError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "domain error")
        }
    }
    impl std::error::Error for DomainError {}

    struct Failing(DomainError);
    impl MaybeFailed for Failing {
        fn as_failed(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn default_reports_no_failure() {
        assert!(Plain.as_failed().is_none());
    }

    #[test]
    fn overridden_reports_failure() {
        assert!(Failing(DomainError).as_failed().is_some());
    }
}
