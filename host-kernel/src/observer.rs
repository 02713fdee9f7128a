//! Hooks notified of every authorization decision.

use std::sync::Arc;

use host_policy::PolicyError;
use host_primitives::{ContextId, ToolIdentity};
use tracing::{debug, warn};

/// Observer invoked whenever a policy decision is produced.
pub trait PolicyObserver: Send + Sync {
    /// Records the decision for `identity` in `context`.
    fn on_decision(
        &self,
        context: ContextId,
        identity: &ToolIdentity,
        decision: Result<(), &PolicyError>,
    );
}

/// Observer that emits decisions to the tracing system.
#[derive(Debug, Default)]
pub struct TracingPolicyObserver;

impl PolicyObserver for TracingPolicyObserver {
    fn on_decision(
        &self,
        context: ContextId,
        identity: &ToolIdentity,
        decision: Result<(), &PolicyError>,
    ) {
        match decision {
            Ok(()) => debug!(context = %context, identity = %identity, "policy allow"),
            Err(err) => warn!(
                context = %context,
                identity = %identity,
                kind = %err.kind(),
                reason = %err,
                "policy deny"
            ),
        }
    }
}

/// Composite observer that forwards decisions to a collection of observers.
#[derive(Default)]
pub struct CompositePolicyObserver {
    observers: Vec<Arc<dyn PolicyObserver>>,
}

impl CompositePolicyObserver {
    /// Creates a new composite observer from the supplied list.
    #[must_use]
    pub fn new<I>(observers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn PolicyObserver>>,
    {
        Self {
            observers: observers.into_iter().collect(),
        }
    }

    /// Adds an observer to the composite set.
    pub fn push(&mut self, observer: Arc<dyn PolicyObserver>) {
        self.observers.push(observer);
    }

    /// Number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` when no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl PolicyObserver for CompositePolicyObserver {
    fn on_decision(
        &self,
        context: ContextId,
        identity: &ToolIdentity,
        decision: Result<(), &PolicyError>,
    ) {
        for observer in &self.observers {
            observer.on_decision(context, identity, decision);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    use host_primitives::ErrorKind;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<(String, Option<ErrorKind>)>>,
    }

    impl PolicyObserver for Recording {
        fn on_decision(
            &self,
            _context: ContextId,
            identity: &ToolIdentity,
            decision: Result<(), &PolicyError>,
        ) {
            let mut guard = self.seen.lock().expect("observer poisoned");
            guard.push((identity.to_string(), decision.err().map(PolicyError::kind)));
        }
    }

    #[test]
    fn composite_forwards_to_every_observer() {
        let first = Arc::new(Recording::default());
        let second = Arc::new(Recording::default());
        let mut composite = CompositePolicyObserver::new([first.clone() as Arc<dyn PolicyObserver>]);
        composite.push(second.clone());
        composite.push(Arc::new(TracingPolicyObserver));
        assert_eq!(composite.len(), 3);

        let identity = ToolIdentity::new("fs.read");
        composite.on_decision(ContextId::random(), &identity, Ok(()));
        composite.on_decision(ContextId::random(), &identity, Err(&PolicyError::Missing));

        for observer in [first, second] {
            let seen = observer.seen.lock().expect("observer poisoned").clone();
            assert_eq!(
                seen,
                vec![
                    ("tool.fs.read".to_owned(), None),
                    ("tool.fs.read".to_owned(), Some(ErrorKind::Configuration)),
                ]
            );
        }
    }
}
