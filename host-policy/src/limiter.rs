//! Per-identity call counters.

use std::collections::HashMap;
use std::sync::Mutex;

use host_primitives::ToolIdentity;

/// Outcome of charging one call against a limit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LimitCheck {
    /// No limit is configured for the identity; nothing was counted.
    Unlimited,
    /// The call fits in the budget.
    Within {
        /// Post-increment count.
        count: u64,
        /// Configured maximum.
        limit: u64,
    },
    /// The call exceeds the budget. The counter was still incremented.
    Exceeded {
        /// Post-increment count.
        count: u64,
        /// Configured maximum.
        limit: u64,
    },
}

/// Call limits and the counters charged against them.
///
/// Counters only grow. Increment and comparison happen under one lock, so
/// two calls racing for the last unit of budget cannot both pass.
#[derive(Debug, Default)]
pub struct CallLimiter {
    limits: HashMap<ToolIdentity, u64>,
    counters: Mutex<HashMap<ToolIdentity, u64>>,
}

impl CallLimiter {
    /// Creates a limiter from `(identity, max_calls)` pairs.
    ///
    /// Identities are canonicalized; a repeated identity keeps the last limit.
    #[must_use]
    pub fn new<I, S>(limits: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        Self {
            limits: limits
                .into_iter()
                .map(|(identity, limit)| (ToolIdentity::new(identity), limit))
                .collect(),
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Configured limit for `identity`, if any.
    #[must_use]
    pub fn limit(&self, identity: &ToolIdentity) -> Option<u64> {
        self.limits.get(identity).copied()
    }

    /// Configured limits.
    #[must_use]
    pub fn limits(&self) -> &HashMap<ToolIdentity, u64> {
        &self.limits
    }

    /// Charges one call to `identity`.
    ///
    /// # Panics
    ///
    /// Panics if the counter lock is poisoned.
    pub fn charge(&self, identity: &ToolIdentity) -> LimitCheck {
        let Some(limit) = self.limit(identity) else {
            return LimitCheck::Unlimited;
        };

        let mut counters = self.counters.lock().expect("call counters poisoned");
        let counter = counters.entry(identity.clone()).or_insert(0);
        *counter = counter.saturating_add(1);
        let count = *counter;

        if count > limit {
            LimitCheck::Exceeded { count, limit }
        } else {
            LimitCheck::Within { count, limit }
        }
    }

    /// Calls charged so far to `identity`.
    ///
    /// # Panics
    ///
    /// Panics if the counter lock is poisoned.
    #[must_use]
    pub fn count(&self, identity: &ToolIdentity) -> u64 {
        let counters = self.counters.lock().expect("call counters poisoned");
        counters.get(identity).copied().unwrap_or(0)
    }
}
