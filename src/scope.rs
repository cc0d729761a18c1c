//! Request scope: the deadline/cancellation token threaded through every
//! cache and cache-aside call (§5's "request scope carrying deadline and
//! cancellation").

use std::time::Duration;
use tokio::time::Instant;

/// Carries a deadline for one logical request. Cloning a `Scope` shares the
/// same deadline; it does not reset it.
#[derive(Debug, Clone, Copy)]
pub struct Scope {
    deadline: Instant,
}

impl Scope {
    /// A scope that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
        }
    }

    /// A scope with no practical deadline, for startup/registration paths
    /// that are not on the request-serving hot path.
    pub fn unbounded() -> Self {
        Self::with_timeout(Duration::from_secs(3600))
    }

    /// Time remaining until the deadline; zero if already expired.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// A short detached scope for a bounded background backfill, independent
    /// of the caller's own deadline (§9 "fire-and-forget cache writes").
    pub fn detached(timeout: Duration) -> Self {
        Self::with_timeout(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_scope_is_not_expired() {
        let scope = Scope::with_timeout(Duration::from_secs(1));
        assert!(!scope.is_expired());
        assert!(scope.remaining() <= Duration::from_secs(1));
    }

    #[test]
    fn zero_timeout_is_expired() {
        let scope = Scope::with_timeout(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(scope.is_expired());
        assert_eq!(scope.remaining(), Duration::ZERO);
    }
}
