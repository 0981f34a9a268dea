//! Refresh Policy
//!
//! Decides, for each read, whether the stored entry can be served.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::entry::CacheEntry;

/// Outcome of consulting the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    /// Entry is within max-age
    Serve,
    /// No entry exists
    RefreshEmpty,
    /// Entry exists but has outlived max-age
    RefreshStale,
}

impl RefreshDecision {
    pub fn needs_refresh(&self) -> bool {
        !matches!(self, RefreshDecision::Serve)
    }
}

impl std::fmt::Display for RefreshDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshDecision::Serve => write!(f, "serve"),
            RefreshDecision::RefreshEmpty => write!(f, "empty"),
            RefreshDecision::RefreshStale => write!(f, "stale"),
        }
    }
}

/// Max-age staleness policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    max_age: Duration,
}

impl RefreshPolicy {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Stale once `now` reaches `captured_at + max_age`.
    pub fn is_stale(&self, captured_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        // A max-age too large for chrono can never elapse.
        let Ok(max_age) = TimeDelta::from_std(self.max_age) else {
            return false;
        };
        match captured_at.checked_add_signed(max_age) {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    pub fn decide<T>(&self, entry: Option<&CacheEntry<T>>, now: DateTime<Utc>) -> RefreshDecision {
        match entry {
            None => RefreshDecision::RefreshEmpty,
            Some(entry) if self.is_stale(entry.captured_at(), now) => RefreshDecision::RefreshStale,
            Some(_) => RefreshDecision::Serve,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_fresh_within_max_age() {
        let policy = RefreshPolicy::new(Duration::from_secs(300));

        assert!(!policy.is_stale(at(0), at(0)));
        assert!(!policy.is_stale(at(0), at(299)));
        assert!(policy.is_stale(at(0), at(300)));
        assert!(policy.is_stale(at(0), at(301)));
    }

    #[test]
    fn test_decide() {
        let policy = RefreshPolicy::new(Duration::from_secs(60));
        let entry = CacheEntry::new(vec![1], at(0), 1);

        assert_eq!(
            policy.decide::<i32>(None, at(0)),
            RefreshDecision::RefreshEmpty
        );
        assert_eq!(policy.decide(Some(&entry), at(30)), RefreshDecision::Serve);
        assert_eq!(
            policy.decide(Some(&entry), at(61)),
            RefreshDecision::RefreshStale
        );
        assert!(RefreshDecision::RefreshStale.needs_refresh());
        assert!(!RefreshDecision::Serve.needs_refresh());
    }

    #[test]
    fn test_huge_max_age_never_expires() {
        let policy = RefreshPolicy::new(Duration::MAX);
        assert!(!policy.is_stale(at(0), at(10_000_000)));
    }

    #[test]
    fn test_zero_max_age_is_always_stale() {
        let policy = RefreshPolicy::new(Duration::ZERO);
        assert!(policy.is_stale(at(0), at(0)));
        assert!(policy.is_stale(at(0), at(1)));
    }
}
