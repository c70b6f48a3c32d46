//! Time-bounded rule cache.
//!
//! Readers take a lock-free snapshot of the compiled rule set. A reload swaps
//! the whole set at once, so a batch in flight keeps the rules it started with.

use super::rules::CompiledRule;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Duration, Utc};
use std::fmt::Debug;
use std::sync::Arc;

/// Source of the current time.
pub trait Clock: Debug + Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Compiled rules with their load time.
#[derive(Debug)]
pub(crate) struct LoadedRules {
    pub(crate) rules: Vec<CompiledRule>,
    pub(crate) loaded_at: DateTime<Utc>,
}

/// Rule cache with a fixed time to live.
#[derive(Debug)]
pub(crate) struct RuleCache {
    loaded: ArcSwapOption<LoadedRules>,
    ttl: Duration,
}

impl RuleCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self { loaded: ArcSwapOption::empty(), ttl }
    }

    /// Cached rules if they are younger than the TTL.
    pub(crate) fn fresh(&self, now: DateTime<Utc>) -> Option<Arc<LoadedRules>> {
        self.loaded.load_full().filter(|loaded| now - loaded.loaded_at < self.ttl)
    }

    pub(crate) fn store(&self, rules: Vec<CompiledRule>, now: DateTime<Utc>) -> Arc<LoadedRules> {
        let loaded = Arc::new(LoadedRules { rules, loaded_at: now });
        self.loaded.store(Some(Arc::clone(&loaded)));
        loaded
    }

    pub(crate) fn invalidate(&self) {
        self.loaded.store(None);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Clock advanced by hand.
    #[derive(Debug)]
    pub(crate) struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self(Mutex::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap()))
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[test]
    fn test_expires_after_ttl() {
        let clock = ManualClock::new();
        let cache = RuleCache::new(Duration::seconds(300));
        assert!(cache.fresh(clock.now()).is_none());

        cache.store(Vec::new(), clock.now());
        clock.advance(Duration::seconds(299));
        assert!(cache.fresh(clock.now()).is_some());

        clock.advance(Duration::seconds(1));
        assert!(cache.fresh(clock.now()).is_none());
    }

    #[test]
    fn test_invalidate() {
        let clock = ManualClock::new();
        let cache = RuleCache::new(Duration::seconds(300));
        cache.store(Vec::new(), clock.now());
        cache.invalidate();
        assert!(cache.fresh(clock.now()).is_none());
    }
}
