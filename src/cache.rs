use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::clock::Clock;

pub trait SummaryCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    /// Drops every expired entry and returns how many were removed.
    fn expire(&self) -> usize;
}

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-process cache where every entry lives for the same fixed time-to-live.
pub struct TtlCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(1));
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SummaryCache for TtlCache {
    fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().ok()?;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        debug!(key, "evicting expired cache entry");
        if let Ok(mut entries) = self.entries.write() {
            if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
                entries.remove(key);
            }
        }
        None
    }

    fn set(&self, key: &str, value: String) {
        let expires_at = self.clock.now() + self.ttl;
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), Entry { value, expires_at });
        }
    }

    fn expire(&self) -> usize {
        let now = self.clock.now();
        match self.entries.write() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|_, entry| entry.expires_at > now);
                before - entries.len()
            }
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn cache_with_clock() -> (TtlCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let cache = TtlCache::new(std::time::Duration::from_secs(60), clock.clone());
        (cache, clock)
    }

    #[test]
    fn returns_value_until_ttl_elapses() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "summary".to_string());
        clock.advance(Duration::seconds(59));
        assert_eq!(cache.get("k").as_deref(), Some("summary"));
        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn expire_removes_only_stale_entries() {
        let (cache, clock) = cache_with_clock();
        cache.set("old", "a".to_string());
        clock.advance(Duration::seconds(30));
        cache.set("new", "b".to_string());
        clock.advance(Duration::seconds(40));
        assert_eq!(cache.expire(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("new").as_deref(), Some("b"));
    }
}
