//! cache.rs: small in-memory cache with per-entry expiry for read-mostly API lookups.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    inner: Mutex<HashMap<String, Entry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Returns a clone of the live value; expired entries are evicted on read.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        match map.get(key) {
            Some(e) if now < e.expires_at => Some(e.value.clone()),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.inner
            .lock()
            .expect("cache mutex poisoned")
            .insert(key.into(), entry);
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.lock().expect("cache mutex poisoned").remove(key);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_returned() {
        let c = TtlCache::new(Duration::from_secs(60));
        c.insert("agents", vec![1, 2, 3]);
        assert_eq!(c.get("agents"), Some(vec![1, 2, 3]));
        assert_eq!(c.get("missing"), None);
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let c = TtlCache::new(Duration::from_secs(60));
        c.insert_with_ttl("lb", 7u32, Duration::from_secs(5));
        let later = Instant::now() + Duration::from_secs(6);
        assert_eq!(c.get_at("lb", later), None);
        assert!(c.is_empty());
    }

    #[test]
    fn zero_ttl_never_hits() {
        let c = TtlCache::new(Duration::ZERO);
        c.insert("k", "v".to_string());
        assert_eq!(c.get("k"), None);
    }

    #[test]
    fn invalidate_removes_entry() {
        let c = TtlCache::new(Duration::from_secs(60));
        c.insert("k", 1);
        c.invalidate("k");
        assert_eq!(c.get("k"), None);
    }
}
