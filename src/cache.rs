use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A rendered page kept until its deadline passes
#[derive(Debug, Clone)]
struct CachedPage {
    body: String,
    expires_at: Instant,
}

/// Time-boxed store for rendered pages.
///
/// Entries are served as-is until they expire; writes elsewhere in the
/// application do not touch them. `clear` drops everything at once.
pub struct PageCache {
    ttl: Duration,
    pages: HashMap<String, CachedPage>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pages: HashMap::new(),
        }
    }

    /// Build the key for a page as seen by a given viewer
    pub fn key(uri: &str, viewer: Option<&str>) -> String {
        format!("{}|{}", viewer.unwrap_or(""), uri)
    }

    /// Return the cached body for `key` if it has not expired
    pub fn get(&mut self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: String, body: String) {
        self.insert_at(key, body, Instant::now());
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    fn get_at(&mut self, key: &str, now: Instant) -> Option<String> {
        self.clear_stale(now);
        self.pages.get(key).map(|page| page.body.clone())
    }

    fn insert_at(&mut self, key: String, body: String, now: Instant) {
        if self.ttl.is_zero() {
            return;
        }
        self.clear_stale(now);
        self.pages.insert(
            key,
            CachedPage {
                body,
                expires_at: now + self.ttl,
            },
        );
    }

    fn clear_stale(&mut self, now: Instant) {
        self.pages.retain(|_, page| now < page.expires_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_entry_before_expiry() {
        let mut cache = PageCache::new(Duration::from_secs(20));
        let now = Instant::now();
        cache.insert_at("/".into(), "<p>hello</p>".into(), now);

        let later = now + Duration::from_secs(19);
        assert_eq!(cache.get_at("/", later).as_deref(), Some("<p>hello</p>"));
    }

    #[test]
    fn drops_entry_after_expiry() {
        let mut cache = PageCache::new(Duration::from_secs(20));
        let now = Instant::now();
        cache.insert_at("/".into(), "<p>hello</p>".into(), now);

        let later = now + Duration::from_secs(20);
        assert_eq!(cache.get_at("/", later), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut cache = PageCache::new(Duration::from_secs(20));
        cache.insert("/".into(), "a".into());
        cache.insert("/?page=2".into(), "b".into());
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.get("/").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let mut cache = PageCache::new(Duration::ZERO);
        cache.insert("/".into(), "a".into());
        assert!(cache.get("/").is_none());
    }

    #[test]
    fn keys_differ_per_viewer() {
        assert_ne!(
            PageCache::key("/", Some("alice")),
            PageCache::key("/", None)
        );
        assert_eq!(PageCache::key("/?page=2", None), "|/?page=2");
    }
}
