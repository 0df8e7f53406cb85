//! Stale-while-revalidate result cache.
//!
//! Keys are structured value types with derived equality, never
//! hand-concatenated strings: two logically identical requests produce
//! the same key regardless of how the request was parsed.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;

/// Cache key for dashboard/anomaly views: the date window alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeKey {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Cache key for the tracking-plan view: every parameter that affects
/// the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackingPlanKey {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub event: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

/// A keyed stale-while-revalidate cache.
///
/// `read_through` on a hit returns the cached value immediately and
/// refreshes the entry in a detached task; refresh failures are logged
/// and swallowed — the caller already got valid (if stale) data. On a
/// miss the fetch happens inline and its errors propagate.
///
/// Entries never expire; a second `read_through` for a key whose refresh
/// is still in flight simply issues a redundant fetch. Bounding memory
/// with an entry-count LRU is an extension point, not implemented here.
pub struct SwrCache<K, V> {
    map: Arc<RwLock<HashMap<K, V>>>,
    /// Operation label used when logging background-refresh failures.
    name: &'static str,
}

impl<K, V> Clone for SwrCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            map: Arc::clone(&self.map),
            name: self.name,
        }
    }
}

impl<K, V> SwrCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            map: Arc::new(RwLock::new(HashMap::new())),
            name,
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.map.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: K, value: V) {
        self.map.write().await.insert(key, value);
    }

    pub async fn read_through<F, Fut, E>(&self, key: K, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send,
        E: Display + Send + 'static,
    {
        if let Some(cached) = self.get(&key).await {
            // Serve stale, refresh detached. The refresh outcome must
            // never reach the caller that already has a value.
            let cache = self.clone();
            let name = self.name;
            tokio::spawn(async move {
                match fetcher().await {
                    Ok(fresh) => cache.insert(key, fresh).await,
                    Err(e) => {
                        tracing::warn!(cache = name, error = %e, "background refresh failed")
                    }
                }
            });
            return Ok(cached);
        }

        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn key(start: &str, end: &str) -> RangeKey {
        RangeKey {
            start: NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap(),
            end: NaiveDate::parse_from_str(end, "%Y-%m-%d").unwrap(),
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let cache: SwrCache<RangeKey, i64> = SwrCache::new("test");
        cache.insert(key("2025-06-01", "2025-06-07"), 42).await;
        assert_eq!(cache.get(&key("2025-06-01", "2025-06-07")).await, Some(42));
        assert_eq!(cache.get(&key("2025-06-01", "2025-06-08")).await, None);
    }

    #[tokio::test]
    async fn miss_awaits_fetcher_and_stores() {
        let cache: SwrCache<RangeKey, i64> = SwrCache::new("test");
        let value = cache
            .read_through(key("2025-06-01", "2025-06-07"), || async {
                Ok::<_, std::io::Error>(7)
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(cache.get(&key("2025-06-01", "2025-06-07")).await, Some(7));
    }

    #[tokio::test]
    async fn miss_propagates_fetch_errors_and_stores_nothing() {
        let cache: SwrCache<RangeKey, i64> = SwrCache::new("test");
        let result = cache
            .read_through(key("2025-06-01", "2025-06-07"), || async {
                Err::<i64, _>(std::io::Error::other("warehouse down"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.get(&key("2025-06-01", "2025-06-07")).await, None);
    }

    #[tokio::test]
    async fn hit_serves_stale_and_refreshes_in_background() {
        let cache: SwrCache<RangeKey, i64> = SwrCache::new("test");
        let k = key("2025-06-01", "2025-06-07");
        cache.insert(k.clone(), 1).await;

        let stale = cache
            .read_through(k.clone(), || async { Ok::<_, std::io::Error>(2) })
            .await
            .unwrap();
        // The hit path returns the previous value synchronously.
        assert_eq!(stale, 1);

        // The detached refresh lands shortly after.
        tokio::task::yield_now().await;
        for _ in 0..100 {
            if cache.get(&k).await == Some(2) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("background refresh never landed");
    }

    #[tokio::test]
    async fn hit_never_errors_even_when_refresh_fails() {
        let cache: SwrCache<RangeKey, i64> = SwrCache::new("test");
        let k = key("2025-06-01", "2025-06-07");
        cache.insert(k.clone(), 9).await;

        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fetches);
        let value = cache
            .read_through(k.clone(), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i64, _>(std::io::Error::other("refresh exploded"))
            })
            .await
            .unwrap();
        assert_eq!(value, 9);

        // The failed refresh ran but left the stale entry in place.
        tokio::task::yield_now().await;
        for _ in 0..100 {
            if fetches.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(cache.get(&k).await, Some(9));
    }

    #[test]
    fn keys_with_equal_fields_are_equal() {
        let a = TrackingPlanKey {
            start: NaiveDate::parse_from_str("2025-06-01", "%Y-%m-%d").unwrap(),
            end: NaiveDate::parse_from_str("2025-06-07", "%Y-%m-%d").unwrap(),
            event: Some("purchase".to_string()),
            page: 1,
            page_size: 10,
        };
        let b = a.clone();
        assert_eq!(a, b);
    }
}
