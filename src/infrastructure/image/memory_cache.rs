//! In-memory image cache implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{debug, info, trace};

use crate::domain::entities::{DecodedImage, ImageKey};
use crate::domain::ports::ImageCachePort;

static SHARED: OnceLock<Arc<MemoryImageCache>> = OnceLock::new();

/// In-memory cache for decoded images.
///
/// Entries never expire on their own; the cache is emptied when the host
/// reports memory pressure. Locks are held only for the map operation itself.
pub struct MemoryImageCache {
    entries: RwLock<HashMap<ImageKey, DecodedImage>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the process-wide cache, creating it on first use.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new())))
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len(),
        }
    }

    /// Returns true if `key` is cached, without touching the counters.
    #[must_use]
    pub fn contains(&self, key: &ImageKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Drops every entry in response to a memory warning.
    pub fn handle_memory_pressure(&self) {
        info!(cached = self.len(), "Memory pressure, dropping cached images");
        self.clear();
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}

impl ImageCachePort for MemoryImageCache {
    fn get(&self, key: &ImageKey) -> Option<DecodedImage> {
        let image = self.entries.read().get(key).cloned();
        if image.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key.fingerprint(), "Memory cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key.fingerprint(), "Memory cache miss");
        }
        image
    }

    fn set(&self, key: ImageKey, image: DecodedImage) {
        debug!(key = %key.fingerprint(), "Storing image in memory cache");
        self.entries.write().insert(key, image);
    }

    fn remove(&self, key: &ImageKey) {
        if self.entries.write().remove(key).is_some() {
            debug!(key = %key.fingerprint(), "Removed image from memory cache");
        }
    }

    fn clear(&self) {
        self.entries.write().clear();
        debug!("Cleared memory image cache");
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32) -> DecodedImage {
        DecodedImage::new(image::DynamicImage::new_rgb8(width, width))
    }

    #[test]
    fn test_cache_set_and_get() {
        let cache = MemoryImageCache::new();
        let key = ImageKey::from_url("https://example.com/image.jpg");
        let img = image(100);

        cache.set(key.clone(), img.clone());
        let retrieved = cache.get(&key);

        assert_eq!(retrieved, Some(img));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_miss() {
        let cache = MemoryImageCache::new();
        let key = ImageKey::from_url("https://example.com/missing.jpg");

        assert!(cache.get(&key).is_none());
        cache.remove(&key);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_overwrites() {
        let cache = MemoryImageCache::new();
        let key = ImageKey::from_url("https://example.com/image.jpg");
        let first = image(10);
        let second = image(20);

        cache.set(key.clone(), first);
        cache.set(key.clone(), second.clone());

        assert_eq!(cache.get(&key), Some(second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = MemoryImageCache::new();
        let a = ImageKey::from_url("https://example.com/a.png");
        let b = ImageKey::from_url("https://example.com/b.png");

        cache.set(a.clone(), image(1));
        cache.set(b.clone(), image(1));
        cache.remove(&a);
        assert!(!cache.contains(&a));
        assert!(cache.contains(&b));

        cache.handle_memory_pressure();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_stats() {
        let cache = MemoryImageCache::new();
        let key = ImageKey::from_url("https://example.com/image.jpg");

        cache.set(key.clone(), image(10));

        // Hit
        let _ = cache.get(&key);
        // Miss
        let _ = cache.get(&ImageKey::from_url("https://example.com/other.jpg"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(
            stats.to_string(),
            "Cache: 1 images, 50.0% hit rate (1 hits, 1 misses)"
        );
    }

    #[test]
    fn test_shared_is_single_instance() {
        let a = MemoryImageCache::shared();
        let b = MemoryImageCache::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = Arc::new(MemoryImageCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let key = ImageKey::from_url(format!("https://example.com/{i}.png"));
                    cache.set(key.clone(), image(1));
                    assert!(cache.get(&key).is_some());
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 8);
    }
}
