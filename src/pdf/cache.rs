//! Bounded bitmap cache for rendered pages
//!
//! Entries are evicted in insertion order. Lookups use `peek` so reads never
//! refresh an entry's position.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use lru::LruCache;
use tiny_skia::Pixmap;

use super::types::Size;

/// Cache key for rendered pages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Page index (0-indexed)
    pub page: usize,
    /// Zoom rounded to two decimals, stored as hundredths for stable hashing
    pub zoom_hundredths: i32,
}

impl CacheKey {
    #[must_use]
    pub fn new(page: usize, zoom: f32) -> Self {
        Self {
            page,
            zoom_hundredths: (zoom * 100.0).round() as i32,
        }
    }
}

/// A rendered page snapshot
pub struct CachedPage {
    /// Rendered bitmap in device pixels
    pub bitmap: Pixmap,
    /// Displayed size in CSS pixels
    pub css_size: Size,
}

impl CachedPage {
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.bitmap.data().len()
    }
}

impl std::fmt::Debug for CachedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedPage")
            .field("width_px", &self.bitmap.width())
            .field("height_px", &self.bitmap.height())
            .field("css_size", &self.css_size)
            .finish()
    }
}

/// FIFO cache of rendered page bitmaps
pub struct RenderCache {
    cache: LruCache<CacheKey, Arc<CachedPage>>,
}

/// Cache shared between the page renderers of one session
pub type SharedCache = Arc<Mutex<RenderCache>>;

impl RenderCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    #[must_use]
    pub fn shared(capacity: usize) -> SharedCache {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    /// Get a cached page without changing eviction order
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CachedPage>> {
        self.cache.peek(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a page, evicting the oldest entry when full.
    ///
    /// Returns the key of the evicted entry. Its bitmap is released once the
    /// last renderer drawing from it lets go of its handle.
    pub fn insert(&mut self, key: CacheKey, page: CachedPage) -> Option<CacheKey> {
        match self.cache.push(key, Arc::new(page)) {
            Some((old_key, old)) if old_key != key => {
                debug!(
                    "Evicted cached page {} @ {:.2} ({} bytes)",
                    old_key.page,
                    f64::from(old_key.zoom_hundredths) / 100.0,
                    old.byte_len()
                );
                drop(old);
                Some(old_key)
            }
            _ => None,
        }
    }

    /// Drop every cached bitmap
    pub fn clear(&mut self) {
        if !self.cache.is_empty() {
            debug!("Releasing {} cached pages", self.cache.len());
        }
        self.cache.clear();
    }

    /// Number of cached pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    /// Keys from oldest to newest
    #[must_use]
    pub fn keys(&self) -> Vec<CacheKey> {
        self.cache.iter().rev().map(|(k, _)| *k).collect()
    }
}

/// Lock a shared cache, recovering from poisoning
pub fn lock(cache: &SharedCache) -> std::sync::MutexGuard<'_, RenderCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}
