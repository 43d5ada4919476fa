// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for active listing pages.
//!
//! Browsing re-requests the same first few pages constantly. Pages are cached
//! per `(page, page_size)` for a short TTL and dropped wholesale whenever the
//! client itself changes the set of active listings (create, delete, settle).

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::listings::ListingPage;

/// Default number of cached pages.
pub const DEFAULT_CAPACITY: usize = 16;

/// Default page TTL.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

struct CacheEntry {
    page: ListingPage,
    inserted_at: Instant,
}

pub struct ListingCache {
    cache: Mutex<LruCache<(u32, u32), CacheEntry>>,
    ttl: Duration,
}

impl ListingCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Cached page, or `None` if absent or expired.
    pub fn get(&self, page: u32, page_size: u32) -> Option<ListingPage> {
        let key = (page, page_size);
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.page.clone());
            }
            cache.pop(&key);
        }
        None
    }

    pub fn put(&self, page: u32, page_size: u32, listing_page: ListingPage) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                (page, page_size),
                CacheEntry {
                    page: listing_page,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Drop every cached page.
    pub fn invalidate_all(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}
