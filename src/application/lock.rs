//! In-memory caches that survive a panicking holder.
//!
//! The series document snapshot and the parsed font table are both rebuilt
//! from disk on demand, so a value left behind by a panic is still usable.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use metrics::counter;
use tracing::warn;

pub(crate) struct CacheCell<T> {
    cache: &'static str,
    inner: RwLock<T>,
}

impl<T> CacheCell<T> {
    pub(crate) fn new(cache: &'static str, value: T) -> Self {
        Self {
            cache,
            inner: RwLock::new(value),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read().unwrap_or_else(|poisoned| {
            self.recovered("read");
            poisoned.into_inner()
        })
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write().unwrap_or_else(|poisoned| {
            self.recovered("write");
            poisoned.into_inner()
        })
    }

    fn recovered(&self, access: &'static str) {
        counter!("tcm_cache_poison_recovered_total", "cache" => self.cache).increment(1);
        warn!(
            target = "tcm_webui::application::cache",
            cache = self.cache,
            access,
            "{} cache was poisoned by a panic; reusing its last value",
            self.cache
        );
    }
}

impl<T: Default> CacheCell<T> {
    pub(crate) fn empty(cache: &'static str) -> Self {
        Self::new(cache, T::default())
    }
}
