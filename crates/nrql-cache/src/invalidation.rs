//! Cache invalidation support
//!
//! Lets callers drop cached results when the data behind them changes,
//! without depending on the concrete cache type.

use crate::cache::ResultCache;
use crate::size::EstimateSize;
use tracing::info;

/// Components whose cached results can be invalidated
pub trait CacheInvalidator: Send + Sync {
    /// Invalidate a single key. Returns whether it was cached.
    fn invalidate(&self, key: &str) -> bool;

    /// Invalidate every key starting with `prefix`. Returns how many were removed.
    fn invalidate_prefix(&self, prefix: &str) -> usize;

    /// Invalidate everything
    fn invalidate_all(&self);
}

impl<V> CacheInvalidator for ResultCache<V>
where
    V: EstimateSize + Send + Sync + 'static,
{
    fn invalidate(&self, key: &str) -> bool {
        self.delete(key)
    }

    fn invalidate_prefix(&self, prefix: &str) -> usize {
        let removed = self.delete_prefix(prefix);
        if removed > 0 {
            info!("Invalidated {} cache entries under {}", removed, prefix);
        }
        removed
    }

    fn invalidate_all(&self) {
        self.clear();
        info!("Invalidated all cache entries");
    }
}
