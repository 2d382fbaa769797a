//! Cache access strategies.

use std::fmt;

/// How a cached read treats the cache and the datastore.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Cache only. A miss returns nothing and never touches the datastore.
    Fresh,
    /// Read-through: serve from cache, on miss load from the datastore and
    /// populate the cache.
    #[default]
    Refresh,
    /// Delete the cached entry, then behave like a miss under `Refresh`.
    Invalidate,
    /// Always load from the datastore; the cache is still populated.
    Bypass,
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheStrategy::Fresh => "Fresh",
            CacheStrategy::Refresh => "Refresh",
            CacheStrategy::Invalidate => "Invalidate",
            CacheStrategy::Bypass => "Bypass",
        };
        f.write_str(name)
    }
}
