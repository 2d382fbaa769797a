//! Cache key construction.

/// Key under which the full listing collection is stored.
pub const ALL_LISTINGS_KEY: &str = "all_properties";

/// Builds backend keys in the `"{prefix}:{version}:{key}"` layout used by
/// the web framework whose cache this crate shares, so that keys written
/// here and there coincide.
///
/// ```
/// use property_cache::key::CacheKeyBuilder;
///
/// let keys = CacheKeyBuilder::default();
/// assert_eq!(keys.build("all_properties"), ":1:all_properties");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheKeyBuilder {
    prefix: String,
    version: u32,
}

impl Default for CacheKeyBuilder {
    fn default() -> Self {
        CacheKeyBuilder::new("", 1)
    }
}

impl CacheKeyBuilder {
    pub fn new(prefix: impl Into<String>, version: u32) -> Self {
        CacheKeyBuilder {
            prefix: prefix.into(),
            version,
        }
    }

    /// Build the backend key for `key`.
    pub fn build(&self, key: &str) -> String {
        format!("{}:{}:{}", self.prefix, self.version, key)
    }

    /// Build the backend key for a cached HTTP response.
    ///
    /// Request identity is the method plus the full path and query.
    pub fn page(&self, method: &str, path_and_query: &str) -> String {
        self.build(&format!("page:{}:{}", method, path_and_query))
    }
}
