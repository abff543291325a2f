//! # Coercion Walker Cache Module
//!
//! This module provides thread-safe caching of compiled coercion walkers to
//! eliminate per-handler compilation overhead.
//!
//! ## Overview
//!
//! Walkers are expensive to compile: matcher-chain resolution per schema node
//! plus a JSON Schema validator compile. Handlers frequently share schemas
//! (error envelopes, common page shapes), so the cache stores compiled walkers
//! and shares them across handlers using Arc for efficient cloning.
//!
//! ## Cache Key Structure
//!
//! Cache keys are formatted as: `{facet}:{schema_hash}`
//! - `facet`: which part of the exchange the walker applies to
//!   (e.g. "query-params", "response")
//! - `schema_hash`: SHA-256 hash of the schema JSON (first 8 bytes, hex)
//!
//! Matcher chains are not part of the key, so one cache must only ever see
//! one chain per facet kind. The [`Coercion`](crate::middleware::Coercion)
//! factory owns a single input rule and a single output rule, which upholds
//! this; callers feeding a shared cache directly carry the same obligation.
//!
//! ## Thread Safety
//!
//! The cache uses `Arc<RwLock<HashMap>>` for thread-safe concurrent access:
//! - Multiple readers can access the cache simultaneously
//! - Writers acquire exclusive access for insertions
//! - Arc wrapping of walkers enables cheap cloning across threads
//!
//! ## Configuration
//!
//! The cache can be disabled via `COAX_WALKER_CACHE=off`; a disabled cache
//! compiles fresh on every lookup.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::coerce::{BuildError, Facet, MatcherChain, Walker};
use crate::runtime_config::RuntimeConfig;

/// Thread-safe cache for compiled coercion walkers
///
/// Stores walkers keyed by facet and schema content hash. Walkers are wrapped
/// in Arc for efficient sharing across handlers and threads.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use coax::coerce::{Facet, MatcherChain, NoContext};
/// use coax::walker_cache::WalkerCache;
/// use serde_json::json;
///
/// let cache = WalkerCache::new(true);
/// let chain = MatcherChain::params(Arc::new(NoContext));
/// let schema = json!({"type": "object", "properties": {"limit": {"type": "integer"}}});
///
/// let walker = cache.get_or_compile(Facet::QueryParams, &schema, &chain)?;
/// assert_eq!(walker.facet(), Facet::QueryParams);
/// assert_eq!(cache.size(), 1);
/// # Ok::<(), coax::coerce::BuildError>(())
/// ```
#[derive(Clone)]
pub struct WalkerCache {
    /// Internal cache storage: key -> Arc<Walker>
    /// Key format: "{facet}:{schema_hash}"
    cache: Arc<RwLock<HashMap<String, Arc<Walker>>>>,
    /// Whether the cache is enabled (from COAX_WALKER_CACHE env var)
    enabled: bool,
}

impl WalkerCache {
    /// Create a new walker cache
    ///
    /// # Arguments
    ///
    /// * `enabled` - Whether the cache should be active (from RuntimeConfig)
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        debug!(enabled = enabled, "Initializing coercion walker cache");
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            enabled,
        }
    }

    /// Create a cache honoring the `COAX_WALKER_CACHE` setting.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(RuntimeConfig::global().walker_cache)
    }

    /// Whether lookups consult the shared map.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Generate a cache key for a facet/schema pair
    ///
    /// Default `serde_json` maps are sorted, so equal schemas serialize
    /// identically regardless of construction order and hash to the same key.
    fn cache_key(facet: Facet, schema: &Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(schema.to_string().as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .take(8)
            .map(|byte| format!("{byte:02x}"))
            .collect();
        format!("{}:{}", facet, hash)
    }

    /// Get a cached walker or compile and cache a new one
    ///
    /// This is the main entry point for walker access. It first checks the
    /// cache for an existing walker. If not found, it compiles the schema
    /// under `chain` and caches the result.
    ///
    /// # Performance
    ///
    /// - Cache hit: read lock + HashMap lookup
    /// - Cache miss: compilation outside any lock, then a double-checked
    ///   insert under the write lock
    pub fn get_or_compile(
        &self,
        facet: Facet,
        schema: &Value,
        chain: &MatcherChain,
    ) -> Result<Arc<Walker>, BuildError> {
        // If the cache is disabled, compile on-demand without caching
        if !self.enabled {
            return Walker::compile(facet, schema, chain).map(Arc::new);
        }

        let key = Self::cache_key(facet, schema);

        // Fast path: check if the walker is already cached (read lock only)
        {
            let cache = self.cache.read().expect("walker cache lock poisoned");
            if let Some(walker) = cache.get(&key) {
                debug!(facet = %facet, cache_key = %key, "Coercion walker cache hit");
                return Ok(Arc::clone(walker));
            }
        }

        // Slow path: compile, then insert under the write lock
        let walker = Arc::new(Walker::compile(facet, schema, chain)?);
        let mut cache = self.cache.write().expect("walker cache lock poisoned");

        // Double-check pattern: another thread might have compiled while we did
        if let Some(existing) = cache.get(&key) {
            debug!(facet = %facet, cache_key = %key, "Coercion walker compiled by another thread");
            return Ok(Arc::clone(existing));
        }

        cache.insert(key.clone(), Arc::clone(&walker));
        info!(
            facet = %facet,
            cache_key = %key,
            cache_size = cache.len(),
            "Coercion walker compiled and cached"
        );
        Ok(walker)
    }

    /// Get the current cache size (number of cached walkers)
    ///
    /// Useful for monitoring and debugging cache behavior.
    #[must_use]
    pub fn size(&self) -> usize {
        self.cache.read().expect("walker cache lock poisoned").len()
    }

    /// Drop every cached walker
    ///
    /// Primarily useful for tests and for long-lived processes whose handler
    /// set has been rebuilt.
    pub fn clear(&self) {
        let mut cache = self.cache.write().expect("walker cache lock poisoned");
        let dropped = cache.len();
        cache.clear();
        info!(dropped = dropped, "Coercion walker cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::NoContext;
    use serde_json::json;

    fn chain() -> MatcherChain {
        MatcherChain::params(Arc::new(NoContext))
    }

    #[test]
    fn test_cache_enabled() {
        let cache = WalkerCache::new(true);
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"}
            }
        });

        // First access should compile
        let walker1 = cache
            .get_or_compile(Facet::Body, &schema, &chain())
            .unwrap();
        assert_eq!(cache.size(), 1);

        // Second access should use the cache
        let walker2 = cache
            .get_or_compile(Facet::Body, &schema, &chain())
            .unwrap();
        assert_eq!(cache.size(), 1);

        // Walkers should be the same Arc (same pointer)
        assert!(Arc::ptr_eq(&walker1, &walker2));
    }

    #[test]
    fn test_cache_disabled() {
        let cache = WalkerCache::new(false);
        let schema = json!({"type": "object"});

        let walker1 = cache
            .get_or_compile(Facet::Body, &schema, &chain())
            .unwrap();
        assert_eq!(cache.size(), 0); // Cache should remain empty

        let walker2 = cache
            .get_or_compile(Facet::Body, &schema, &chain())
            .unwrap();
        assert_eq!(cache.size(), 0);

        // Walkers should be different Arc instances
        assert!(!Arc::ptr_eq(&walker1, &walker2));
    }

    #[test]
    fn test_same_schema_different_facets() {
        let cache = WalkerCache::new(true);
        let schema = json!({"type": "object"});

        cache
            .get_or_compile(Facet::QueryParams, &schema, &chain())
            .unwrap();
        cache
            .get_or_compile(Facet::Body, &schema, &chain())
            .unwrap();
        cache
            .get_or_compile(Facet::Response, &schema, &chain())
            .unwrap();

        assert_eq!(cache.size(), 3);
    }

    #[test]
    fn test_cache_key_ignores_construction_order() {
        let a = json!({"type": "object", "properties": {"x": {"type": "integer"}}});
        // Same schema with keys written in a different order.
        let b = json!({"properties": {"x": {"type": "integer"}}, "type": "object"});
        assert_eq!(
            WalkerCache::cache_key(Facet::Body, &a),
            WalkerCache::cache_key(Facet::Body, &b)
        );
        assert_ne!(
            WalkerCache::cache_key(Facet::Body, &a),
            WalkerCache::cache_key(Facet::Response, &a)
        );
    }

    #[test]
    fn test_cache_key_format() {
        let key = WalkerCache::cache_key(Facet::QueryParams, &json!({"type": "object"}));
        let (facet, hash) = key.split_once(':').unwrap();
        assert_eq!(facet, "query-params");
        assert_eq!(hash.len(), 16);
        assert!(
            hash.chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
            "hash should be lowercase hex: {hash}"
        );
    }

    #[test]
    fn test_invalid_schema_not_cached() {
        let cache = WalkerCache::new(true);
        let invalid_schema = json!({"type": "invalid_type"});

        let result = cache.get_or_compile(Facet::Body, &invalid_schema, &chain());
        assert!(result.is_err());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_cache_clear() {
        let cache = WalkerCache::new(true);

        cache
            .get_or_compile(Facet::Body, &json!({"type": "object"}), &chain())
            .unwrap();
        cache
            .get_or_compile(Facet::Body, &json!({"type": "array"}), &chain())
            .unwrap();
        assert_eq!(cache.size(), 2);

        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = WalkerCache::new(true);
        let clone = cache.clone();

        cache
            .get_or_compile(Facet::Body, &json!({"type": "object"}), &chain())
            .unwrap();
        assert_eq!(clone.size(), 1);
    }
}
