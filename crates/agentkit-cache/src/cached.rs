//! The caching decorator.
//!
//! `cached` wraps a tool's execute step: a fresh stored result for the same
//! key is returned without running the tool. Argument validation and the
//! approval gate still run on every call because they sit outside execute.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use agentkit_contracts::{agent::RunContext, error::ToolkitResult};
use agentkit_core::{Tool, ToolSet};

use crate::{
    key::default_key,
    store::{CacheEntry, CacheStore, LruStore},
};

/// Default time-to-live for a stored result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default entry bound for the built-in LRU store.
pub const DEFAULT_MAX_SIZE: usize = 1000;

type KeyFn = dyn Fn(&Value, Option<&str>) -> String + Send + Sync;
type ScopeFn = dyn Fn(&RunContext) -> Option<String> + Send + Sync;
type ShouldCacheFn = dyn Fn(&Value, &Value) -> bool + Send + Sync;
type KeyCallback = dyn Fn(&str) + Send + Sync;

/// How a tool's results are cached.
#[derive(Clone)]
pub struct CacheOptions {
    ttl: Duration,
    max_size: usize,
    store: Option<Arc<dyn CacheStore>>,
    key_fn: Option<Arc<KeyFn>>,
    scope_fn: Option<Arc<ScopeFn>>,
    should_cache: Option<Arc<ShouldCacheFn>>,
    on_hit: Option<Arc<KeyCallback>>,
    on_miss: Option<Arc<KeyCallback>>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_size: DEFAULT_MAX_SIZE,
            store: None,
            key_fn: None,
            scope_fn: None,
            should_cache: None,
            on_hit: None,
            on_miss: None,
        }
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Entry bound for the built-in store. Ignored when a custom store is set.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Use `store` instead of a private `LruStore`.
    ///
    /// The same store may back several tools; their keys then share one
    /// namespace.
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the default key derivation. The closure receives the call
    /// arguments and the scope returned by `scope_fn`, if any.
    pub fn key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, Option<&str>) -> String + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(f));
        self
    }

    /// Partition the cache per context, e.g. per user.
    pub fn scope_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunContext) -> Option<String> + Send + Sync + 'static,
    {
        self.scope_fn = Some(Arc::new(f));
        self
    }

    /// Decide per call whether a fresh result is stored.
    pub fn should_cache<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.should_cache = Some(Arc::new(f));
        self
    }

    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_hit = Some(Arc::new(f));
        self
    }

    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_miss = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("ttl", &self.ttl)
            .field("max_size", &self.max_size)
            .field("custom_store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

/// Hit/miss counters and occupancy for one cached tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 before the first call.
    pub hit_rate: f64,
    pub size: usize,
    pub max_size: usize,
}

struct CacheState {
    tool: String,
    store: Arc<dyn CacheStore>,
    options: CacheOptions,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheState {
    fn key_for(&self, params: &Value, ctx: &RunContext) -> String {
        let scope = self.options.scope_fn.as_ref().and_then(|f| f(ctx));
        match &self.options.key_fn {
            Some(key_fn) => key_fn(params, scope.as_deref()),
            None => default_key(params, scope.as_deref()),
        }
    }

    /// The stored result for `key` if it is still fresh. Stale entries are
    /// deleted.
    async fn lookup(&self, key: &str) -> ToolkitResult<Option<Value>> {
        match self.store.get(key).await? {
            Some(entry) if entry.is_fresh(self.options.ttl) => Ok(Some(entry.result)),
            Some(_) => {
                self.store.delete(key).await?;
                debug!(tool = %self.tool, key, "expired cache entry removed");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn should_cache(&self, params: &Value, result: &Value) -> bool {
        self.options
            .should_cache
            .as_ref()
            .map_or(true, |f| f(params, result))
    }
}

/// Accessor for a cached tool's statistics and stored entries.
#[derive(Clone)]
pub struct CacheHandle {
    state: Arc<CacheState>,
}

impl CacheHandle {
    pub async fn stats(&self) -> ToolkitResult<CacheStats> {
        let hits = self.state.hits.load(Ordering::Relaxed);
        let misses = self.state.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        Ok(CacheStats {
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            size: self.state.store.len().await?,
            max_size: self.state.options.max_size,
        })
    }

    /// Remove one entry, or every entry when `key` is `None`.
    pub async fn clear(&self, key: Option<&str>) -> ToolkitResult<()> {
        match key {
            Some(key) => {
                self.state.store.delete(key).await?;
            }
            None => self.state.store.clear().await?,
        }
        Ok(())
    }

    /// Whether a call with `params` under `ctx` would be served from cache.
    pub async fn is_cached(&self, params: &Value, ctx: &RunContext) -> ToolkitResult<bool> {
        let key = self.state.key_for(params, ctx);
        Ok(self.state.lookup(&key).await?.is_some())
    }

    pub fn cache_key(&self, params: &Value, ctx: &RunContext) -> String {
        self.state.key_for(params, ctx)
    }
}

impl fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHandle")
            .field("tool", &self.state.tool)
            .finish_non_exhaustive()
    }
}

/// Wrap `tool` so repeated calls with equal arguments reuse a stored result.
///
/// Returns the wrapped tool (same name, schema, and gating) and a handle to
/// its cache. Fails with `Config` when no custom store is given and
/// `max_size` is 0.
pub fn cached(tool: &Tool, options: CacheOptions) -> ToolkitResult<(Tool, CacheHandle)> {
    let store: Arc<dyn CacheStore> = match &options.store {
        Some(store) => Arc::clone(store),
        None => Arc::new(LruStore::new(options.max_size, options.ttl)?),
    };
    let state = Arc::new(CacheState {
        tool: tool.name().to_string(),
        store,
        options,
        hits: AtomicU64::new(0),
        misses: AtomicU64::new(0),
    });

    let decorator_state = Arc::clone(&state);
    let wrapped = tool.decorate(move |inner, input, ctx, meta| {
        let state = Arc::clone(&decorator_state);
        async move {
            let key = state.key_for(&input, &ctx);

            if let Some(result) = state.lookup(&key).await? {
                state.hits.fetch_add(1, Ordering::Relaxed);
                debug!(tool = %state.tool, key = %key, "cache hit");
                if let Some(on_hit) = &state.options.on_hit {
                    on_hit(&key);
                }
                return Ok(result);
            }

            state.misses.fetch_add(1, Ordering::Relaxed);
            debug!(tool = %state.tool, key = %key, "cache miss");
            if let Some(on_miss) = &state.options.on_miss {
                on_miss(&key);
            }

            let result = inner.call(input.clone(), ctx, meta).await?;
            if state.should_cache(&input, &result) {
                state
                    .store
                    .set(CacheEntry::new(key, result.clone()))
                    .await?;
            }
            Ok(result)
        }
    });

    Ok((wrapped, CacheHandle { state }))
}

/// Apply `cached` with the same options to every tool in `tools`.
pub fn cache_tools(
    tools: ToolSet,
    options: &CacheOptions,
) -> ToolkitResult<(ToolSet, BTreeMap<String, CacheHandle>)> {
    let mut wrapped = ToolSet::new();
    let mut handles = BTreeMap::new();
    for tool in tools.iter() {
        let (tool, handle) = cached(tool, options.clone())?;
        handles.insert(tool.name().to_string(), handle);
        wrapped.insert(tool)?;
    }
    Ok((wrapped, handles))
}
