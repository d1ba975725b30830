//! Coalescing cache of in-flight and settled resource loads.
//!
//! The cache stores the load *future*, not its result: every caller asking
//! for a key while the load is running awaits the same future, so a burst
//! of requests for one namespace/language triggers a single loader call.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::loader::ResourceLoader;
use super::resource::TranslationResource;
use crate::config::FailurePolicy;
use crate::errors::I18nResult;
use crate::observability::MetricsCollector;

/// Cache key for one namespace in one language.
///
/// A struct key cannot collide the way a joined `"ns:lang"` string could;
/// the string form is used for display only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Namespace.
    pub namespace: String,
    /// Language code.
    pub language: String,
}

impl CacheKey {
    /// Creates a key.
    pub fn new(namespace: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            language: language.into(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.language)
    }
}

/// A shared, cloneable handle on one resource load.
///
/// Awaiting any clone yields the same result.
pub type ResourceLoad = Shared<BoxFuture<'static, I18nResult<Arc<TranslationResource>>>>;

/// Lifecycle of one cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No entry.
    Unloaded,
    /// Entry present, load not settled.
    Loading,
    /// Entry present, load succeeded.
    Loaded,
    /// Entry present, load failed (only kept under [`FailurePolicy::Retain`]).
    Failed,
}

/// Input of [`ResourceCache::execute_resource_load`].
pub struct ResourceLoadRequest {
    /// Loader invoked on a cache miss.
    pub loader: Arc<dyn ResourceLoader>,
    /// Namespace handed to the loader.
    pub namespace: String,
    /// Language handed to the loader.
    pub language: String,
    /// Key the load is cached under.
    pub cache_key: CacheKey,
}

impl ResourceLoadRequest {
    /// Creates a request keyed by its own namespace and language.
    pub fn new(
        loader: Arc<dyn ResourceLoader>,
        namespace: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        let namespace = namespace.into();
        let language = language.into();
        Self {
            cache_key: CacheKey::new(namespace.clone(), language.clone()),
            loader,
            namespace,
            language,
        }
    }
}

impl std::fmt::Debug for ResourceLoadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoadRequest")
            .field("namespace", &self.namespace)
            .field("language", &self.language)
            .field("cache_key", &self.cache_key)
            .finish_non_exhaustive()
    }
}

struct CacheEntry {
    load: ResourceLoad,
    generation: u64,
}

struct CacheInner {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    next_generation: AtomicU64,
    policy: FailurePolicy,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

impl CacheInner {
    fn evict_failed(&self, key: &CacheKey, generation: u64) {
        let mut entries = self.entries.lock();
        // A clear-and-reload may already have replaced the entry.
        if entries.get(key).map(|e| e.generation) == Some(generation) {
            entries.remove(key);
            tracing::debug!(%key, "evicted failed resource load");
        }
    }
}

/// Process-wide memo of resource loads keyed by [`CacheKey`].
///
/// Cloning is cheap and clones share the same entries.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<CacheInner>,
}

impl ResourceCache {
    /// Creates an empty cache with the given failure policy.
    pub fn new(policy: FailurePolicy) -> Self {
        Self::build(policy, None)
    }

    /// Creates an empty cache that reports hits and misses to `metrics`.
    pub fn with_metrics(policy: FailurePolicy, metrics: Arc<dyn MetricsCollector>) -> Self {
        Self::build(policy, Some(metrics))
    }

    fn build(policy: FailurePolicy, metrics: Option<Arc<dyn MetricsCollector>>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                policy,
                metrics,
            }),
        }
    }

    /// Returns the failure policy.
    pub fn policy(&self) -> FailurePolicy {
        self.inner.policy
    }

    /// Returns the load for `request.cache_key`, starting it on a miss.
    ///
    /// The entry is inserted before anyone awaits it, under the same lock
    /// as the lookup, so concurrent callers for one key always share a
    /// single loader call.
    pub fn execute_resource_load(&self, request: ResourceLoadRequest) -> ResourceLoad {
        let mut entries = self.inner.entries.lock();

        if let Some(entry) = entries.get(&request.cache_key) {
            tracing::trace!(key = %request.cache_key, "resource cache hit");
            if let Some(metrics) = &self.inner.metrics {
                metrics.record_cache_hit();
            }
            return entry.load.clone();
        }

        if let Some(metrics) = &self.inner.metrics {
            metrics.record_cache_miss();
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let key = request.cache_key.clone();
        let load = self.start_load(request, generation);
        entries.insert(
            key,
            CacheEntry {
                load: load.clone(),
                generation,
            },
        );
        load
    }

    fn start_load(&self, request: ResourceLoadRequest, generation: u64) -> ResourceLoad {
        let ResourceLoadRequest {
            loader,
            namespace,
            language,
            cache_key,
        } = request;
        let evict_on_failure = self.inner.policy == FailurePolicy::Evict;
        // Weak: the future is stored inside the cache it points back to.
        let cache: Weak<CacheInner> = Arc::downgrade(&self.inner);

        async move {
            tracing::debug!(key = %cache_key, "loading translation resource");
            let result = loader.load(&namespace, &language).await.map(Arc::new);

            if let Err(err) = &result {
                tracing::warn!(key = %cache_key, error = %err, "translation resource load failed");
                if evict_on_failure {
                    if let Some(cache) = cache.upgrade() {
                        cache.evict_failed(&cache_key, generation);
                    }
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Returns the lifecycle state of `key`.
    pub fn state(&self, key: &CacheKey) -> LoadState {
        let entries = self.inner.entries.lock();
        match entries.get(key).map(|entry| entry.load.peek()) {
            None => LoadState::Unloaded,
            Some(None) => LoadState::Loading,
            Some(Some(Ok(_))) => LoadState::Loaded,
            Some(Some(Err(_))) => LoadState::Failed,
        }
    }

    /// Drops the entry for `key`, or every entry when `key` is `None`.
    ///
    /// Callers already awaiting a dropped load still receive its result.
    pub fn clear_resource_cache(&self, key: Option<&CacheKey>) {
        let mut entries = self.inner.entries.lock();
        match key {
            Some(key) => {
                entries.remove(key);
            }
            None => entries.clear(),
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached keys, sorted.
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.inner.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(FailurePolicy::default())
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("policy", &self.inner.policy)
            .field("entries", &self.len())
            .finish()
    }
}
