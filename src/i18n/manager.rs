//! Load-then-add orchestration.

use futures::future::try_join_all;
use std::sync::Arc;

use super::cache::{CacheKey, ResourceCache, ResourceLoadRequest};
use super::loader::LoaderRegistry;
use super::resource::TranslationResource;
use super::runtime::{add_resource, AddResourceRequest, I18nRuntime, MergeMode};
use crate::config::I18nConfig;
use crate::errors::I18nResult;
use crate::observability::MetricsCollector;

/// Input of [`ResourceManager::load_and_add_resource`].
pub struct LoadAndAddRequest {
    /// Runtime the loaded resource is added to.
    pub runtime: Arc<dyn I18nRuntime>,
    /// Namespace to load.
    pub namespace: String,
    /// Language to load.
    pub language: String,
    /// Merge into the existing bundle instead of replacing it.
    pub merge: bool,
    /// With `merge`, merge nested objects recursively.
    pub deep: bool,
}

impl LoadAndAddRequest {
    /// Creates a request that replaces the existing bundle.
    pub fn new(
        runtime: Arc<dyn I18nRuntime>,
        namespace: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            namespace: namespace.into(),
            language: language.into(),
            merge: false,
            deep: false,
        }
    }

    /// Sets the merge flags.
    pub fn merge(mut self, merge: bool, deep: bool) -> Self {
        self.merge = merge;
        self.deep = deep;
        self
    }
}

impl std::fmt::Debug for LoadAndAddRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadAndAddRequest")
            .field("namespace", &self.namespace)
            .field("language", &self.language)
            .field("merge", &self.merge)
            .field("deep", &self.deep)
            .finish_non_exhaustive()
    }
}

/// Loads namespaces through the per-domain loaders and adds them to a
/// runtime.
///
/// The cache memoizes raw loaded bundles; the runtime only changes through
/// [`load_and_add_resource`](Self::load_and_add_resource) and
/// [`load_namespaces`](Self::load_namespaces).
#[derive(Debug, Clone)]
pub struct ResourceManager {
    registry: Arc<LoaderRegistry>,
    cache: ResourceCache,
}

impl ResourceManager {
    /// Creates a manager with a fresh cache configured from `config`.
    pub fn new(registry: Arc<LoaderRegistry>, config: &I18nConfig) -> Self {
        Self::with_cache(registry, ResourceCache::new(config.failure_policy))
    }

    /// Creates a manager whose cache reports to `metrics`.
    pub fn with_metrics(
        registry: Arc<LoaderRegistry>,
        config: &I18nConfig,
        metrics: Arc<dyn MetricsCollector>,
    ) -> Self {
        Self::with_cache(
            registry,
            ResourceCache::with_metrics(config.failure_policy, metrics),
        )
    }

    /// Creates a manager over an existing cache.
    pub fn with_cache(registry: Arc<LoaderRegistry>, cache: ResourceCache) -> Self {
        Self { registry, cache }
    }

    /// Returns the loader registry.
    pub fn registry(&self) -> &Arc<LoaderRegistry> {
        &self.registry
    }

    /// Returns the resource cache.
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Loads (or joins the in-flight load of) one namespace.
    pub async fn load_resource(
        &self,
        namespace: &str,
        language: &str,
    ) -> I18nResult<Arc<TranslationResource>> {
        let loader = self.registry.loader_for(namespace)?;
        self.cache
            .execute_resource_load(ResourceLoadRequest::new(loader, namespace, language))
            .await
    }

    /// Loads one namespace and adds it to the request's runtime.
    ///
    /// Nothing is added when the load fails.
    pub async fn load_and_add_resource(&self, request: LoadAndAddRequest) -> I18nResult<()> {
        let LoadAndAddRequest {
            runtime,
            namespace,
            language,
            merge,
            deep,
        } = request;

        let resource = self.load_resource(&namespace, &language).await?;
        add_resource(
            runtime.as_ref(),
            AddResourceRequest {
                namespace,
                language,
                resource: (*resource).clone(),
                merge,
                deep,
            },
        );
        Ok(())
    }

    /// Loads several namespaces concurrently and replaces their bundles.
    ///
    /// All loads must succeed before anything is added.
    pub async fn load_namespaces(
        &self,
        runtime: &dyn I18nRuntime,
        namespaces: &[&str],
        language: &str,
    ) -> I18nResult<()> {
        let resources = try_join_all(
            namespaces
                .iter()
                .map(|namespace| self.load_resource(namespace, language)),
        )
        .await?;

        for (namespace, resource) in namespaces.iter().zip(resources) {
            runtime.add_resource_bundle(
                language,
                namespace,
                (*resource).clone(),
                MergeMode::Replace,
            );
        }
        Ok(())
    }

    /// Drops one cached load, or all of them.
    pub fn clear_resource_cache(&self, key: Option<&CacheKey>) {
        self.cache.clear_resource_cache(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::I18nError;
    use crate::i18n::{BundledResourceLoader, LoadState, TranslationStore};
    use crate::mocks::MockResourceLoader;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn registry() -> Arc<LoaderRegistry> {
        let registry = LoaderRegistry::new();
        registry.register_domain(
            "shell",
            ["common"],
            Arc::new(
                BundledResourceLoader::new()
                    .with_bundle("en", "common", r#"{"nav": {"home": "Home"}}"#)
                    .with_bundle("fr", "common", r#"{"nav": {"home": "Accueil"}}"#),
            ),
        );
        registry.register_domain(
            "landing",
            ["landing"],
            Arc::new(
                BundledResourceLoader::new()
                    .with_bundle("en", "landing", r#"{"hero": {"title": "Welcome"}}"#),
            ),
        );
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_load_and_add_resource() {
        let manager = ResourceManager::new(registry(), &I18nConfig::default());
        let store = Arc::new(TranslationStore::new());

        manager
            .load_and_add_resource(LoadAndAddRequest::new(store.clone(), "common", "fr"))
            .await
            .unwrap();

        assert_eq!(store.t("fr", "common", "nav.home"), "Accueil");
        assert_eq!(
            manager.cache().state(&CacheKey::new("common", "fr")),
            LoadState::Loaded
        );
    }

    #[tokio::test]
    async fn test_load_and_add_deep_merges_into_existing_bundle() {
        let manager = ResourceManager::new(registry(), &I18nConfig::default());
        let store = Arc::new(TranslationStore::new());
        store.add_resource_bundle(
            "en",
            "common",
            crate::i18n::resource_from_value(json!({"nav": {"about": "About"}})).unwrap(),
            MergeMode::Replace,
        );

        manager
            .load_and_add_resource(
                LoadAndAddRequest::new(store.clone(), "common", "en").merge(true, true),
            )
            .await
            .unwrap();

        let bundle = store.resource_bundle("en", "common").unwrap();
        assert_eq!(
            Value::Object(bundle),
            json!({"nav": {"about": "About", "home": "Home"}})
        );
    }

    #[tokio::test]
    async fn test_unknown_namespace_has_no_loader() {
        let manager = ResourceManager::new(registry(), &I18nConfig::default());
        let store = Arc::new(TranslationStore::new());

        let err = manager
            .load_and_add_resource(LoadAndAddRequest::new(store.clone(), "billing", "en"))
            .await
            .unwrap_err();
        assert!(matches!(err, I18nError::NoLoader { .. }));
        assert!(store.languages().is_empty());
    }

    #[tokio::test]
    async fn test_load_namespaces_across_domains() {
        let manager = ResourceManager::new(registry(), &I18nConfig::default());
        let store = TranslationStore::new();

        manager
            .load_namespaces(&store, &["common", "landing"], "de")
            .await
            .unwrap();

        // "de" has no bundles, so both fall back to English.
        assert_eq!(store.t("de", "landing", "hero.title"), "Welcome");
        assert!(store.has_resource_bundle("de", "common"));
    }

    #[tokio::test]
    async fn test_concurrent_load_and_add_calls_loader_once() {
        let loader = Arc::new(
            MockResourceLoader::new()
                .with_resource("common", "en", json!({"ok": "OK"}))
                .with_latency(Duration::from_millis(20)),
        );
        let registry = LoaderRegistry::new();
        registry.register_domain("shell", ["common"], loader.clone());
        let manager = ResourceManager::new(Arc::new(registry), &I18nConfig::default());
        let store: Arc<dyn I18nRuntime> = Arc::new(TranslationStore::new());

        let (a, b) = tokio::join!(
            manager.load_and_add_resource(LoadAndAddRequest::new(store.clone(), "common", "en")),
            manager.load_and_add_resource(LoadAndAddRequest::new(store.clone(), "common", "en")),
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(loader.call_count(), 1);
        assert!(store.has_resource_bundle("en", "common"));
    }
}
