//! Integration tests for the translation loader

use app_shell_core::config::I18nConfig;
use app_shell_core::i18n::{
    loader_fn, DirectoryResourceLoader, LoadAndAddRequest, LoadState, LoaderRegistry,
    ResourceManager, TranslationResource, TranslationStore,
};
use app_shell_core::{CacheKey, FailurePolicy, I18nError, I18nRuntime};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn write_resource(root: &std::path::Path, language: &str, namespace: &str, value: serde_json::Value) {
    let dir = root.join(language);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join(format!("{}.json", namespace)),
        serde_json::to_vec(&value).unwrap(),
    )
    .unwrap();
}

#[tokio::test]
async fn test_directory_loader_with_fallback() {
    let root = tempfile::tempdir().unwrap();
    write_resource(root.path(), "en", "common", json!({"nav": {"home": "Home", "about": "About"}}));
    write_resource(root.path(), "es", "common", json!({"nav": {"home": "Inicio"}}));

    let registry = LoaderRegistry::new();
    registry.register_domain(
        "shell",
        ["common"],
        Arc::new(DirectoryResourceLoader::new(root.path())),
    );
    let manager = ResourceManager::new(Arc::new(registry), &I18nConfig::default());
    let store = Arc::new(TranslationStore::new());

    manager
        .load_and_add_resource(LoadAndAddRequest::new(store.clone(), "common", "es"))
        .await
        .unwrap();
    manager
        .load_and_add_resource(LoadAndAddRequest::new(store.clone(), "common", "ja"))
        .await
        .unwrap();

    assert_eq!(store.t("es", "common", "nav.home"), "Inicio");
    // "ja" has no file, so the English bundle is loaded under "ja".
    assert_eq!(store.t("ja", "common", "nav.about"), "About");
}

#[tokio::test]
async fn test_directory_loader_rejects_path_segments() {
    let root = tempfile::tempdir().unwrap();
    let registry = LoaderRegistry::new();
    registry.register_domain(
        "shell",
        ["common"],
        Arc::new(DirectoryResourceLoader::new(root.path())),
    );
    let manager = ResourceManager::new(Arc::new(registry), &I18nConfig::default());

    let err = manager.load_resource("common", "../../etc").await.unwrap_err();
    assert!(matches!(err, I18nError::InvalidIdentifier { .. }));
}

#[tokio::test]
async fn test_burst_of_loads_is_coalesced() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let loader = loader_fn(move |_namespace: String, _language: String| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(25)).await;
            let mut resource = TranslationResource::new();
            resource.insert("title".to_string(), json!("Landing"));
            Ok::<_, I18nError>(resource)
        }
    });

    let registry = LoaderRegistry::new();
    registry.register_domain("landing", ["landing"], Arc::new(loader));
    let manager = Arc::new(ResourceManager::new(Arc::new(registry), &I18nConfig::default()));
    let store: Arc<dyn I18nRuntime> = Arc::new(TranslationStore::new());

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let manager = manager.clone();
            let store = store.clone();
            tokio::spawn(async move {
                manager
                    .load_and_add_resource(LoadAndAddRequest::new(store, "landing", "en"))
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.has_resource_bundle("en", "landing"));
}

#[tokio::test]
async fn test_retained_failure_until_cache_cleared() {
    let root = tempfile::tempdir().unwrap();
    let registry = LoaderRegistry::new();
    registry.register_domain(
        "shell",
        ["common"],
        Arc::new(DirectoryResourceLoader::new(root.path())),
    );
    let config = I18nConfig::default().failure_policy(FailurePolicy::Retain);
    let manager = ResourceManager::new(Arc::new(registry), &config);
    let key = CacheKey::new("common", "en");

    assert!(manager.load_resource("common", "en").await.is_err());
    assert_eq!(manager.cache().state(&key), LoadState::Failed);

    // The file appears later; the retained failure hides it until cleared.
    write_resource(root.path(), "en", "common", json!({"ok": "OK"}));
    assert!(manager.load_resource("common", "en").await.is_err());

    manager.clear_resource_cache(Some(&key));
    let resource = manager.load_resource("common", "en").await.unwrap();
    assert_eq!(resource["ok"], "OK");
}

#[tokio::test]
async fn test_configured_default_language_drives_fallback() {
    let root = tempfile::tempdir().unwrap();
    write_resource(root.path(), "de", "common", json!({"save": "Speichern"}));

    let config = I18nConfig::default().default_language("de");
    let registry = LoaderRegistry::new();
    registry.register_domain(
        "shell",
        ["common"],
        Arc::new(DirectoryResourceLoader::from_config(root.path(), &config)),
    );
    let manager = ResourceManager::new(Arc::new(registry), &config);
    let store = Arc::new(TranslationStore::from_config(&config));

    manager
        .load_and_add_resource(LoadAndAddRequest::new(store.clone(), "common", "pt-BR"))
        .await
        .unwrap();
    assert_eq!(store.t("pt-BR", "common", "save"), "Speichern");
}
