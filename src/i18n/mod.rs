//! Lazy translation loading.
//!
//! Domains register a [`ResourceLoader`] for the namespaces they own in a
//! [`LoaderRegistry`]. The [`ResourceManager`] loads a namespace on demand
//! through the [`ResourceCache`], which coalesces concurrent loads of the
//! same key, and adds the result to an [`I18nRuntime`] with replace,
//! shallow-merge or deep-merge semantics.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use app_shell_core::config::I18nConfig;
//! use app_shell_core::i18n::{
//!     BundledResourceLoader, LoadAndAddRequest, LoaderRegistry, ResourceManager, TranslationStore,
//! };
//!
//! # async fn run() -> Result<(), app_shell_core::I18nError> {
//! let registry = LoaderRegistry::new();
//! registry.register_domain(
//!     "shell",
//!     ["common"],
//!     Arc::new(BundledResourceLoader::new().with_bundle("en", "common", r#"{"hi": "Hello"}"#)),
//! );
//!
//! let manager = ResourceManager::new(Arc::new(registry), &I18nConfig::from_env());
//! let store = Arc::new(TranslationStore::new());
//! manager
//!     .load_and_add_resource(LoadAndAddRequest::new(store.clone(), "common", "fr"))
//!     .await?;
//! assert_eq!(store.t("fr", "common", "hi"), "Hello");
//! # Ok(())
//! # }
//! ```

mod cache;
mod loader;
mod manager;
mod resource;
mod runtime;

pub use cache::{CacheKey, LoadState, ResourceCache, ResourceLoad, ResourceLoadRequest};
pub use loader::{
    canonical_language, language_candidates, loader_fn, parse_language, validate_identifier,
    BundledResourceLoader, DirectoryResourceLoader, LoaderFn, LoaderRegistry, ResourceLoader,
};
pub use manager::{LoadAndAddRequest, ResourceManager};
pub use resource::{
    deep_merge, interpolate, lookup, parse_resource, resource_from_value, shallow_merge,
    TranslationResource,
};
pub use runtime::{add_resource, AddResourceRequest, I18nRuntime, MergeMode, TranslationStore};
