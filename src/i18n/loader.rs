//! Resource loaders and the per-domain loader registry.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use unic_langid::LanguageIdentifier;

use super::resource::{parse_resource, TranslationResource};
use crate::config::{I18nConfig, DEFAULT_LANGUAGE};
use crate::errors::{I18nError, I18nResult};

/// Loads one namespace's resource for one language.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Loads the resource for `namespace` in `language`.
    async fn load(&self, namespace: &str, language: &str) -> I18nResult<TranslationResource>;
}

/// Adapts a closure `Fn(namespace, language) -> Future` into a loader.
pub struct LoaderFn<F>(F);

/// Wraps a closure as a [`ResourceLoader`].
pub fn loader_fn<F, Fut>(f: F) -> LoaderFn<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = I18nResult<TranslationResource>> + Send + 'static,
{
    LoaderFn(f)
}

#[async_trait]
impl<F, Fut> ResourceLoader for LoaderFn<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = I18nResult<TranslationResource>> + Send + 'static,
{
    async fn load(&self, namespace: &str, language: &str) -> I18nResult<TranslationResource> {
        (self.0)(namespace.to_string(), language.to_string()).await
    }
}

impl<F> std::fmt::Debug for LoaderFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderFn").finish_non_exhaustive()
    }
}

/// Parses a BCP 47 language tag such as `pt-BR` or `zh_Hant_TW`.
pub fn parse_language(value: &str) -> I18nResult<LanguageIdentifier> {
    if value.is_empty() {
        return Err(I18nError::InvalidIdentifier {
            value: value.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    value
        .parse::<LanguageIdentifier>()
        .map_err(|e| I18nError::InvalidIdentifier {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Returns the canonical spelling of a language tag (`PT_br` → `pt-BR`).
///
/// Values that do not parse as a tag are returned unchanged.
pub fn canonical_language(value: &str) -> String {
    value
        .parse::<LanguageIdentifier>()
        .map(|langid| langid.to_string())
        .unwrap_or_else(|_| value.to_string())
}

/// Languages to try, in order, for a requested language.
///
/// Tags are canonicalized and then widened one subtag at a time:
/// `zh-Hant-TW` yields `["zh-Hant-TW", "zh-Hant", "zh", default]`.
/// Duplicates are dropped.
pub fn language_candidates(language: &str, default_language: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(4);
    match language.parse::<LanguageIdentifier>() {
        Ok(langid) => {
            tags.push(langid.to_string());
            if let Some(script) = &langid.script {
                tags.push(format!("{}-{}", langid.language, script));
            }
            tags.push(langid.language.to_string());
        }
        Err(_) => tags.push(language.to_string()),
    }
    tags.push(canonical_language(default_language));

    let mut candidates: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !candidates.contains(&tag) {
            candidates.push(tag);
        }
    }
    candidates
}

/// Checks that a namespace is safe to use as a path segment.
///
/// Accepts ASCII letters, digits, `-` and `_`.
pub fn validate_identifier(value: &str) -> I18nResult<()> {
    if value.is_empty() {
        return Err(I18nError::InvalidIdentifier {
            value: value.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(I18nError::InvalidIdentifier {
            value: value.to_string(),
            reason: format!("unexpected character '{}'", bad),
        });
    }
    Ok(())
}

/// Loader over JSON documents compiled into the binary.
///
/// Unknown languages fall back through [`language_candidates`], ending at
/// the default language.
#[derive(Debug, Clone)]
pub struct BundledResourceLoader {
    bundles: HashMap<String, HashMap<String, String>>,
    default_language: String,
}

impl BundledResourceLoader {
    /// Creates an empty loader falling back to `"en"`.
    pub fn new() -> Self {
        Self::with_default_language(DEFAULT_LANGUAGE)
    }

    /// Creates an empty loader falling back to `default_language`.
    pub fn with_default_language(default_language: impl Into<String>) -> Self {
        Self {
            bundles: HashMap::new(),
            default_language: default_language.into(),
        }
    }

    /// Adds the JSON document for `namespace` in `language`.
    ///
    /// The language is stored under its canonical tag.
    pub fn with_bundle(
        mut self,
        language: impl AsRef<str>,
        namespace: impl Into<String>,
        json: impl Into<String>,
    ) -> Self {
        self.bundles
            .entry(canonical_language(language.as_ref()))
            .or_default()
            .insert(namespace.into(), json.into());
        self
    }

    /// Returns the languages that have at least one bundle.
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.bundles.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }
}

impl Default for BundledResourceLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceLoader for BundledResourceLoader {
    async fn load(&self, namespace: &str, language: &str) -> I18nResult<TranslationResource> {
        for candidate in language_candidates(language, &self.default_language) {
            let raw = self
                .bundles
                .get(&candidate)
                .and_then(|namespaces| namespaces.get(namespace));
            if let Some(raw) = raw {
                if candidate != language {
                    tracing::debug!(namespace, language, fallback = %candidate, "using fallback bundle");
                }
                return parse_resource(raw.as_bytes());
            }
        }
        Err(I18nError::not_found(namespace, language))
    }
}

/// Loader reading `<root>/<language>/<namespace>.json`.
///
/// Applies the same fallback order as [`BundledResourceLoader`].
#[derive(Debug, Clone)]
pub struct DirectoryResourceLoader {
    root: PathBuf,
    default_language: String,
}

impl DirectoryResourceLoader {
    /// Creates a loader rooted at `root` falling back to `"en"`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Creates a loader rooted at `root` falling back to the configured
    /// default language.
    pub fn from_config(root: impl Into<PathBuf>, config: &I18nConfig) -> Self {
        Self::new(root).default_language(config.default_language.clone())
    }

    /// Sets the fallback language.
    pub fn default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    /// Returns the path of one resource file.
    pub fn resource_path(&self, namespace: &str, language: &str) -> PathBuf {
        self.root.join(language).join(format!("{}.json", namespace))
    }
}

#[async_trait]
impl ResourceLoader for DirectoryResourceLoader {
    async fn load(&self, namespace: &str, language: &str) -> I18nResult<TranslationResource> {
        validate_identifier(namespace)?;
        parse_language(language)?;
        validate_identifier(language)?;

        for candidate in language_candidates(language, &self.default_language) {
            let path = self.resource_path(namespace, &candidate);
            match tokio::fs::read(&path).await {
                Ok(bytes) => return parse_resource(&bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(I18nError::Io {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }
        Err(I18nError::not_found(namespace, language))
    }
}

/// Maps namespaces to the loader of the domain that owns them.
///
/// Each feature domain registers its loader together with the namespaces
/// it serves. Re-registering a namespace moves it to the new domain.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: RwLock<HashMap<String, Arc<dyn ResourceLoader>>>,
    owners: RwLock<HashMap<String, String>>,
}

impl LoaderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `loader` for `domain` and claims `namespaces` for it.
    pub fn register_domain<I, S>(&self, domain: impl Into<String>, namespaces: I, loader: Arc<dyn ResourceLoader>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let domain = domain.into();
        self.loaders.write().insert(domain.clone(), loader);

        let mut owners = self.owners.write();
        for namespace in namespaces {
            let namespace = namespace.into();
            if let Some(previous) = owners.insert(namespace.clone(), domain.clone()) {
                if previous != domain {
                    tracing::warn!(%namespace, %previous, %domain, "namespace re-registered");
                }
            }
        }
    }

    /// Returns the domain owning `namespace`.
    pub fn domain_of(&self, namespace: &str) -> Option<String> {
        self.owners.read().get(namespace).cloned()
    }

    /// Returns the loader serving `namespace`.
    pub fn loader_for(&self, namespace: &str) -> I18nResult<Arc<dyn ResourceLoader>> {
        let domain = self
            .domain_of(namespace)
            .ok_or_else(|| I18nError::NoLoader {
                namespace: namespace.to_string(),
            })?;
        self.loaders
            .read()
            .get(&domain)
            .cloned()
            .ok_or_else(|| I18nError::NoLoader {
                namespace: namespace.to_string(),
            })
    }

    /// Returns every registered namespace, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.owners.read().keys().cloned().collect();
        namespaces.sort_unstable();
        namespaces
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
