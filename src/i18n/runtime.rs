//! Translation runtime port and the in-memory store implementing it.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

use super::loader::{canonical_language, language_candidates};
use super::resource::{deep_merge, interpolate, lookup, shallow_merge, TranslationResource};
use crate::config::{I18nConfig, DEFAULT_LANGUAGE};

/// How an incoming bundle combines with an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// The incoming bundle replaces the existing one.
    #[default]
    Replace,
    /// Top-level keys are merged; nested values are replaced wholesale.
    Shallow,
    /// Nested objects are merged recursively.
    Deep,
}

impl MergeMode {
    /// Maps the `merge` / `deep` flag pair to a mode.
    ///
    /// `deep` is ignored when `merge` is false.
    pub fn from_flags(merge: bool, deep: bool) -> Self {
        match (merge, deep) {
            (false, _) => MergeMode::Replace,
            (true, false) => MergeMode::Shallow,
            (true, true) => MergeMode::Deep,
        }
    }
}

/// The live translation runtime that loaded resources are added to.
pub trait I18nRuntime: Send + Sync {
    /// Adds a bundle for `language` / `namespace`, combining it with any
    /// existing bundle according to `mode`.
    fn add_resource_bundle(
        &self,
        language: &str,
        namespace: &str,
        resource: TranslationResource,
        mode: MergeMode,
    );

    /// Returns a copy of the bundle for `language` / `namespace`.
    fn resource_bundle(&self, language: &str, namespace: &str) -> Option<TranslationResource>;

    /// Returns true if a bundle exists for `language` / `namespace`.
    fn has_resource_bundle(&self, language: &str, namespace: &str) -> bool {
        self.resource_bundle(language, namespace).is_some()
    }

    /// Removes a bundle. Returns true if one was present.
    fn remove_resource_bundle(&self, language: &str, namespace: &str) -> bool;
}

/// Input of [`add_resource`].
#[derive(Debug, Clone, PartialEq)]
pub struct AddResourceRequest {
    /// Namespace of the bundle.
    pub namespace: String,
    /// Language of the bundle.
    pub language: String,
    /// The resource to add.
    pub resource: TranslationResource,
    /// Merge into the existing bundle instead of replacing it.
    pub merge: bool,
    /// With `merge`, merge nested objects recursively.
    pub deep: bool,
}

/// Adds a loaded resource to the runtime.
///
/// `merge = false` replaces the bundle; `merge = true` merges into it,
/// recursively when `deep` is set.
pub fn add_resource(runtime: &dyn I18nRuntime, request: AddResourceRequest) {
    let mode = MergeMode::from_flags(request.merge, request.deep);
    tracing::debug!(
        namespace = %request.namespace,
        language = %request.language,
        ?mode,
        "adding translation resource"
    );
    runtime.add_resource_bundle(&request.language, &request.namespace, request.resource, mode);
}

/// In-memory [`I18nRuntime`] with key lookup.
///
/// Bundles are stored under the canonical language tag, so `pt_br` and
/// `pt-BR` address the same bundle.
#[derive(Debug)]
pub struct TranslationStore {
    bundles: RwLock<HashMap<(String, String), TranslationResource>>,
    fallback_language: String,
}

impl TranslationStore {
    /// Creates an empty store falling back to `"en"`.
    pub fn new() -> Self {
        Self::with_fallback_language(DEFAULT_LANGUAGE)
    }

    /// Creates an empty store falling back to `language`.
    pub fn with_fallback_language(language: impl Into<String>) -> Self {
        Self {
            bundles: RwLock::new(HashMap::new()),
            fallback_language: language.into(),
        }
    }

    /// Creates an empty store falling back to the configured default language.
    pub fn from_config(config: &I18nConfig) -> Self {
        Self::with_fallback_language(config.default_language.clone())
    }

    /// Returns the languages that hold at least one bundle, sorted.
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self
            .bundles
            .read()
            .keys()
            .map(|(language, _)| language.clone())
            .collect();
        languages.sort_unstable();
        languages.dedup();
        languages
    }

    /// Translates `key` (dotted for nested values).
    ///
    /// Falls back to the base language and then the fallback language;
    /// returns `key` itself when no bundle has it.
    pub fn t(&self, language: &str, namespace: &str, key: &str) -> String {
        self.t_with(language, namespace, key, &[])
    }

    /// Translates `key`, replacing `{{name}}` placeholders from `args`.
    pub fn t_with(
        &self,
        language: &str,
        namespace: &str,
        key: &str,
        args: &[(&str, &str)],
    ) -> String {
        let bundles = self.bundles.read();
        for candidate in language_candidates(language, &self.fallback_language) {
            let Some(bundle) = bundles.get(&(candidate, namespace.to_string())) else {
                continue;
            };
            match lookup(bundle, key) {
                Some(Value::String(text)) => return interpolate(text, args),
                Some(value @ (Value::Number(_) | Value::Bool(_))) => return value.to_string(),
                _ => continue,
            }
        }
        key.to_string()
    }
}

impl Default for TranslationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl I18nRuntime for TranslationStore {
    fn add_resource_bundle(
        &self,
        language: &str,
        namespace: &str,
        resource: TranslationResource,
        mode: MergeMode,
    ) {
        let mut bundles = self.bundles.write();
        let slot = (canonical_language(language), namespace.to_string());

        if mode != MergeMode::Replace {
            if let Some(existing) = bundles.get_mut(&slot) {
                match mode {
                    MergeMode::Deep => deep_merge(existing, resource),
                    _ => shallow_merge(existing, resource),
                }
                return;
            }
        }
        bundles.insert(slot, resource);
    }

    fn resource_bundle(&self, language: &str, namespace: &str) -> Option<TranslationResource> {
        self.bundles
            .read()
            .get(&(canonical_language(language), namespace.to_string()))
            .cloned()
    }

    fn remove_resource_bundle(&self, language: &str, namespace: &str) -> bool {
        self.bundles
            .write()
            .remove(&(canonical_language(language), namespace.to_string()))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::resource::resource_from_value;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    fn resource(value: Value) -> TranslationResource {
        resource_from_value(value).unwrap()
    }

    fn add(store: &TranslationStore, value: Value, merge: bool, deep: bool) {
        add_resource(
            store,
            AddResourceRequest {
                namespace: "common".to_string(),
                language: "en".to_string(),
                resource: resource(value),
                merge,
                deep,
            },
        );
    }

    #[test_case(true, true, json!({"a": {"b": 1, "c": 2}}); "deep merge")]
    #[test_case(true, false, json!({"a": {"c": 2}}); "shallow merge")]
    #[test_case(false, true, json!({"a": {"c": 2}}); "replace ignores deep")]
    fn test_add_resource_modes(merge: bool, deep: bool, expected: Value) {
        let store = TranslationStore::new();
        add(&store, json!({"a": {"b": 1}}), false, false);
        add(&store, json!({"a": {"c": 2}}), merge, deep);

        let bundle = store.resource_bundle("en", "common").unwrap();
        assert_eq!(Value::Object(bundle), expected);
    }

    #[test]
    fn test_replace_drops_old_keys() {
        let store = TranslationStore::new();
        add(&store, json!({"old": "x"}), false, false);
        add(&store, json!({"new": "y"}), false, false);
        assert_eq!(
            Value::Object(store.resource_bundle("en", "common").unwrap()),
            json!({"new": "y"})
        );
    }

    #[test]
    fn test_merge_into_missing_bundle_inserts() {
        let store = TranslationStore::new();
        add(&store, json!({"a": 1}), true, true);
        assert!(store.has_resource_bundle("en", "common"));
    }

    #[test]
    fn test_t_lookup_interpolation_and_fallback() {
        let store = TranslationStore::new();
        store.add_resource_bundle(
            "en",
            "common",
            resource(json!({"nav": {"home": "Home"}, "greet": "Hi {{name}}", "count": 3})),
            MergeMode::Replace,
        );
        store.add_resource_bundle(
            "fr",
            "common",
            resource(json!({"nav": {"home": "Accueil"}})),
            MergeMode::Replace,
        );

        assert_eq!(store.t("fr", "common", "nav.home"), "Accueil");
        assert_eq!(store.t("fr-CA", "common", "nav.home"), "Accueil");
        assert_eq!(store.t_with("fr", "common", "greet", &[("name", "Ada")]), "Hi Ada");
        assert_eq!(store.t("en", "common", "count"), "3");
        assert_eq!(store.t("en", "common", "nav"), "nav");
        assert_eq!(store.t("en", "common", "missing.key"), "missing.key");
        assert_eq!(store.t("en", "other", "nav.home"), "nav.home");
    }

    #[test]
    fn test_languages_and_remove() {
        let store = TranslationStore::new();
        store.add_resource_bundle("fr", "a", TranslationResource::new(), MergeMode::Replace);
        store.add_resource_bundle("en", "a", TranslationResource::new(), MergeMode::Replace);
        store.add_resource_bundle("en", "b", TranslationResource::new(), MergeMode::Replace);
        assert_eq!(store.languages(), vec!["en", "fr"]);

        assert!(store.remove_resource_bundle("fr", "a"));
        assert!(!store.remove_resource_bundle("fr", "a"));
        assert_eq!(store.languages(), vec!["en"]);
    }

    #[test]
    fn test_language_tags_are_canonicalized() {
        let store = TranslationStore::new();
        store.add_resource_bundle(
            "PT_br",
            "common",
            resource(json!({"hello": "Olá"})),
            MergeMode::Replace,
        );

        assert!(store.has_resource_bundle("pt-BR", "common"));
        assert_eq!(store.languages(), vec!["pt-BR"]);
        assert_eq!(store.t("pt-br", "common", "hello"), "Olá");
        assert!(store.remove_resource_bundle("PT-BR", "common"));
    }

    #[test]
    fn test_from_config_uses_default_language() {
        let store = TranslationStore::from_config(&I18nConfig::default().default_language("de"));
        store.add_resource_bundle(
            "de",
            "common",
            resource(json!({"ok": "Gut"})),
            MergeMode::Replace,
        );
        assert_eq!(store.t("ja", "common", "ok"), "Gut");
    }

    #[test]
    fn test_merge_mode_from_flags() {
        assert_eq!(MergeMode::from_flags(false, false), MergeMode::Replace);
        assert_eq!(MergeMode::from_flags(true, false), MergeMode::Shallow);
        assert_eq!(MergeMode::from_flags(true, true), MergeMode::Deep);
    }
}
