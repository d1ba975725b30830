//! Translation resources and merge helpers.

use serde_json::Value;

use crate::errors::{I18nError, I18nResult};

/// One namespace's translations for one language.
///
/// Values are strings or nested objects; nesting depth is unbounded.
pub type TranslationResource = serde_json::Map<String, Value>;

/// Parses a JSON document that must be an object at the top level.
pub fn parse_resource(bytes: &[u8]) -> I18nResult<TranslationResource> {
    resource_from_value(serde_json::from_slice(bytes)?)
}

/// Converts a JSON value into a resource, rejecting non-objects.
pub fn resource_from_value(value: Value) -> I18nResult<TranslationResource> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(I18nError::Parse {
            message: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Merges `source` into `target` recursively.
///
/// Where both sides hold an object under the same key, the objects are
/// merged key by key; otherwise the value from `source` wins.
pub fn deep_merge(target: &mut TranslationResource, source: TranslationResource) {
    for (key, incoming) in source {
        match incoming {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    deep_merge(existing, incoming);
                } else {
                    target.insert(key, Value::Object(incoming));
                }
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}

/// Merges top-level keys of `source` into `target`.
///
/// Nested values are replaced wholesale, never combined.
pub fn shallow_merge(target: &mut TranslationResource, source: TranslationResource) {
    target.extend(source);
}

/// Looks up a dotted key (`"nav.home.title"`) in a resource.
pub fn lookup<'a>(resource: &'a TranslationResource, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let first = segments.next()?;
    segments.try_fold(resource.get(first)?, |value, segment| {
        value.as_object()?.get(segment)
    })
}

/// Replaces `{{name}}` placeholders with the matching argument.
///
/// Placeholders without an argument are left as they are.
pub fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (name, value) in args {
        result = result.replace(&format!("{{{{{}}}}}", name), value);
    }
    result
}
