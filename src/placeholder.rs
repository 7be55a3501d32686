//! Placeholder Resolver - Single Pass, Field Level
//!
//! `{{dotted.key}}` tokens are replaced inside string fields only. The
//! document is never flattened to text, so bound values cannot break its
//! structure, and replaced text is never rescanned.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::canvas::CanvasDocument;
use crate::selection::TemplateStore;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_.]+)\}\}").expect("valid placeholder regex"));
static KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.]+$").expect("valid binding key regex"));

#[derive(Debug, Error)]
pub enum PlaceholderError {
    #[error("Invalid binding key `{0}`: expected letters, digits, `.` or `_`")]
    InvalidKey(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(Uuid),
}

/// Placeholder key to replacement text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, String>);

impl<'de> Deserialize<'de> for Bindings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = BTreeMap::<String, String>::deserialize(deserializer)?;
        Bindings::from_pairs(pairs).map_err(de::Error::custom)
    }
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to the string form of `value`, replacing any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> Result<(), PlaceholderError> {
        let key = key.into();
        if !KEY_RE.is_match(&key) {
            return Err(PlaceholderError::InvalidKey(key));
        }
        self.0.insert(key, value.to_string());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self, PlaceholderError>
    where
        K: Into<String>,
        V: ToString,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut bindings = Self::new();
        for (key, value) in pairs {
            bindings.insert(key, value)?;
        }
        Ok(bindings)
    }
}

/// Keys referenced by placeholders in `text`, in order of appearance.
pub fn placeholder_keys(text: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Substitutes bound placeholders in one string. Unbound tokens stay literal.
pub fn substitute(text: &str, bindings: &Bindings) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures| match bindings.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Returns a copy of `document` with every bound placeholder replaced.
///
/// Object count, order, kinds and geometry are untouched; only string
/// content changes.
pub fn resolve(document: &CanvasDocument, bindings: &Bindings) -> CanvasDocument {
    let mut resolved = document.clone();
    let mut replaced = 0usize;
    resolved.for_each_string_mut(&mut |s| {
        if PLACEHOLDER_RE.is_match(s) {
            let next = substitute(s, bindings);
            if next != *s {
                replaced += 1;
                *s = next;
            }
        }
    });
    log::debug!(
        "event=placeholders_resolved fields_changed={} bindings={}",
        replaced,
        bindings.len()
    );
    resolved
}

/// Placeholder keys in `document` that `bindings` does not cover.
pub fn unresolved(document: &CanvasDocument, bindings: &Bindings) -> Vec<String> {
    document
        .placeholders()
        .into_iter()
        .filter(|key| !bindings.contains_key(key))
        .collect()
}

/// Looks up a template by id and resolves its canvas with `bindings`.
pub fn inject_template(
    store: &dyn TemplateStore,
    template_id: Uuid,
    bindings: &Bindings,
) -> Result<CanvasDocument, PlaceholderError> {
    let template = store
        .find_by_id(template_id)
        .ok_or(PlaceholderError::TemplateNotFound(template_id))?;
    Ok(resolve(&template.canvas_json, bindings))
}
