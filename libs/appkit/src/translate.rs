//! Message translation.
//!
//! A translator resolves a message key against per-locale catalogs and
//! substitutes `%name%`-style placeholders. Unknown keys fall back to the
//! default locale's catalog, then to the key itself, so callers never get
//! an error out of a missing translation.

use parking_lot::RwLock;
use std::collections::HashMap;

pub trait Translator: Send + Sync {
    /// Translate `key` for `locale` (default locale when `None`),
    /// substituting `%placeholder%` occurrences from `params`.
    fn trans(&self, key: &str, params: &[(&str, &str)], locale: Option<&str>) -> String;

    fn default_locale(&self) -> &str;
}

type Catalog = HashMap<String, String>;

/// Catalog-backed translator.
pub struct CatalogTranslator {
    catalogs: RwLock<HashMap<String, Catalog>>,
    default_locale: String,
}

impl CatalogTranslator {
    #[must_use]
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            catalogs: RwLock::new(HashMap::new()),
            default_locale: default_locale.into(),
        }
    }

    /// Add or extend the catalog of a locale.
    pub fn add_messages<K, V>(&self, locale: &str, messages: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut w = self.catalogs.write();
        let catalog = w.entry(locale.to_owned()).or_default();
        for (key, value) in messages {
            catalog.insert(key.into(), value.into());
        }
    }

    fn lookup(&self, key: &str, locale: &str) -> Option<String> {
        self.catalogs.read().get(locale)?.get(key).cloned()
    }
}

fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = template.to_owned();
    for (name, value) in params {
        out = out.replace(&format!("%{name}%"), value);
    }
    out
}

impl Translator for CatalogTranslator {
    fn trans(&self, key: &str, params: &[(&str, &str)], locale: Option<&str>) -> String {
        let locale = locale.unwrap_or(&self.default_locale);
        let template = self
            .lookup(key, locale)
            .or_else(|| self.lookup(key, &self.default_locale))
            .unwrap_or_else(|| key.to_owned());
        substitute(&template, params)
    }

    fn default_locale(&self) -> &str {
        &self.default_locale
    }
}
