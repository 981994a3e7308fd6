//! Sitemap population: event, listener trait and the URL helper base.
//!
//! The application dispatches one [`SitemapPopulateEvent`] through the
//! event bus; every registered [`SitemapListener`] appends its URLs to the
//! event's generator. Listeners are expected to embed a [`UrlHelper`] and
//! go through [`UrlHelper::add_url`]/[`add_url_with`](UrlHelper::add_url_with),
//! which route URL generation through the application's [`UrlGenerator`]
//! and honor the event's section filter.

use std::sync::Arc;

use appkit::UrlGenerator;
use appkit_db::DbHandle;
use chrono::{DateTime, Utc};

use crate::url::{ChangeFrequency, SitemapUrl};
use crate::SitemapError;

pub const DEFAULT_SECTION: &str = "default";

/// URLs grouped by section, in insertion order.
#[derive(Debug, Default)]
pub struct SitemapGenerator {
    sections: Vec<(String, Vec<SitemapUrl>)>,
}

impl SitemapGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_url(&mut self, url: SitemapUrl, section: &str) {
        if let Some((_, urls)) = self.sections.iter_mut().find(|(name, _)| name == section) {
            urls.push(url);
        } else {
            self.sections.push((section.to_owned(), vec![url]));
        }
    }

    #[must_use]
    pub fn urls(&self, section: &str) -> &[SitemapUrl] {
        self.sections
            .iter()
            .find(|(name, _)| name == section)
            .map_or(&[], |(_, urls)| urls.as_slice())
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &[SitemapUrl])> {
        self.sections
            .iter()
            .map(|(name, urls)| (name.as_str(), urls.as_slice()))
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.sections.iter().map(|(_, urls)| urls.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Event carried through the bus while the sitemap is being populated.
#[derive(Debug, Default)]
pub struct SitemapPopulateEvent {
    generator: SitemapGenerator,
    section: Option<String>,
}

impl SitemapPopulateEvent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict population to one section (partial regeneration).
    #[must_use]
    pub fn for_section(section: impl Into<String>) -> Self {
        Self {
            generator: SitemapGenerator::new(),
            section: Some(section.into()),
        }
    }

    #[must_use]
    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    /// Whether URLs of `section` should be generated for this event.
    #[must_use]
    pub fn wants_section(&self, section: &str) -> bool {
        self.section.as_deref().is_none_or(|s| s == section)
    }

    #[must_use]
    pub fn generator(&self) -> &SitemapGenerator {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut SitemapGenerator {
        &mut self.generator
    }

    #[must_use]
    pub fn into_generator(self) -> SitemapGenerator {
        self.generator
    }
}

/// Implemented by anything contributing URLs to the sitemap.
pub trait SitemapListener: Send + Sync {
    fn populate(&self, event: &mut SitemapPopulateEvent);
}

/// Base for concrete listeners: routes URL generation through the
/// application's [`UrlGenerator`], with optional database access for
/// entity-driven URL sets.
pub struct UrlHelper {
    urls: Arc<UrlGenerator>,
    db: Option<Arc<DbHandle>>,
}

impl UrlHelper {
    #[must_use]
    pub fn new(urls: Arc<UrlGenerator>) -> Self {
        Self { urls, db: None }
    }

    #[must_use]
    pub fn with_db(mut self, db: Arc<DbHandle>) -> Self {
        self.db = Some(db);
        self
    }

    #[must_use]
    pub fn db(&self) -> Option<&Arc<DbHandle>> {
        self.db.as_ref()
    }

    /// Append the absolute URL of a named route to the event with default
    /// entry options (weekly, priority 1.0, no lastmod).
    ///
    /// # Errors
    /// Fails on unknown routes or missing route parameters.
    pub fn add_url(
        &self,
        event: &mut SitemapPopulateEvent,
        route: &str,
        section: &str,
        params: &[(&str, &str)],
    ) -> Result<(), SitemapError> {
        self.add_url_with(event, route, section, params, 1.0, None, ChangeFrequency::Weekly)
    }

    /// Append the absolute URL of a named route with explicit entry options.
    /// Sections filtered out by the event are skipped silently.
    ///
    /// # Errors
    /// Fails on unknown routes or missing route parameters.
    pub fn add_url_with(
        &self,
        event: &mut SitemapPopulateEvent,
        route: &str,
        section: &str,
        params: &[(&str, &str)],
        priority: f32,
        lastmod: Option<DateTime<Utc>>,
        changefreq: ChangeFrequency,
    ) -> Result<(), SitemapError> {
        if !event.wants_section(section) {
            return Ok(());
        }

        let loc = self.urls.generate_absolute(route, params)?;
        let mut url = SitemapUrl::new(loc)
            .priority(priority)
            .changefreq(changefreq);
        if let Some(lastmod) = lastmod {
            url = url.lastmod(lastmod);
        }
        event.generator_mut().add_url(url, section);
        Ok(())
    }
}
