//! Sitemap URL entries.

use chrono::{DateTime, Utc};

/// `<changefreq>` values from the sitemap protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    #[default]
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeFrequency::Always => "always",
            ChangeFrequency::Hourly => "hourly",
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
            ChangeFrequency::Yearly => "yearly",
            ChangeFrequency::Never => "never",
        }
    }
}

/// One `<url>` entry.
#[derive(Clone, Debug)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
    pub changefreq: ChangeFrequency,
    pub priority: f32,
}

impl SitemapUrl {
    /// Entry with the defaults concrete listeners usually want: weekly
    /// change frequency, priority 1.0, no last-modified stamp.
    #[must_use]
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            lastmod: None,
            changefreq: ChangeFrequency::default(),
            priority: 1.0,
        }
    }

    #[must_use]
    pub fn lastmod(mut self, lastmod: DateTime<Utc>) -> Self {
        self.lastmod = Some(lastmod);
        self
    }

    #[must_use]
    pub fn changefreq(mut self, changefreq: ChangeFrequency) -> Self {
        self.changefreq = changefreq;
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: f32) -> Self {
        self.priority = priority.clamp(0.0, 1.0);
        self
    }
}
