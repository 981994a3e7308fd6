//! Sitemap population layer: listeners append URLs to a populate event
//! travelling over the application's event bus; the result renders to a
//! sitemap-protocol `<urlset>` document.

pub mod event;
pub mod render;
pub mod url;

pub use event::{
    SitemapGenerator, SitemapListener, SitemapPopulateEvent, UrlHelper, DEFAULT_SECTION,
};
pub use render::render_xml;
pub use url::{ChangeFrequency, SitemapUrl};

use appkit::UrlError;

#[derive(Debug, thiserror::Error)]
pub enum SitemapError {
    #[error(transparent)]
    Url(#[from] UrlError),

    #[error("failed to render sitemap XML: {0}")]
    Render(String),
}
