//! XML rendering of a populated generator.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::event::SitemapGenerator;
use crate::SitemapError;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Render every section of the generator into one `<urlset>` document.
///
/// # Errors
/// Fails when XML serialization fails.
pub fn render_xml(generator: &SitemapGenerator) -> Result<String, SitemapError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let render = |e| SitemapError::Render(format!("{e}"));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(render)?;

    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_NS));
    writer.write_event(Event::Start(urlset)).map_err(render)?;

    for (_, urls) in generator.sections() {
        for url in urls {
            writer
                .write_event(Event::Start(BytesStart::new("url")))
                .map_err(render)?;

            write_text_element(&mut writer, "loc", &url.loc)?;
            if let Some(lastmod) = url.lastmod {
                write_text_element(&mut writer, "lastmod", &lastmod.to_rfc3339())?;
            }
            write_text_element(&mut writer, "changefreq", url.changefreq.as_str())?;
            write_text_element(&mut writer, "priority", &format!("{:.1}", url.priority))?;

            writer
                .write_event(Event::End(BytesEnd::new("url")))
                .map_err(render)?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("urlset")))
        .map_err(render)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| SitemapError::Render(format!("sitemap is not valid UTF-8: {e}")))
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> Result<(), SitemapError> {
    let render = |e| SitemapError::Render(format!("{e}"));
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .map_err(render)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(render)?;
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(render)?;
    Ok(())
}
