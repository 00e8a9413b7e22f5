//! sitemap.xml and robots.txt for the public site.
//!
//! Entries cover the fixed top-level pages plus one `/writing/{slug}` entry
//! per addressable article. Articles that only have a positional id have no
//! stable URL and are left out.

use time::format_description::well_known::Rfc3339;
use url::form_urlencoded;

use crate::domain::articles::NormalizedArticle;

/// Top-level routes of the portfolio, in sitemap order.
pub const STATIC_PATHS: &[&str] = &[
    "/",
    "/evidence",
    "/framework",
    "/resume",
    "/contact",
    "/writing",
];

pub fn sitemap_xml(public_site_url: &str, articles: &[NormalizedArticle]) -> String {
    let base = normalize_public_site_url(public_site_url);

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for path in STATIC_PATHS {
        xml.push_str(&sitemap_entry(&base, path, None));
    }
    for article in articles.iter().filter(|article| !article.id.is_positional()) {
        xml.push_str(&sitemap_entry(
            &base,
            &article_path(&article.slug),
            article.published_on,
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn robots_txt(public_site_url: &str) -> String {
    let base = normalize_public_site_url(public_site_url);
    format!("User-agent: *\nAllow: /\nSitemap: {base}sitemap.xml\n")
}

pub fn article_path(slug: &str) -> String {
    let segment: String = form_urlencoded::byte_serialize(slug.as_bytes()).collect();
    // form encoding writes spaces as `+`, which a path reads literally
    format!("/writing/{}", segment.replace('+', "%20"))
}

pub fn normalize_public_site_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    format!("{trimmed}/")
}

pub fn canonical_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path == "/" {
        base.to_string()
    } else {
        format!("{base}{path}")
    }
}

fn sitemap_entry(base: &str, path: &str, lastmod: Option<time::OffsetDateTime>) -> String {
    let loc = xml_escape(&canonical_url(base, path));
    match lastmod.and_then(|dt| dt.format(&Rfc3339).ok()) {
        Some(lastmod) => {
            format!("  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod></url>\n")
        }
        None => format!("  <url><loc>{loc}</loc></url>\n"),
    }
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
