//! Per-store markup knowledge: listing extractors, page URLs and pagination.
//!
//! Each [`StoreKind`] resolves to a [`SiteProfile`] at startup; the crawl
//! only ever talks to the profile.

pub mod cettire;
pub mod supply;
pub mod upthere;

use arbi_core::{Category, RawItem, SectionConfig, StoreKind};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use scraper::{ElementRef, Selector};

use crate::error::ScraperError;
use crate::pagination::PaginationStrategy;

/// Characters left as-is when a brand is placed in a URL path.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Parses one catalog page into raw listings. The second argument is the
/// page URL, used for error context and for resolving relative links.
pub type ExtractFn = fn(&str, &str) -> Result<Vec<RawItem>, ScraperError>;

/// Builds the URL of page `n` (1-based) from a section's start URL.
pub type PageUrlFn = fn(&str, u32) -> String;

#[derive(Debug, Clone, Copy)]
pub struct SiteProfile {
    pub kind: StoreKind,
    pub extract_items: ExtractFn,
    pub page_url: PageUrlFn,
    pub pagination: PaginationStrategy,
    /// Selector whose absence on page 1 means the markup changed.
    pub listing_selector: &'static str,
}

#[must_use]
pub fn profile(kind: StoreKind) -> SiteProfile {
    match kind {
        StoreKind::Upthere => upthere::PROFILE,
        StoreKind::Supply => supply::PROFILE,
        StoreKind::Cettire => cettire::PROFILE,
    }
}

/// Sale page for one brand, optionally narrowed to a category.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidStoreUrl`] when the store has no per-brand
/// sale pages, the brand is blank, or the store cannot filter by category.
pub fn sale_url(
    kind: StoreKind,
    brand: &str,
    category: Option<Category>,
) -> Result<String, ScraperError> {
    let brand = brand.trim();
    if brand.is_empty() {
        return Err(ScraperError::InvalidStoreUrl {
            url: kind.url_prefix().to_owned(),
            reason: "brand must be non-empty".to_owned(),
        });
    }

    let encoded = utf8_percent_encode(brand, PATH_SEGMENT);
    match (kind, category) {
        (StoreKind::Upthere | StoreKind::Cettire, None) => Ok(format!(
            "{}/collections/sale/{encoded}",
            kind.url_prefix()
        )),
        (StoreKind::Cettire, Some(category)) => Ok(format!(
            "{}/collections/sale/{encoded}?refinementList%5Btags%5D%5B0%5D={category}",
            kind.url_prefix()
        )),
        (StoreKind::Upthere, Some(_)) => Err(ScraperError::InvalidStoreUrl {
            url: kind.url_prefix().to_owned(),
            reason: format!("{kind} does not support category filters"),
        }),
        (StoreKind::Supply, _) => Err(ScraperError::InvalidStoreUrl {
            url: kind.url_prefix().to_owned(),
            reason: format!("{kind} has no per-brand sale pages; configure a url section"),
        }),
    }
}

/// Start URL for a configured section.
///
/// # Errors
///
/// Propagates [`sale_url`] errors, and rejects explicit URLs outside the
/// store's prefix.
pub fn section_url(kind: StoreKind, section: &SectionConfig) -> Result<String, ScraperError> {
    match (&section.url, &section.brand) {
        (Some(url), _) => {
            if url.starts_with(kind.url_prefix()) {
                Ok(url.clone())
            } else {
                Err(ScraperError::InvalidStoreUrl {
                    url: url.clone(),
                    reason: format!("does not belong to store {kind}"),
                })
            }
        }
        (None, Some(brand)) => sale_url(kind, brand, section.category),
        (None, None) => Err(ScraperError::InvalidStoreUrl {
            url: String::new(),
            reason: "section has neither brand nor url".to_owned(),
        }),
    }
}

/// Output section name derived from a start URL.
///
/// Cettire sale URLs yield the decoded brand with spaces as `_`, suffixed
/// with the category filter when present (`Acne_Studios - Bags`). Other
/// stores use the last path segment.
#[must_use]
pub fn section_name(kind: StoreKind, url: &str) -> String {
    const SALE_MARKER: &str = "collections/sale/";

    if kind == StoreKind::Cettire {
        if let Some(start) = url.find(SALE_MARKER) {
            let rest = &url[start + SALE_MARKER.len()..];
            let end = rest.find(['/', '?']).unwrap_or(rest.len());
            let mut name = percent_decode_str(&rest[..end])
                .decode_utf8_lossy()
                .replace(' ', "_");
            if url.contains("Bags") {
                name.push_str(" - Bags");
            } else if url.contains("Accessories") {
                name.push_str(" - Accessories");
            }
            if !name.is_empty() {
                return name;
            }
        }
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    let name = percent_decode_str(last).decode_utf8_lossy().replace(' ', "_");
    if name.is_empty() || name.contains(':') {
        "sale".to_owned()
    } else {
        name
    }
}

/// Appends `param=page` to `base`, leaving page 1 as the bare start URL.
pub(crate) fn with_page_param(base: &str, param: &str, page: u32) -> String {
    if page <= 1 {
        return base.to_owned();
    }
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{param}={page}")
}

pub(crate) fn selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::Selector {
        selector: css.to_owned(),
        reason: e.to_string(),
    })
}

/// Whitespace-collapsed text content of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first descendant matching `sel`, if non-empty.
pub(crate) fn first_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope
        .select(sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Resolves protocol-relative and root-relative links against `origin`.
pub(crate) fn absolutize(origin: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_owned()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        format!("{origin}/{href}")
    }
}
