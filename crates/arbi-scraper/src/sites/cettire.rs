//! Cettire (local currency). Pages are followed while the "next" control is
//! enabled. Class names are build hashes from the storefront bundle.

use arbi_core::{RawItem, StoreKind};
use scraper::Html;

use super::{absolutize, first_text, selector, with_page_param, SiteProfile};
use crate::error::ScraperError;
use crate::pagination::PaginationStrategy;

const ORIGIN: &str = "https://www.cettire.com";
const TILES: &str = "div._8T7q2GDqmgeWgJYhbInA1";

pub const PROFILE: SiteProfile = SiteProfile {
    kind: StoreKind::Cettire,
    extract_items,
    page_url,
    pagination: PaginationStrategy::NextButton(has_next_page),
    listing_selector: TILES,
};

fn page_url(start_url: &str, page: u32) -> String {
    with_page_param(start_url, "page", page)
}

/// # Errors
///
/// Returns [`ScraperError::Selector`] only if a built-in selector is invalid.
pub fn extract_items(html: &str, page_url: &str) -> Result<Vec<RawItem>, ScraperError> {
    let tiles = selector(TILES)?;
    let link_sel = selector("a")?;
    let img_sel = selector("img._3P4L7mmfV3qp3D432lVyQu")?;
    let brand_sel = selector("div._1tt3LMOZ50TX6rWCuwNDjK")?;
    let title_sel = selector("div._1EqhXd6FUIED0ndyLYSncV")?;
    let sale_sel = selector("span._2Jxa7Rj1Kswy2fPVXbctjY")?;
    let original_sel = selector("s.E0_8CVj5Lnq3QKTQFJFQU")?;

    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for tile in document.select(&tiles) {
        let href = tile
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"));
        let brand = first_text(tile, &brand_sel);
        let title = first_text(tile, &title_sel);
        let (Some(href), Some(brand), Some(title)) = (href, brand, title) else {
            tracing::warn!(url = page_url, "product tile missing link, brand or title, skipping");
            continue;
        };

        let image_urls = tile
            .select(&img_sel)
            .filter_map(|img| img.value().attr("src"))
            .take(1)
            .map(|src| absolutize(ORIGIN, src))
            .collect();

        items.push(RawItem {
            brand,
            title,
            original_price: first_text(tile, &original_sel),
            sale_price: first_text(tile, &sale_sel).unwrap_or_default(),
            image_urls,
            product_url: absolutize(ORIGIN, href),
        });
    }

    Ok(items)
}

/// `true` while the pager's next control exists and is not disabled.
///
/// # Errors
///
/// Returns [`ScraperError::Selector`] only if a built-in selector is invalid.
pub fn has_next_page(html: &str) -> Result<bool, ScraperError> {
    let next_sel = selector(r#"li[data-page="next"]"#)?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&next_sel)
        .next()
        .is_some_and(|li| !li.value().classes().any(|c| c == "button-disabled")))
}
