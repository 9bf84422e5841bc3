//! Up There Store (AUD). Page 1's pager lists every page number.

use arbi_core::{RawItem, StoreKind};
use scraper::Html;

use super::{absolutize, element_text, first_text, selector, with_page_param, SiteProfile};
use crate::error::ScraperError;
use crate::pagination::PaginationStrategy;

const ORIGIN: &str = "https://uptherestore.com";
const TILES: &str = "section.product-grid a.product, section.product-grid a.product__swap";

pub const PROFILE: SiteProfile = SiteProfile {
    kind: StoreKind::Upthere,
    extract_items,
    page_url,
    pagination: PaginationStrategy::StaticMarker(resolve_total_pages),
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
    let brand_sel = selector(".product__subtitle span")?;
    let title_sel = selector(".product__title")?;
    let original_sel = selector("del.price__amount")?;
    let sale_sel = selector("ins.price__amount")?;
    let any_price_sel = selector(".price__amount")?;
    let img_sel = selector("img")?;

    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for tile in document.select(&tiles) {
        let Some(href) = tile.value().attr("href") else {
            tracing::warn!(url = page_url, "product tile without link, skipping");
            continue;
        };

        // The subtitle span holds the brand on its first line, then colour info.
        let brand = tile
            .select(&brand_sel)
            .next()
            .and_then(|span| span.text().next())
            .and_then(|text| text.trim().lines().next())
            .map(|line| line.trim().to_owned())
            .unwrap_or_default();
        let title = first_text(tile, &title_sel).unwrap_or_default();
        if brand.is_empty() || title.is_empty() {
            tracing::warn!(url = page_url, href, "product tile missing brand or title, skipping");
            continue;
        }

        let original_price = first_text(tile, &original_sel);
        let sale_price = first_text(tile, &sale_sel)
            .or_else(|| tile.select(&any_price_sel).next().map(element_text))
            .unwrap_or_default();

        let image_urls = tile
            .select(&img_sel)
            .filter_map(|img| img.value().attr("src"))
            .map(|src| absolutize(ORIGIN, src))
            .collect();

        items.push(RawItem {
            brand,
            title,
            original_price,
            sale_price,
            image_urls,
            product_url: absolutize(ORIGIN, href),
        });
    }

    Ok(items)
}

/// Highest page number in the bottom pager; 1 when there is no pager.
///
/// # Errors
///
/// Returns [`ScraperError::Selector`] only if a built-in selector is invalid.
pub fn resolve_total_pages(html: &str) -> Result<u32, ScraperError> {
    let pager_items = selector(".boost-pfs-filter-bottom-pagination li")?;
    let document = Html::parse_document(html);

    let labels: Vec<String> = document.select(&pager_items).map(element_text).collect();
    if labels.len() < 2 {
        return Ok(1);
    }

    // First and last entries are the previous/next arrows.
    let total = labels[1..labels.len() - 1]
        .iter()
        .filter_map(|label| label.parse::<u32>().ok())
        .max()
        .unwrap_or(1);
    Ok(total.max(1))
}
