//! Supply Store (AUD). The pager only shows nearby page numbers, so the
//! page count is found by probing.

use arbi_core::{RawItem, StoreKind};
use scraper::{ElementRef, Html, Selector};

use super::{absolutize, element_text, first_text, selector, with_page_param, SiteProfile};
use crate::error::ScraperError;
use crate::pagination::PaginationStrategy;

const ORIGIN: &str = "https://www.supplystore.com.au";
const TILES: &str = "section.list-section form[method=post]";

const SALE_LABEL: &str = "As low as";
const REGULAR_LABEL: &str = "Regular Price";
const PAGE_LABEL: &str = "Page";
const CURRENT_PAGE_LABEL: &str = "You're currently reading page";

pub const PROFILE: SiteProfile = SiteProfile {
    kind: StoreKind::Supply,
    extract_items,
    page_url,
    pagination: PaginationStrategy::ProbeAndStabilize(max_page_marker),
    listing_selector: TILES,
};

fn page_url(start_url: &str, page: u32) -> String {
    with_page_param(start_url, "p", page)
}

/// # Errors
///
/// Returns [`ScraperError::Selector`] only if a built-in selector is invalid.
pub fn extract_items(html: &str, page_url: &str) -> Result<Vec<RawItem>, ScraperError> {
    let tiles = selector(TILES)?;
    let img_sel = selector("img.object-contain")?;
    let brand_sel = selector("div.product-itme-brand")?;
    let title_sel = selector("div.product-item-name")?;
    let link_sel = selector("div.product-item-name a.product-item-link")?;
    let label_sel = selector("span.price-label")?;
    let price_sel = selector("span.price")?;

    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for tile in document.select(&tiles) {
        let brand = first_text(tile, &brand_sel).unwrap_or_default();
        let title = first_text(tile, &title_sel).unwrap_or_default();
        let href = tile
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"));
        let (false, false, Some(href)) = (brand.is_empty(), title.is_empty(), href) else {
            tracing::warn!(url = page_url, "product tile missing brand, title or link, skipping");
            continue;
        };

        let sale_price = labelled_price(tile, &label_sel, &price_sel, SALE_LABEL)
            .or_else(|| first_text(tile, &price_sel))
            .unwrap_or_default();
        let original_price = labelled_price(tile, &label_sel, &price_sel, REGULAR_LABEL);

        let image_urls = tile
            .select(&img_sel)
            .filter_map(|img| img.value().attr("src"))
            .take(1)
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

/// Price shown next to a `span.price-label` with the given text.
fn labelled_price(
    tile: ElementRef<'_>,
    label_sel: &Selector,
    price_sel: &Selector,
    label: &str,
) -> Option<String> {
    tile.select(label_sel)
        .filter(|el| element_text(*el) == label)
        .find_map(|el| {
            let container = el.parent().and_then(ElementRef::wrap)?;
            first_text(container, price_sel)
        })
}

/// Highest page number visible in the pager window; 1 when there is none.
///
/// Each pager entry is a screen-reader label span followed by a span with
/// the number. The current page's number carries `line-through`.
///
/// # Errors
///
/// Returns [`ScraperError::Selector`] only if a built-in selector is invalid.
pub fn max_page_marker(html: &str) -> Result<u32, ScraperError> {
    let label_sel = selector("span.sr-only.label")?;
    let document = Html::parse_document(html);

    let mut max_page = 1u32;
    for label in document.select(&label_sel) {
        let wants_current = match element_text(label).as_str() {
            PAGE_LABEL => false,
            CURRENT_PAGE_LABEL => true,
            _ => continue,
        };

        let number = label
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "span")
            .find(|el| !wants_current || el.value().classes().any(|c| c == "line-through"))
            .and_then(|el| element_text(el).parse::<u32>().ok());

        if let Some(page) = number {
            max_page = max_page.max(page);
        }
    }

    Ok(max_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
<html><body>
<section class="list-section">
  <form method="post">
    <img class="object-contain" src="https://www.supplystore.com.au/media/catalog/jacket.jpg">
    <div class="product-itme-brand">Stussy</div>
    <div class="product-item-name"><a class="product-item-link" href="https://www.supplystore.com.au/stussy-work-jacket">Stussy Work Jacket "Olive"</a></div>
    <div class="price-box">
      <span class="special-price"><span class="price-label">As low as</span><span class="price-wrapper"><span class="price">$189.00</span></span></span>
      <span class="old-price"><span class="price-label">Regular Price</span><span class="price-wrapper"><span class="price">$270.00</span></span></span>
    </div>
  </form>
  <form method="post">
    <img class="object-contain" src="/media/catalog/cap.jpg">
    <div class="product-itme-brand">Carhartt WIP</div>
    <div class="product-item-name"><a class="product-item-link" href="/carhartt-cap">Logo Cap</a></div>
    <div class="price-box"><span class="price">$59.95</span></div>
  </form>
  <form method="get">
    <div class="product-itme-brand">Newsletter</div>
  </form>
</section>
</body></html>
"#;

    #[test]
    fn extracts_labelled_sale_and_regular_prices() {
        let items = extract_items(LISTING, "https://www.supplystore.com.au/sale").unwrap();
        assert_eq!(items.len(), 2);

        let jacket = &items[0];
        assert_eq!(jacket.brand, "Stussy");
        assert_eq!(jacket.title, "Stussy Work Jacket \"Olive\"");
        assert_eq!(jacket.sale_price, "$189.00");
        assert_eq!(jacket.original_price.as_deref(), Some("$270.00"));
        assert_eq!(
            jacket.image_urls,
            vec!["https://www.supplystore.com.au/media/catalog/jacket.jpg"]
        );
    }

    #[test]
    fn unlabelled_price_is_sale_price_without_original() {
        let items = extract_items(LISTING, "https://www.supplystore.com.au/sale").unwrap();
        let cap = &items[1];
        assert_eq!(cap.sale_price, "$59.95");
        assert_eq!(cap.original_price, None);
        assert_eq!(cap.product_url, "https://www.supplystore.com.au/carhartt-cap");
        assert_eq!(
            cap.image_urls,
            vec!["https://www.supplystore.com.au/media/catalog/cap.jpg"]
        );
    }

    #[test]
    fn max_marker_reads_window_and_current_page() {
        let html = r#"
<ul class="pages-items">
  <li class="item current"><strong class="page"><span class="sr-only label">You're currently reading page</span><span class="line-through">6</span></strong></li>
  <li class="item"><a class="page"><span class="sr-only label">Page</span><span>7</span></a></li>
  <li class="item"><a class="page"><span class="sr-only label">Page</span><span>8</span></a></li>
  <li class="item pages-item-next"><a class="next"><span class="sr-only label">Next</span><span>Next</span></a></li>
</ul>"#;
        assert_eq!(max_page_marker(html).unwrap(), 8);
    }

    #[test]
    fn max_marker_ignores_non_numeric_entries() {
        let html = r#"<a><span class="sr-only label">Page</span><span>…</span></a>"#;
        assert_eq!(max_page_marker(html).unwrap(), 1);
    }

    #[test]
    fn max_marker_is_one_without_pager() {
        assert_eq!(max_page_marker("<html></html>").unwrap(), 1);
    }

    #[test]
    fn page_url_uses_p_param() {
        assert_eq!(
            page_url("https://www.supplystore.com.au/sale", 3),
            "https://www.supplystore.com.au/sale?p=3"
        );
    }
}
