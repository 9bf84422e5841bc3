//! How a traversal learns how many catalog pages exist.
//!
//! Three store behaviours are covered:
//!
//! - **Next button**: each page says whether another follows. The page count
//!   grows by one while the control stays enabled.
//! - **Static marker**: page 1's pager lists the final page number.
//! - **Probe and stabilize**: the pager only shows a window of nearby page
//!   numbers. Jump to the highest visible page, read its pager, and repeat
//!   until the highest number stops growing. Each jump is a real fetch.

use std::future::Future;

use crate::error::ScraperError;

/// Reads "is there another page after this one?" from a page's HTML.
pub type HasNextFn = fn(&str) -> Result<bool, ScraperError>;

/// Reads the highest page number visible in a page's pager (at least 1).
pub type MaxMarkerFn = fn(&str) -> Result<u32, ScraperError>;

#[derive(Debug, Clone, Copy)]
pub enum PaginationStrategy {
    NextButton(HasNextFn),
    StaticMarker(MaxMarkerFn),
    ProbeAndStabilize(MaxMarkerFn),
}

/// Finds the true page count of a windowed pager.
///
/// `fetch_page(n)` must return the HTML of page `n`. Returns
/// `(total_pages, probe_fetches)`; `probe_fetches` counts the extra requests
/// spent on probing.
///
/// # Errors
///
/// - [`ScraperError::PaginationLimit`] when the observed count exceeds `max_pages`.
/// - Any error from `fetch_page` or `max_marker`.
pub async fn probe_and_stabilize<F, Fut>(
    start_url: &str,
    first_html: &str,
    max_marker: MaxMarkerFn,
    max_pages: u32,
    mut fetch_page: F,
) -> Result<(u32, u32), ScraperError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<String, ScraperError>>,
{
    let mut total_pages = max_marker(first_html)?.max(1);
    let mut probe_fetches = 0u32;

    loop {
        if total_pages > max_pages {
            return Err(ScraperError::PaginationLimit {
                url: start_url.to_owned(),
                max_pages,
            });
        }
        if total_pages == 1 {
            break;
        }

        let html = fetch_page(total_pages).await?;
        probe_fetches += 1;

        let observed = max_marker(&html)?;
        tracing::debug!(
            url = start_url,
            probed = total_pages,
            observed,
            "pagination probe"
        );
        if observed <= total_pages {
            break;
        }
        total_pages = observed;
    }

    Ok((total_pages, probe_fetches))
}
