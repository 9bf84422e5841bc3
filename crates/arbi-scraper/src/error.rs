use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("no element matching `{selector}` on {url}")]
    ElementNotFound { url: String, selector: String },

    #[error("could not extract listings from {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("pagination limit reached for {url}: exceeded {max_pages} pages")]
    PaginationLimit { url: String, max_pages: u32 },

    #[error("invalid store URL \"{url}\": {reason}")]
    InvalidStoreUrl { url: String, reason: String },

    #[error("exchange rate for {currency} unavailable: {reason}")]
    ExchangeRateUnavailable { currency: String, reason: String },

    #[error("invalid CSS selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("traversal cancelled")]
    Cancelled,
}

impl ScraperError {
    /// Returns `true` for failures worth retrying after a delay: network
    /// errors, timeouts, HTTP 429 and 5xx responses.
    ///
    /// Everything else (404, other 4xx, markup mismatches, limits) fails the
    /// same way on every attempt and is returned immediately.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.is_body()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            ScraperError::RateLimited { .. } => true,
            ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
            ScraperError::NotFound { .. }
            | ScraperError::ElementNotFound { .. }
            | ScraperError::Extraction { .. }
            | ScraperError::PaginationLimit { .. }
            | ScraperError::InvalidStoreUrl { .. }
            | ScraperError::ExchangeRateUnavailable { .. }
            | ScraperError::Selector { .. }
            | ScraperError::Cancelled => false,
        }
    }
}

/// Failure of a side effect performed for an accepted listing.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },
}
