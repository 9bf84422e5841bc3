pub mod client;
pub mod crawl;
pub mod error;
pub mod exchange;
pub mod pagination;
pub mod retry;
pub mod sites;
pub mod summary;

pub use client::PageClient;
pub use crawl::{
    CrawlOutcome, CrawlPhase, CrawlSettings, CrawlState, CrawlStateMachine, ItemSink, PageFetcher,
};
pub use error::{ScraperError, SinkError};
pub use exchange::{parse_spot_selling_rate, BankRateSource};
pub use pagination::{probe_and_stabilize, PaginationStrategy};
pub use retry::RetryPolicy;
pub use sites::{profile, sale_url, section_name, section_url, SiteProfile};
pub use summary::{format_elapsed, RunSummary};
