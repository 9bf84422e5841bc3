//! Multi-page traversal of one store section.
//!
//! [`CrawlStateMachine::run`] walks the catalog page by page:
//!
//! ```text
//! Init -> FetchingPage -> ExtractingItems -> Accumulating -> NextPage -> FetchingPage ...
//!                                                        \-> Done | Failed | Cancelled
//! ```
//!
//! Fetching, pricing and the per-item side effect are all injected, so the
//! machine itself owns no I/O and can be driven by in-memory fakes.

use std::time::{Duration, Instant};

use arbi_core::{ExchangeRate, ListingRecord, PricingEngine, RawItem, Verdict};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{ScraperError, SinkError};
use crate::pagination::{probe_and_stabilize, PaginationStrategy};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::sites::SiteProfile;
use crate::summary::RunSummary;

/// Source of catalog page HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the rendered HTML of `url`. One call is one attempt; the
    /// state machine owns retrying.
    async fn fetch_page(&self, url: &str) -> Result<String, ScraperError>;
}

/// Receives accepted listings and diagnostic page dumps.
#[async_trait]
pub trait ItemSink: Send {
    async fn process_accepted_item(&mut self, record: &ListingRecord) -> Result<(), SinkError>;

    /// Stores the HTML of a page whose markup could not be understood.
    async fn save_diagnostic(&mut self, url: &str, html: &str) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Init,
    FetchingPage,
    ExtractingItems,
    Accumulating,
    NextPage,
    Done,
    Failed,
    Cancelled,
}

/// Position of a traversal. `total_pages` only ever grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    pub current_page: u32,
    pub total_pages: u32,
    /// Sequence indices handed out so far.
    pub accepted_count: u32,
    pub phase: CrawlPhase,
}

impl CrawlState {
    fn new() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            accepted_count: 0,
            phase: CrawlPhase::Init,
        }
    }

    fn transition(&mut self, next: CrawlPhase) {
        tracing::debug!(
            page = self.current_page,
            total_pages = self.total_pages,
            from = ?self.phase,
            to = ?next,
            "crawl transition"
        );
        self.phase = next;
    }

    fn raise_total(&mut self, observed: u32) {
        self.total_pages = self.total_pages.max(observed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Traversal fails with [`ScraperError::PaginationLimit`] past this page.
    pub max_pages: u32,
    /// Wait before every fetch except the first.
    pub inter_request_delay: Duration,
    pub retry: RetryPolicy,
}

/// Result of one traversal, partial when it failed or was cancelled.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub summary: RunSummary,
    /// Accepted listings whose side effect succeeded, in sequence order.
    pub records: Vec<ListingRecord>,
    /// `None` for both completed and cancelled traversals.
    pub error: Option<ScraperError>,
}

impl CrawlOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Mutable bookkeeping of a single [`CrawlStateMachine::run`] call.
struct Traversal<'a> {
    start_url: &'a str,
    cancel: &'a CancellationToken,
    state: CrawlState,
    summary: RunSummary,
    records: Vec<ListingRecord>,
}

#[derive(Debug, Clone)]
pub struct CrawlStateMachine {
    profile: SiteProfile,
    engine: PricingEngine,
    rate: ExchangeRate,
    settings: CrawlSettings,
}

impl CrawlStateMachine {
    #[must_use]
    pub fn new(
        profile: SiteProfile,
        engine: PricingEngine,
        rate: ExchangeRate,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            profile,
            engine,
            rate,
            settings,
        }
    }

    /// Traverses every page of `start_url`, pricing each listing and handing
    /// accepted ones to `sink`.
    ///
    /// Never panics and never returns early without a summary: errors end up
    /// in [`CrawlOutcome::error`] alongside whatever was accepted before them.
    /// Cancellation is not an error; it sets `summary.cancelled`.
    pub async fn run<F, S>(
        &self,
        fetcher: &F,
        sink: &mut S,
        start_url: &str,
        section: &str,
        cancel: &CancellationToken,
    ) -> CrawlOutcome
    where
        F: PageFetcher + ?Sized,
        S: ItemSink + ?Sized,
    {
        let started = Instant::now();
        let mut traversal = Traversal {
            start_url,
            cancel,
            state: CrawlState::new(),
            summary: RunSummary::new(self.profile.kind, section, start_url),
            records: Vec::new(),
        };

        let result = self.traverse(&mut traversal, fetcher, sink).await;

        let Traversal {
            mut state,
            mut summary,
            records,
            ..
        } = traversal;
        summary.total_pages = state.total_pages;
        summary.elapsed = started.elapsed();

        let error = match result {
            Ok(()) => {
                state.transition(CrawlPhase::Done);
                None
            }
            Err(ScraperError::Cancelled) => {
                state.transition(CrawlPhase::Cancelled);
                tracing::warn!(
                    store = %self.profile.kind,
                    section,
                    page = state.current_page,
                    "traversal cancelled"
                );
                summary.cancelled = true;
                None
            }
            Err(e) => {
                state.transition(CrawlPhase::Failed);
                tracing::error!(
                    store = %self.profile.kind,
                    section,
                    page = state.current_page,
                    error = %e,
                    "traversal failed"
                );
                Some(e)
            }
        };

        CrawlOutcome {
            summary,
            records,
            error,
        }
    }

    async fn traverse<F, S>(
        &self,
        t: &mut Traversal<'_>,
        fetcher: &F,
        sink: &mut S,
    ) -> Result<(), ScraperError>
    where
        F: PageFetcher + ?Sized,
        S: ItemSink + ?Sized,
    {
        let max_pages = self.settings.max_pages;

        loop {
            let page = t.state.current_page;
            if page > max_pages {
                return Err(self.pagination_limit(t.start_url));
            }
            if t.cancel.is_cancelled() {
                return Err(ScraperError::Cancelled);
            }

            t.state.transition(CrawlPhase::FetchingPage);
            let url = (self.profile.page_url)(t.start_url, page);
            if page > 1 {
                self.polite_delay(t.cancel).await?;
            }
            let html = self.fetch_with_retry(fetcher, &url, t.cancel).await?;
            t.summary.pages_visited += 1;

            t.state.transition(CrawlPhase::ExtractingItems);
            let items = (self.profile.extract_items)(&html, &url)?;
            tracing::info!(
                store = %self.profile.kind,
                page,
                total_pages = t.state.total_pages,
                items = items.len(),
                "fetched catalog page"
            );
            if items.is_empty() {
                if page == 1 {
                    if let Err(e) = sink.save_diagnostic(&url, &html).await {
                        tracing::error!(url, error = %e, "failed to save diagnostic page");
                    }
                    return Err(ScraperError::ElementNotFound {
                        url,
                        selector: self.profile.listing_selector.to_owned(),
                    });
                }
                tracing::warn!(url, page, "catalog page has no listings");
            }

            t.state.transition(CrawlPhase::Accumulating);
            self.accumulate(t, sink, &items).await;

            self.discover_pages(t, fetcher, &html).await?;
            if t.state.total_pages > max_pages {
                return Err(self.pagination_limit(t.start_url));
            }
            if page >= t.state.total_pages {
                return Ok(());
            }

            t.state.transition(CrawlPhase::NextPage);
            t.state.current_page += 1;
        }
    }

    /// Prices each listing. Failures of one item never affect the others.
    async fn accumulate<S>(&self, t: &mut Traversal<'_>, sink: &mut S, items: &[RawItem])
    where
        S: ItemSink + ?Sized,
    {
        for item in items {
            t.summary.items_seen += 1;
            let verdict = self.engine.evaluate(
                &item.sale_price,
                item.original_price.as_deref(),
                self.rate,
            );

            match verdict {
                Err(e) => {
                    tracing::warn!(url = %item.product_url, error = %e, "listing could not be priced");
                    t.summary.items_failed += 1;
                }
                Ok(Verdict::Rejected(reason)) => {
                    tracing::debug!(url = %item.product_url, %reason, "listing rejected");
                    t.summary.items_rejected += 1;
                }
                Ok(Verdict::Accepted(quote)) => {
                    t.state.accepted_count += 1;
                    let record = ListingRecord::new(t.state.accepted_count, item, &quote);
                    match sink.process_accepted_item(&record).await {
                        Ok(()) => {
                            t.summary.items_accepted += 1;
                            t.records.push(record);
                        }
                        Err(e) => {
                            tracing::warn!(
                                url = %item.product_url,
                                index = record.sequence_index,
                                error = %e,
                                "failed to process accepted listing"
                            );
                            t.summary.items_failed += 1;
                        }
                    }
                }
            }
        }
    }

    /// Updates `total_pages` from the page just processed.
    async fn discover_pages<F>(
        &self,
        t: &mut Traversal<'_>,
        fetcher: &F,
        html: &str,
    ) -> Result<(), ScraperError>
    where
        F: PageFetcher + ?Sized,
    {
        let page = t.state.current_page;
        match self.profile.pagination {
            PaginationStrategy::NextButton(has_next) => {
                if has_next(html)? {
                    t.state.raise_total(page + 1);
                }
            }
            PaginationStrategy::StaticMarker(resolve_total) if page == 1 => {
                t.state.raise_total(resolve_total(html)?);
            }
            PaginationStrategy::ProbeAndStabilize(max_marker) if page == 1 => {
                let start_url = t.start_url;
                let cancel = t.cancel;
                let (total, probes) = probe_and_stabilize(
                    start_url,
                    html,
                    max_marker,
                    self.settings.max_pages,
                    move |n| {
                        let url = (self.profile.page_url)(start_url, n);
                        async move {
                            self.polite_delay(cancel).await?;
                            self.fetch_with_retry(fetcher, &url, cancel).await
                        }
                    },
                )
                .await?;
                t.summary.probe_fetches += probes;
                t.state.raise_total(total);
            }
            PaginationStrategy::StaticMarker(_) | PaginationStrategy::ProbeAndStabilize(_) => {}
        }
        Ok(())
    }

    async fn fetch_with_retry<F>(
        &self,
        fetcher: &F,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ScraperError>
    where
        F: PageFetcher + ?Sized,
    {
        tokio::select! {
            () = cancel.cancelled() => Err(ScraperError::Cancelled),
            result = retry_with_backoff(self.settings.retry, || fetcher.fetch_page(url)) => result,
        }
    }

    async fn polite_delay(&self, cancel: &CancellationToken) -> Result<(), ScraperError> {
        let delay = self.settings.inter_request_delay;
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            () = cancel.cancelled() => Err(ScraperError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn pagination_limit(&self, start_url: &str) -> ScraperError {
        ScraperError::PaginationLimit {
            url: start_url.to_owned(),
            max_pages: self.settings.max_pages,
        }
    }
}

#[cfg(test)]
#[path = "crawl_test.rs"]
mod tests;
