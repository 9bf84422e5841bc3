//! The `run` command: one traversal per configured section.
//!
//! Exchange rates are fetched once up front; a missing rate aborts the run
//! before any page is fetched. Traversals then run in a bounded pool and a
//! failed traversal never stops the others.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context as _;
use arbi_core::{AppConfig, ExchangeRate, PricingEngine, PricingPolicy, StoreKind, StoresFile};
use arbi_scraper::{
    profile, section_name, section_url, BankRateSource, CrawlOutcome, CrawlSettings,
    CrawlStateMachine, PageClient, RetryPolicy, RunSummary,
};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::sink::{DryRunSink, FolderSink};

#[derive(Debug, Clone, Default)]
pub(crate) struct RunOptions {
    pub store: Option<StoreKind>,
    pub section: Option<String>,
    pub dry_run: bool,
    pub json: bool,
}

/// One section to traverse, with everything resolved up front.
#[derive(Debug, Clone)]
struct Job {
    store: StoreKind,
    section: String,
    start_url: String,
    policy: PricingPolicy,
    rate: ExchangeRate,
}

#[derive(Debug, Serialize)]
struct TraversalReport<'a> {
    #[serde(flatten)]
    summary: &'a RunSummary,
    error: Option<String>,
}

pub(crate) fn retry_policy(config: &AppConfig) -> RetryPolicy {
    RetryPolicy {
        max_retries: config.max_retries,
        base_delay_ms: config.retry_delay_ms,
        exponential: config.retry_exponential,
    }
}

/// # Errors
///
/// Returns an error if the store catalogue is invalid, nothing matches the
/// filters, an exchange rate cannot be fetched, or every traversal failed.
pub(crate) async fn run_command(config: &AppConfig, options: &RunOptions) -> anyhow::Result<()> {
    let stores = arbi_core::load_stores(&config.stores_path)?;
    let client = PageClient::new(config.request_timeout_secs, &config.user_agent)?;
    let retry = retry_policy(config);

    let labels = currency_labels(&stores, options.store);
    let source = BankRateSource::new(client.clone(), config.exchange_rate_url.clone(), retry);
    let mut rates = HashMap::new();
    for label in labels {
        let rate = source
            .get_exchange_rate(&label)
            .await
            .context("exchange rate unavailable, aborting run")?;
        rates.insert(label, rate);
    }

    let jobs = plan_jobs(
        &stores,
        options.store,
        options.section.as_deref(),
        &rates,
    )?;
    if jobs.is_empty() {
        anyhow::bail!("no configured section matches the given filters");
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping traversals");
                cancel.cancel();
            }
        });
    }

    let settings = CrawlSettings {
        max_pages: config.max_pages,
        inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
        retry,
    };
    let max_concurrent = config.max_concurrent_traversals.max(1);
    tracing::info!(
        traversals = jobs.len(),
        max_concurrent,
        dry_run = options.dry_run,
        "starting run"
    );

    let results: Vec<(&Job, anyhow::Result<CrawlOutcome>)> = stream::iter(&jobs)
        .map(|job| {
            let fut = run_job(job, &client, config, settings, options.dry_run, &cancel);
            async move { (job, fut.await) }
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    report(&results, options.json)?;

    let failed = results
        .iter()
        .filter(|(_, r)| !matches!(r, Ok(outcome) if outcome.is_success()))
        .count();
    if failed > 0 {
        tracing::warn!(failed, total = results.len(), "some traversals failed");
    }
    if failed == results.len() {
        anyhow::bail!("all {failed} traversals failed");
    }
    Ok(())
}

async fn run_job(
    job: &Job,
    client: &PageClient,
    config: &AppConfig,
    settings: CrawlSettings,
    dry_run: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<CrawlOutcome> {
    let machine = CrawlStateMachine::new(
        profile(job.store),
        PricingEngine::new(job.policy.clone()),
        job.rate,
        settings,
    );
    tracing::info!(
        store = %job.store,
        section = %job.section,
        url = %job.start_url,
        "traversal started"
    );

    if dry_run {
        let mut sink = DryRunSink;
        return Ok(machine
            .run(client, &mut sink, &job.start_url, &job.section, cancel)
            .await);
    }

    let mut sink = FolderSink::create(
        &config.output_dir,
        job.store,
        &job.section,
        client.http().clone(),
    )
    .await?;
    let outcome = machine
        .run(client, &mut sink, &job.start_url, &job.section, cancel)
        .await;
    Ok(close_sink(sink, outcome).await)
}

/// Tidies the output folder. A cleanup failure is logged and never costs
/// the traversal its outcome.
async fn close_sink(sink: FolderSink, outcome: CrawlOutcome) -> CrawlOutcome {
    if let Err(e) = sink.finish().await {
        tracing::warn!(
            store = %outcome.summary.store,
            section = %outcome.summary.section,
            error = %e,
            "failed to tidy output folder"
        );
    }
    outcome
}

/// Distinct rate-table labels of the stores that will be traversed.
fn currency_labels(stores: &StoresFile, store_filter: Option<StoreKind>) -> Vec<String> {
    let mut labels: Vec<String> = stores
        .stores
        .iter()
        .filter(|s| store_filter.is_none_or(|k| s.kind == k))
        .filter_map(|s| s.currency_label().map(str::to_owned))
        .collect();
    labels.sort();
    labels.dedup();
    labels
}

fn plan_jobs(
    stores: &StoresFile,
    store_filter: Option<StoreKind>,
    section_filter: Option<&str>,
    rates: &HashMap<String, ExchangeRate>,
) -> anyhow::Result<Vec<Job>> {
    let mut jobs = Vec::new();

    for store in &stores.stores {
        if store_filter.is_some_and(|k| k != store.kind) {
            continue;
        }
        let rate = match store.currency_label() {
            Some(label) => *rates
                .get(label)
                .with_context(|| format!("no exchange rate fetched for {label}"))?,
            None => ExchangeRate::unit(),
        };

        for section in &store.sections {
            let start_url = section_url(store.kind, section)?;
            let name = section_name(store.kind, &start_url);
            if let Some(wanted) = section_filter {
                let by_name = name.eq_ignore_ascii_case(wanted);
                let by_brand = section
                    .brand
                    .as_deref()
                    .is_some_and(|b| b.eq_ignore_ascii_case(wanted));
                if !by_name && !by_brand {
                    continue;
                }
            }
            jobs.push(Job {
                store: store.kind,
                section: name,
                start_url,
                policy: store.policy(),
                rate,
            });
        }
    }

    Ok(jobs)
}

fn report(results: &[(&Job, anyhow::Result<CrawlOutcome>)], json: bool) -> anyhow::Result<()> {
    if json {
        let reports: Vec<TraversalReport<'_>> = results
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .map(|o| TraversalReport {
                summary: &o.summary,
                error: o.error.as_ref().map(ToString::to_string),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    let (mut seen, mut accepted, mut rejected, mut failed) = (0u32, 0u32, 0u32, 0u32);
    for (job, result) in results {
        match result {
            Ok(outcome) => {
                let s = &outcome.summary;
                seen += s.items_seen;
                accepted += s.items_accepted;
                rejected += s.items_rejected;
                failed += s.items_failed;
                if !json {
                    println!("{s}");
                    if let Some(e) = &outcome.error {
                        println!("error:    {e}");
                    }
                    println!();
                }
            }
            Err(e) => {
                tracing::error!(
                    store = %job.store,
                    section = %job.section,
                    error = %e,
                    "traversal could not start"
                );
            }
        }
    }

    if !json {
        println!(
            "total: {} traversals, {seen} listings seen, {accepted} accepted, {rejected} rejected, {failed} failed",
            results.len()
        );
    }
    Ok(())
}
