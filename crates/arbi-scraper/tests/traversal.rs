//! End-to-end traversal of a Cettire-style sale section served by `wiremock`.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use arbi_core::{ExchangeRate, ListingRecord, PricingEngine, StoreKind};
use arbi_scraper::{
    profile, CrawlSettings, CrawlStateMachine, ItemSink, PageClient, RetryPolicy, ScraperError,
    SinkError,
};

const SECTION_PATH: &str = "/tw/collections/sale/Acne";

#[derive(Default)]
struct CollectingSink {
    records: Vec<ListingRecord>,
    diagnostics: Vec<String>,
}

#[async_trait]
impl ItemSink for CollectingSink {
    async fn process_accepted_item(&mut self, record: &ListingRecord) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }

    async fn save_diagnostic(&mut self, url: &str, _html: &str) -> Result<(), SinkError> {
        self.diagnostics.push(url.to_owned());
        Ok(())
    }
}

fn machine() -> CrawlStateMachine {
    CrawlStateMachine::new(
        profile(StoreKind::Cettire),
        PricingEngine::new(StoreKind::Cettire.default_policy()),
        ExchangeRate::unit(),
        CrawlSettings {
            max_pages: 20,
            inter_request_delay: Duration::ZERO,
            retry: RetryPolicy {
                max_retries: 2,
                base_delay_ms: 0,
                exponential: false,
            },
        },
    )
}

fn client() -> PageClient {
    PageClient::new(5, "arbi-test/0.1").expect("failed to build test PageClient")
}

async fn mount_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(SECTION_PATH))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(include_str!("fixtures/cettire_page1.html")),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(SECTION_PATH))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(include_str!("fixtures/cettire_page2.html")),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn traversal_walks_all_pages_and_prices_every_listing() {
    let server = MockServer::start().await;
    mount_pages(&server).await;

    let start_url = format!("{}{SECTION_PATH}", server.uri());
    let mut sink = CollectingSink::default();
    let outcome = machine()
        .run(
            &client(),
            &mut sink,
            &start_url,
            "Acne",
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_success(), "traversal failed: {:?}", outcome.error);
    let summary = &outcome.summary;
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.total_pages, 2);
    assert_eq!(summary.items_seen, 5);
    assert_eq!(summary.items_accepted, 3);
    assert_eq!(summary.items_rejected, 2);
    assert_eq!(summary.items_failed, 0);
    assert!(!summary.cancelled);

    let scarf = &outcome.records[0];
    assert_eq!(scarf.sequence_index, 1);
    assert_eq!(scarf.title, "Canada Scarf");
    assert_eq!(scarf.original_price, 9800);
    assert_eq!(scarf.sale_price, 6120);
    assert_eq!(scarf.landed_cost, 6820, "shipping charged below the threshold");
    assert_eq!(scarf.selling_price, 7420);
    assert_eq!(
        scarf.product_url,
        "https://www.cettire.com/tw/products/acne-studios-canada-scarf-1"
    );

    let bag = &outcome.records[1];
    assert_eq!(bag.landed_cost, 12_000, "free shipping above the threshold");
    assert_eq!(bag.selling_price, 12_960);

    let belt = &outcome.records[2];
    assert_eq!(belt.sequence_index, 3);
    assert_eq!(belt.title, "Leather Belt");
    assert_eq!(belt.selling_price, 8_700);

    assert_eq!(sink.records, outcome.records);
    assert!(sink.diagnostics.is_empty());
}

#[tokio::test]
async fn traversal_retries_a_flaky_first_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SECTION_PATH))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_pages(&server).await;

    let start_url = format!("{}{SECTION_PATH}", server.uri());
    let mut sink = CollectingSink::default();
    let outcome = machine()
        .run(
            &client(),
            &mut sink,
            &start_url,
            "Acne",
            &CancellationToken::new(),
        )
        .await;

    assert!(outcome.is_success(), "traversal failed: {:?}", outcome.error);
    assert_eq!(outcome.summary.pages_visited, 2);
    assert_eq!(outcome.records.len(), 3);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 4, "three attempts for page 1, one for page 2");
}

#[tokio::test]
async fn traversal_of_unrecognised_markup_dumps_the_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SECTION_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>Access denied</body></html>"),
        )
        .mount(&server)
        .await;

    let start_url = format!("{}{SECTION_PATH}", server.uri());
    let mut sink = CollectingSink::default();
    let outcome = machine()
        .run(
            &client(),
            &mut sink,
            &start_url,
            "Acne",
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(
        outcome.error,
        Some(ScraperError::ElementNotFound { .. })
    ));
    assert_eq!(sink.diagnostics, vec![start_url]);
    assert!(outcome.records.is_empty());
}
