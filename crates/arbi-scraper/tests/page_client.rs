//! Integration tests for `PageClient` and `BankRateSource` against a local
//! `wiremock` server.

use rust_decimal::Decimal;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use arbi_scraper::{BankRateSource, PageClient, RetryPolicy, ScraperError};

const AUD: &str = "Australian Dollar (AUD)";

fn test_client() -> PageClient {
    PageClient::new(5, "arbi-test/0.1").expect("failed to build test PageClient")
}

fn no_delay(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay_ms: 0,
        exponential: false,
    }
}

// ---------------------------------------------------------------------------
// PageClient status mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_html_returns_body_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/sale"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>sale</html>"))
        .mount(&server)
        .await;

    let html = test_client()
        .get_html(&format!("{}/collections/sale", server.uri()))
        .await
        .unwrap();
    assert_eq!(html, "<html>sale</html>");
}

#[tokio::test]
async fn get_html_maps_404_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = test_client()
        .get_html(&format!("{}/collections/sale/nobody", server.uri()))
        .await
        .unwrap_err();
    assert!(
        matches!(err, ScraperError::NotFound { .. }),
        "expected NotFound, got: {err:?}"
    );
    assert!(!err.is_transient());
}

#[tokio::test]
async fn get_html_maps_429_to_rate_limited_with_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = test_client().get_html(&server.uri()).await.unwrap_err();
    match err {
        ScraperError::RateLimited {
            retry_after_secs, ..
        } => assert_eq!(retry_after_secs, 7),
        other => panic!("expected RateLimited, got: {other:?}"),
    }
}

#[tokio::test]
async fn get_html_maps_5xx_to_transient_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_client().get_html(&server.uri()).await.unwrap_err();
    assert!(matches!(
        err,
        ScraperError::UnexpectedStatus { status: 503, .. }
    ));
    assert!(err.is_transient());
}

// ---------------------------------------------------------------------------
// BankRateSource
// ---------------------------------------------------------------------------

#[tokio::test]
async fn exchange_rate_is_read_from_rate_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(include_str!("fixtures/bank_rates.html")),
        )
        .mount(&server)
        .await;

    let source = BankRateSource::new(
        test_client(),
        format!("{}/xrt", server.uri()),
        RetryPolicy::none(),
    );
    let rate = source.get_exchange_rate(AUD).await.unwrap();
    assert_eq!(rate.value(), Decimal::new(2135, 2));
}

#[tokio::test]
async fn exchange_rate_retries_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrt"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(include_str!("fixtures/bank_rates.html")),
        )
        .mount(&server)
        .await;

    let source = BankRateSource::new(test_client(), format!("{}/xrt", server.uri()), no_delay(2));
    let rate = source.get_exchange_rate(AUD).await.unwrap();
    assert_eq!(rate.value(), Decimal::new(2135, 2));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn exchange_rate_failure_is_never_replaced_by_a_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = BankRateSource::new(test_client(), format!("{}/xrt", server.uri()), no_delay(1));
    let err = source.get_exchange_rate(AUD).await.unwrap_err();
    assert!(
        matches!(err, ScraperError::ExchangeRateUnavailable { ref currency, .. } if currency == AUD),
        "expected ExchangeRateUnavailable, got: {err:?}"
    );
}
