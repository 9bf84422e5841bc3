//! Spot exchange rates from the Bank of Taiwan rate table.

use arbi_core::ExchangeRate;
use rust_decimal::Decimal;
use scraper::Html;

use crate::client::PageClient;
use crate::error::ScraperError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::sites::{first_text, selector};

/// Fetches the bank's published rate table and reads one currency's
/// "Spot Selling" column.
#[derive(Debug, Clone)]
pub struct BankRateSource {
    client: PageClient,
    url: String,
    retry: RetryPolicy,
}

impl BankRateSource {
    #[must_use]
    pub fn new(client: PageClient, url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            url: url.into(),
            retry,
        }
    }

    /// Current spot selling rate for `currency`, a row label such as
    /// `"Australian Dollar (AUD)"`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::ExchangeRateUnavailable`] when the table cannot
    /// be fetched or has no usable rate for `currency`. No fallback rate is
    /// ever substituted.
    pub async fn get_exchange_rate(&self, currency: &str) -> Result<ExchangeRate, ScraperError> {
        let html = retry_with_backoff(self.retry, || self.client.get_html(&self.url))
            .await
            .map_err(|e| ScraperError::ExchangeRateUnavailable {
                currency: currency.to_owned(),
                reason: e.to_string(),
            })?;

        let rate = parse_spot_selling_rate(&html, currency)?;
        tracing::info!(currency, %rate, "fetched spot selling rate");
        Ok(rate)
    }
}

/// Reads the "Spot Selling" rate of `currency` from the rate-table HTML.
///
/// # Errors
///
/// Returns [`ScraperError::ExchangeRateUnavailable`] when the currency row is
/// missing or its rate is not a positive number (the bank shows `-` for
/// currencies it does not trade spot).
pub fn parse_spot_selling_rate(html: &str, currency: &str) -> Result<ExchangeRate, ScraperError> {
    let row_sel = selector("tbody tr")?;
    let name_sel = selector("td.currency div.visible-phone.print_hide")?;
    let rate_sel = selector(r#"td[data-table="Spot Selling"]"#)?;

    let unavailable = |reason: String| ScraperError::ExchangeRateUnavailable {
        currency: currency.to_owned(),
        reason,
    };

    let document = Html::parse_document(html);
    let row = document
        .select(&row_sel)
        .find(|row| first_text(*row, &name_sel).as_deref() == Some(currency))
        .ok_or_else(|| unavailable("currency not listed in rate table".to_owned()))?;

    let raw = first_text(row, &rate_sel)
        .ok_or_else(|| unavailable("row has no spot selling column".to_owned()))?;
    let value = raw
        .parse::<Decimal>()
        .map_err(|_| unavailable(format!("spot selling rate {raw:?} is not a number")))?;

    ExchangeRate::new(value).map_err(|e| unavailable(e.to_string()))
}
