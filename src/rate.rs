//! Best-effort exchange-rate provider.
//!
//! Fetches a single currency-pair rate from a remote quote service and
//! remembers the last value that came back. `get_rate` never fails: any
//! fetch problem falls back to the cached rate, and only a provider that
//! has never succeeded returns `None`. There is no TTL; callers must treat
//! every returned value as possibly stale.

use std::collections::HashMap;
use std::time::Duration;

use log::{error, info, warn};
use serde::Deserialize;
use thiserror::Error;

const QUOTE_ENDPOINT: &str = "https://v6.exchangerate-api.com/v6";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum RateError {
    #[error("quote request failed: {0}")]
    Request(String),

    #[error("quote service reported failure: {0}")]
    ServiceFailure(String),

    #[error("target currency {0} missing from quote response")]
    MissingTarget(String),
}

/// Wire shape of the quote service's `latest/{base}` response.
#[derive(Debug, Deserialize)]
pub struct QuoteResponse {
    pub result: String,
    #[serde(default)]
    pub conversion_rates: HashMap<String, f64>,
    #[serde(rename = "error-type", default)]
    pub error_type: Option<String>,
}

/// Transport seam: fetches the raw quote document for a base currency.
pub trait QuoteFetcher {
    fn fetch(&self, base_currency: &str) -> Result<QuoteResponse, RateError>;
}

/// Production fetcher: blocking HTTP GET with a fixed timeout, JSON-decoded.
pub struct HttpQuoteFetcher {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl HttpQuoteFetcher {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key: api_key.into(),
        }
    }
}

impl QuoteFetcher for HttpQuoteFetcher {
    fn fetch(&self, base_currency: &str) -> Result<QuoteResponse, RateError> {
        let url = format!("{QUOTE_ENDPOINT}/{}/latest/{base_currency}", self.api_key);
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| RateError::Request(err.to_string()))?;
        response
            .json::<QuoteResponse>()
            .map_err(|err| RateError::Request(format!("decoding quote response: {err}")))
    }
}

/// Cache-of-one conversion-rate provider for a fixed currency pair.
pub struct ExchangeRateProvider<F = HttpQuoteFetcher> {
    fetcher: F,
    base_currency: String,
    target_currency: String,
    last_known_rate: Option<f64>,
}

impl ExchangeRateProvider<HttpQuoteFetcher> {
    /// USD to ARS over the live quote service.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_fetcher(HttpQuoteFetcher::new(api_key), "USD", "ARS")
    }
}

impl<F: QuoteFetcher> ExchangeRateProvider<F> {
    pub fn with_fetcher(fetcher: F, base_currency: &str, target_currency: &str) -> Self {
        Self {
            fetcher,
            base_currency: base_currency.to_string(),
            target_currency: target_currency.to_string(),
            last_known_rate: None,
        }
    }

    /// Current conversion rate, or the last known one when the fetch fails.
    /// `None` only before the first successful fetch ever.
    pub fn get_rate(&mut self) -> Option<f64> {
        match self.fetch_rate() {
            Ok(rate) => {
                info!(
                    "fetched {} to {} rate: {rate}",
                    self.base_currency, self.target_currency
                );
                self.last_known_rate = Some(rate);
                Some(rate)
            }
            Err(err) => match self.last_known_rate {
                Some(rate) => {
                    warn!("quote fetch failed ({err}); returning last known rate {rate}");
                    Some(rate)
                }
                None => {
                    error!("quote fetch failed ({err}) and no previous rate is known");
                    None
                }
            },
        }
    }

    fn fetch_rate(&self) -> Result<f64, RateError> {
        let response = self.fetcher.fetch(&self.base_currency)?;
        if response.result != "success" {
            let reason = response.error_type.unwrap_or(response.result);
            return Err(RateError::ServiceFailure(reason));
        }
        response
            .conversion_rates
            .get(&self.target_currency)
            .copied()
            .ok_or_else(|| RateError::MissingTarget(self.target_currency.clone()))
    }
}
