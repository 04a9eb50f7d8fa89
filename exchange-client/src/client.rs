use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use tracing::debug;

use crate::{
    currency::Currency,
    error::UpstreamError,
    rates::{RateSheet, RatesResponse},
};

pub const DEFAULT_BASE_URL: &str = "https://api.privatbank.ua/p24api/exchange_rates";

/// Anything that can produce the rate sheet for a calendar day.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self, date: NaiveDate) -> Result<RateSheet, UpstreamError>;
}

/// Upstream dates are written as `DD.MM.YYYY`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

#[derive(Debug, Clone)]
pub struct ExchangeClient {
    http: reqwest::Client,
    base_url: String,
    tracked: Vec<Currency>,
}

impl Default for ExchangeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tracked: Currency::DEFAULT_SET.to_vec(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Restricts the returned sheets to `currencies`.
    pub fn tracking(mut self, currencies: impl IntoIterator<Item = Currency>) -> Self {
        self.tracked = currencies.into_iter().collect();
        self
    }

    pub fn tracked(&self) -> &[Currency] {
        &self.tracked
    }

    pub fn url_for(&self, date: NaiveDate) -> String {
        format!("{}?date={}", self.base_url, format_date(date))
    }

    pub async fn fetch_rates(&self, date: NaiveDate) -> Result<RateSheet, UpstreamError> {
        let url = self.url_for(date);
        debug!(%url, "requesting exchange rates");

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(source) => return Err(UpstreamError::Transport { url, source }),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UpstreamError::Status { url, status });
        }

        let body: RatesResponse = match response.json().await {
            Ok(body) => body,
            Err(source) => return Err(UpstreamError::Decode { url, source }),
        };

        Ok(body.into_sheet(date, &self.tracked))
    }
}

#[async_trait]
impl RateSource for ExchangeClient {
    async fn fetch_rates(&self, date: NaiveDate) -> Result<RateSheet, UpstreamError> {
        ExchangeClient::fetch_rates(self, date).await
    }
}
