use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::currency::Currency;

/// Buy and sell rate of one currency against the hryvnia on one date.
///
/// Rates are kept as the decimal text the upstream sent so nothing is lost
/// to float rounding on the way to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRate {
    pub currency: Currency,
    pub date: NaiveDate,
    pub buy: String,
    pub sell: String,
}

/// Rates published for one date, keyed by currency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateSheet {
    rates: BTreeMap<Currency, ExchangeRate>,
}

impl RateSheet {
    pub fn get(&self, currency: Currency) -> Option<&ExchangeRate> {
        self.rates.get(&currency)
    }

    pub fn contains(&self, currency: Currency) -> bool {
        self.rates.contains_key(&currency)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExchangeRate> {
        self.rates.values()
    }

    pub fn insert(&mut self, rate: ExchangeRate) {
        self.rates.insert(rate.currency, rate);
    }
}

impl FromIterator<ExchangeRate> for RateSheet {
    fn from_iter<T: IntoIterator<Item = ExchangeRate>>(iter: T) -> Self {
        let mut sheet = RateSheet::default();
        for rate in iter {
            sheet.insert(rate);
        }
        sheet
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RatesResponse {
    #[serde(default)]
    pub exchange_rate: Vec<RateEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RateEntry {
    pub currency: Option<String>,
    pub purchase_rate: Option<Value>,
    pub sale_rate: Option<Value>,
}

impl RatesResponse {
    /// Keeps the entries for `tracked` currencies that carry both rates.
    pub(crate) fn into_sheet(self, date: NaiveDate, tracked: &[Currency]) -> RateSheet {
        self.exchange_rate
            .into_iter()
            .filter_map(|entry| entry.into_rate(date, tracked))
            .collect()
    }
}

impl RateEntry {
    fn into_rate(self, date: NaiveDate, tracked: &[Currency]) -> Option<ExchangeRate> {
        let currency: Currency = self.currency?.parse().ok()?;
        if !tracked.contains(&currency) {
            return None;
        }

        Some(ExchangeRate {
            currency,
            date,
            buy: decimal_text(self.purchase_rate?)?,
            sell: decimal_text(self.sale_rate?)?,
        })
    }
}

fn decimal_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
