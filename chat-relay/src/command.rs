use std::sync::Arc;

use chrono::{Days, Local, NaiveDate};
use exchange_client::{Currency, RateSheet, RateSource, UpstreamError, format_date};
use thiserror::Error;
use tracing::{debug, warn};

use crate::registry::Membership;

pub const EXCHANGE_KEYWORD: &str = "exchange";

/// Marker shown for a currency the upstream did not publish on a date.
pub const NOT_AVAILABLE: &str = "N/A";

/// Currencies rendered in the chat report, in display order.
const REPORTED: [Currency; 2] = Currency::DEFAULT_SET;

/// How an inbound chat frame should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'a> {
    Exchange { argument: &'a str },
    Chat,
}

impl<'a> Inbound<'a> {
    /// Only the exact two-token form `exchange <arg>` is a command.
    pub fn classify(text: &'a str) -> Self {
        let mut tokens = text.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(EXCHANGE_KEYWORD), Some(argument), None) => Inbound::Exchange { argument },
            _ => Inbound::Chat,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid argument. Please provide a positive number of days for exchange history.")]
    NotANumber,
    #[error("Please provide a positive number of days for exchange history.")]
    NotPositive,
    #[error("Too many days requested. Please provide a smaller number of days for exchange history.")]
    TooLarge,
}

#[derive(Debug)]
pub enum CommandOutcome {
    Reported { days: u32 },
    Rejected(ValidationError),
    Upstream(UpstreamError),
}

/// Handler for `exchange <N>`: validates the argument, collects N days of
/// rates and replies to the requesting connection only.
pub struct ExchangeCommand {
    source: Arc<dyn RateSource>,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl ExchangeCommand {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self {
            source,
            today: local_today,
        }
    }

    /// Overrides the calendar used to pick the first reported date.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn parse_days(argument: &str) -> Result<u32, ValidationError> {
        if argument.is_empty() || !argument.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(ValidationError::NotANumber);
        }
        match argument.parse::<u32>() {
            Ok(0) => Err(ValidationError::NotPositive),
            Ok(days) => Ok(days),
            Err(_) => Err(ValidationError::TooLarge),
        }
    }

    /// Today and the `days - 1` calendar days before it, newest first.
    pub fn dates(&self, days: u32) -> impl Iterator<Item = NaiveDate> {
        let today = (self.today)();
        (0..u64::from(days)).map_while(move |offset| today.checked_sub_days(Days::new(offset)))
    }

    /// Renders the report for `days` days. Any failed date aborts the whole
    /// report.
    pub async fn history(&self, days: u32) -> Result<String, UpstreamError> {
        let mut paragraphs = Vec::new();
        for date in self.dates(days) {
            let sheet = self.source.fetch_rates(date).await?;
            paragraphs.push(render_day(date, &sheet));
        }
        Ok(paragraphs.join("\n"))
    }

    /// Parses the argument, replying privately when it is rejected.
    pub fn validate(&self, member: &Membership, argument: &str) -> Result<u32, ValidationError> {
        Self::parse_days(argument).inspect_err(|err| deliver(member, err.to_string()))
    }

    /// Looks up `days` days of rates and replies privately with the report
    /// or the upstream failure.
    pub async fn run(&self, member: &Membership, days: u32) -> CommandOutcome {
        match self.history(days).await {
            Ok(report) => {
                deliver(member, report);
                CommandOutcome::Reported { days }
            }
            Err(err) => {
                warn!(name = %member.name(), url = err.url(), error = %err, "exchange lookup failed");
                deliver(member, format!("Failed to fetch exchange rates: {err}"));
                CommandOutcome::Upstream(err)
            }
        }
    }
}

fn deliver(member: &Membership, text: String) {
    if let Err(err) = member.reply(text) {
        debug!(?err, "failed to deliver command reply");
    }
}

pub fn render_day(date: NaiveDate, sheet: &RateSheet) -> String {
    let mut paragraph = format!("Exchange rate for {}:\n", format_date(date));
    for currency in REPORTED {
        let (buy, sell) = sheet
            .get(currency)
            .map(|rate| (rate.buy.as_str(), rate.sell.as_str()))
            .unwrap_or((NOT_AVAILABLE, NOT_AVAILABLE));
        paragraph.push_str(&format!(" {currency} to UAH - Buy: {buy}, Sell: {sell}\n"));
    }
    paragraph
}

#[cfg(test)]
mod tests {
    use exchange_client::ExchangeRate;

    use super::*;

    #[test]
    fn only_two_token_exchange_is_a_command() {
        assert_eq!(
            Inbound::classify("exchange 3"),
            Inbound::Exchange { argument: "3" }
        );
        assert_eq!(
            Inbound::classify("  exchange   abc "),
            Inbound::Exchange { argument: "abc" }
        );
        assert_eq!(Inbound::classify("exchange"), Inbound::Chat);
        assert_eq!(Inbound::classify("exchange 3 please"), Inbound::Chat);
        assert_eq!(Inbound::classify("exchanges 3"), Inbound::Chat);
        assert_eq!(Inbound::classify("Exchange 3"), Inbound::Chat);
        assert_eq!(Inbound::classify("hello there"), Inbound::Chat);
        assert_eq!(Inbound::classify(""), Inbound::Chat);
    }

    #[test]
    fn days_must_be_a_positive_decimal() {
        assert_eq!(ExchangeCommand::parse_days("3"), Ok(3));
        assert_eq!(ExchangeCommand::parse_days("007"), Ok(7));
        assert_eq!(
            ExchangeCommand::parse_days("abc"),
            Err(ValidationError::NotANumber)
        );
        assert_eq!(
            ExchangeCommand::parse_days("-1"),
            Err(ValidationError::NotANumber)
        );
        assert_eq!(
            ExchangeCommand::parse_days("+2"),
            Err(ValidationError::NotANumber)
        );
        assert_eq!(
            ExchangeCommand::parse_days("0"),
            Err(ValidationError::NotPositive)
        );
        assert_eq!(
            ExchangeCommand::parse_days("99999999999999999999"),
            Err(ValidationError::TooLarge)
        );
    }

    #[test]
    fn day_report_marks_missing_currencies() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
        let sheet: RateSheet = [ExchangeRate {
            currency: Currency::Usd,
            date,
            buy: "36.0".into(),
            sell: "36.5".into(),
        }]
        .into_iter()
        .collect();

        assert_eq!(
            render_day(date, &sheet),
            "Exchange rate for 01.03.2024:\n USD to UAH - Buy: 36.0, Sell: 36.5\n EUR to UAH - Buy: N/A, Sell: N/A\n"
        );
    }
}
