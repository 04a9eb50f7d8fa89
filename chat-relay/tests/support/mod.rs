#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chat_relay::{
    audit::AuditLog,
    command::ExchangeCommand,
    engine::Engine,
    registry::{ConnectionHandle, Membership, Registry},
};
use chrono::{Datelike, NaiveDate};
use exchange_client::{
    Currency, ExchangeRate, RateSheet, RateSource, StatusCode, UpstreamError, format_date,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date")
}

/// Serves USD on every date, EUR only on even days, and fails on the dates
/// it is told to. A stalling source never answers.
#[derive(Default)]
pub struct ScriptedRates {
    calls: Mutex<Vec<NaiveDate>>,
    failing: Vec<NaiveDate>,
    stall: bool,
}

impl ScriptedRates {
    pub fn failing_on(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            failing: dates.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn stalling() -> Self {
        Self {
            stall: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<NaiveDate> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl RateSource for ScriptedRates {
    async fn fetch_rates(&self, date: NaiveDate) -> Result<RateSheet, UpstreamError> {
        self.calls.lock().expect("calls lock").push(date);
        if self.stall {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&date) {
            return Err(UpstreamError::Status {
                url: format!("http://upstream.test/exchange_rates?date={}", format_date(date)),
                status: StatusCode::BAD_GATEWAY,
            });
        }

        let mut sheet = RateSheet::default();
        sheet.insert(ExchangeRate {
            currency: Currency::Usd,
            date,
            buy: "36.0".into(),
            sell: "36.5".into(),
        });
        if date.day() % 2 == 0 {
            sheet.insert(ExchangeRate {
                currency: Currency::Eur,
                date,
                buy: "40.0".into(),
                sell: "41.0".into(),
            });
        }
        Ok(sheet)
    }
}

pub struct Harness {
    pub engine: Arc<Engine>,
    pub rates: Arc<ScriptedRates>,
    pub audit_dir: TempDir,
}

impl Harness {
    pub fn new(rates: ScriptedRates) -> Self {
        let audit_dir = tempfile::tempdir().expect("tempdir");
        let rates = Arc::new(rates);
        let engine = Engine::new(
            Registry::new(),
            ExchangeCommand::new(rates.clone()).with_today(today),
            AuditLog::new(audit_dir.path().join("audit.log")),
        );

        Self {
            engine: Arc::new(engine),
            rates,
            audit_dir,
        }
    }

    pub fn join(&self, name: &str) -> (Membership, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = self.engine.registry();
        let handle = ConnectionHandle::new(registry.next_id(), None, tx);
        (registry.register_as(handle, name.to_string()), rx)
    }

    pub async fn audit_lines(&self) -> Vec<String> {
        match tokio::fs::read_to_string(self.audit_dir.path().join("audit.log")).await {
            Ok(contents) => contents.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}
