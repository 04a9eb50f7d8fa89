//! Client for the historical exchange-rate endpoint.
//!
//! - [`currency`] enumerates the currency codes the upstream publishes.
//! - [`rates`] holds the normalized per-date rate types and the wire format.
//! - [`client`] performs the HTTP request and exposes the [`RateSource`]
//!   seam used by the chat relay.
//! - [`error`] describes how an upstream call can fail.

pub mod client;
pub mod currency;
pub mod error;
pub mod rates;

pub use client::{DEFAULT_BASE_URL, ExchangeClient, RateSource, format_date};
pub use currency::{Currency, UnknownCurrency};
pub use error::UpstreamError;
pub use reqwest::StatusCode;
pub use rates::{ExchangeRate, RateSheet};
