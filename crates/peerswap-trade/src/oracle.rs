//! Price feed collaborator.
//!
//! The engine reads one quote per trade creation and locks the resulting
//! price onto the trade. A missing or stale quote is an error the engine
//! reports as-is; it never retries the feed.

use dashmap::DashMap;
use peerswap_core::CurrencyCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Price feed failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The feed carries no quote for this currency.
    #[error("no price available for {currency}")]
    Missing {
        /// Currency without a quote.
        currency: CurrencyCode,
    },

    /// The quote exists but is older than its staleness bound.
    #[error("price for {currency} is stale")]
    Stale {
        /// Currency with the stale quote.
        currency: CurrencyCode,
    },
}

/// One fiat quote. `price` carries 8 decimal places of precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatPrice {
    /// Price scaled by 10^8.
    pub price: u128,
    /// Set when the quote is past its freshness guarantee.
    pub stale: bool,
}

/// Read access to the fiat price feed.
pub trait PriceOracle: Send + Sync {
    /// Current quote for a fiat currency.
    ///
    /// # Errors
    ///
    /// [`PriceError::Missing`] when no quote exists. Staleness is
    /// reported in the returned [`FiatPrice`] and turned into
    /// [`PriceError::Stale`] by the caller that insists on freshness.
    fn fiat_price(&self, currency: &CurrencyCode) -> Result<FiatPrice, PriceError>;
}

/// Fixed-table oracle for single-environment deployments and tests.
#[derive(Debug, Default)]
pub struct StaticOracle {
    quotes: DashMap<CurrencyCode, FiatPrice>,
}

impl StaticOracle {
    /// Empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the quote for a currency.
    pub fn set_price(&self, currency: CurrencyCode, price: u128) {
        self.quotes.insert(currency, FiatPrice { price, stale: false });
    }

    /// Mark an existing quote stale.
    pub fn mark_stale(&self, currency: &CurrencyCode) {
        if let Some(mut quote) = self.quotes.get_mut(currency) {
            quote.stale = true;
        }
    }
}

impl PriceOracle for StaticOracle {
    fn fiat_price(&self, currency: &CurrencyCode) -> Result<FiatPrice, PriceError> {
        self.quotes
            .get(currency)
            .map(|q| *q)
            .ok_or_else(|| PriceError::Missing {
                currency: currency.clone(),
            })
    }
}
