//! Arbitration-layer errors.

use peerswap_core::{CurrencyCode, TradeId};
use peerswap_trade::TradeError;
use thiserror::Error;

/// Errors raised by the arbitration desk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationError {
    /// No trade exists with this identifier.
    #[error("trade {trade} not found")]
    TradeNotFound {
        /// Unknown identifier.
        trade: TradeId,
    },

    /// No registered arbitrator covers this currency, excluding the
    /// trade's own parties.
    #[error("no eligible arbitrator for {currency}")]
    NoEligibleArbitrator {
        /// Currency without coverage.
        currency: CurrencyCode,
    },

    /// No open dispute case exists for this trade.
    #[error("trade {trade} has no open dispute")]
    NoOpenDispute {
        /// Trade without a dispute case.
        trade: TradeId,
    },

    /// Engine-level failure while driving the trade state machine.
    #[error(transparent)]
    Trade(#[from] TradeError),
}
