//! Error taxonomy for trade operations.
//!
//! Kinds map onto the engine-wide classes: validation (bad shape or
//! range), authorization (wrong caller role), state (illegal transition or
//! stale view), resource limits, price feed, and arithmetic. Every error
//! aborts the whole operation; there is no partial commit to report.

use peerswap_core::{AccountId, LogicalTime, OfferId, PageError, TradeId};
use peerswap_escrow::EscrowError;
use thiserror::Error;

use crate::offer::{OfferError, OfferState};
use crate::oracle::PriceError;
use crate::state::TradeState;

/// Errors raised by the trade state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TradeError {
    /// No trade exists with this identifier.
    #[error("trade {trade} not found")]
    NotFound {
        /// Unknown identifier.
        trade: TradeId,
    },

    /// The requested from→to pair is not in the transition table.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state.
        from: TradeState,
        /// Requested state.
        to: TradeState,
    },

    /// The caller does not hold the role this operation requires.
    #[error("account {account} is not the {required} of trade {trade}")]
    Unauthorized {
        /// Trade being operated on.
        trade: TradeId,
        /// Caller account.
        account: AccountId,
        /// Role required for the operation.
        required: &'static str,
    },

    /// The referenced offer is not accepting trades.
    #[error("offer {offer} is {state}, not active")]
    OfferNotActive {
        /// Referenced offer.
        offer: OfferId,
        /// Its current lifecycle state.
        state: OfferState,
    },

    /// A party attempted to trade against their own offer.
    #[error("offer {offer} cannot be traded by its own owner")]
    SelfTrade {
        /// Offer owned by the caller.
        offer: OfferId,
    },

    /// Amount outside the offer's or the protocol's bounds.
    #[error("amount {amount} outside allowed range [{min}, {max}]")]
    InvalidAmountRange {
        /// Requested amount.
        amount: u128,
        /// Lower bound in force.
        min: u128,
        /// Upper bound in force.
        max: u128,
    },

    /// A contact string exceeds the protocol bound.
    #[error("contact string of {len} bytes exceeds maximum {max}")]
    ContactTooLong {
        /// Provided length.
        len: usize,
        /// Enforced maximum.
        max: usize,
    },

    /// A per-user cap was reached.
    #[error("account {account} has {active} active trades, maximum is {max}")]
    LimitExceeded {
        /// Account at the cap.
        account: AccountId,
        /// Current active count.
        active: u64,
        /// Configured maximum.
        max: u64,
    },

    /// Trading is globally paused.
    #[error("trading is paused")]
    SystemPaused,

    /// The trade's deadline passed before the operation arrived.
    #[error("trade {trade} expired at {deadline} (now {now})")]
    Expired {
        /// Expired trade.
        trade: TradeId,
        /// Stored deadline.
        deadline: LogicalTime,
        /// Observation time.
        now: LogicalTime,
    },

    /// The seller refund window has not opened yet.
    #[error("trade {trade} cannot be refunded before expiry at {deadline} (now {now})")]
    RefundTooEarly {
        /// Trade being refunded.
        trade: TradeId,
        /// Expiry that opens the refund window.
        deadline: LogicalTime,
        /// Observation time.
        now: LogicalTime,
    },

    /// A checked arithmetic step overflowed.
    #[error("arithmetic overflow computing {context}")]
    Arithmetic {
        /// What was being computed.
        context: &'static str,
    },

    /// Post-mutation invariant re-check failed; the operation was aborted.
    #[error("trade {trade} invariant violated: {detail}")]
    InvariantViolated {
        /// Trade whose candidate mutation was rejected.
        trade: TradeId,
        /// The invariant that failed.
        detail: &'static str,
    },

    /// Escrow-layer failure.
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    /// Offer-layer failure.
    #[error(transparent)]
    Offer(#[from] OfferError),

    /// Price-feed failure; never retried internally.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// Pagination bound violated.
    #[error(transparent)]
    Page(#[from] PageError),
}
