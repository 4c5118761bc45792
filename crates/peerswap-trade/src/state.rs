//! Trade lifecycle states and the transition table.
//!
//! Every state change in the engine is checked against the adjacency table
//! in [`TradeState::valid_transitions`]; a pair not in the table is
//! rejected before any mutation happens. Terminal states have no outgoing
//! edges, which is what makes them terminal.

use peerswap_core::{AccountId, LogicalTime};
use serde::{Deserialize, Serialize};

use crate::error::TradeError;

/// Lifecycle state of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeState {
    /// Buyer-side request created against an offer; awaiting the seller.
    RequestCreated,
    /// Seller accepted the request; awaiting escrow funding.
    RequestAccepted,
    /// Seller funded escrow; awaiting the buyer's fiat payment.
    EscrowFunded,
    /// Buyer signalled the fiat payment was sent.
    FiatDeposited,
    /// Escrow paid out to the buyer. Terminal.
    EscrowReleased,
    /// A party opened a dispute; an arbitrator is bound.
    EscrowDisputed,
    /// The arbitrator ruled; settlement is in flight.
    DisputeResolved,
    /// Escrow returned to the seller. Terminal.
    EscrowRefunded,
    /// Request cancelled before funding, or expired. Terminal.
    RequestCancelled,
}

impl TradeState {
    /// Stable wire name for logs and serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeState::RequestCreated => "REQUEST_CREATED",
            TradeState::RequestAccepted => "REQUEST_ACCEPTED",
            TradeState::EscrowFunded => "ESCROW_FUNDED",
            TradeState::FiatDeposited => "FIAT_DEPOSITED",
            TradeState::EscrowReleased => "ESCROW_RELEASED",
            TradeState::EscrowDisputed => "ESCROW_DISPUTED",
            TradeState::DisputeResolved => "DISPUTE_RESOLVED",
            TradeState::EscrowRefunded => "ESCROW_REFUNDED",
            TradeState::RequestCancelled => "REQUEST_CANCELLED",
        }
    }

    /// Whether this state has no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// States a trade may move to from this state.
    pub fn valid_transitions(&self) -> &'static [TradeState] {
        match self {
            TradeState::RequestCreated => {
                &[TradeState::RequestAccepted, TradeState::RequestCancelled]
            }
            TradeState::RequestAccepted => {
                &[TradeState::EscrowFunded, TradeState::RequestCancelled]
            }
            TradeState::EscrowFunded => {
                &[TradeState::FiatDeposited, TradeState::EscrowRefunded]
            }
            TradeState::FiatDeposited => {
                &[TradeState::EscrowReleased, TradeState::EscrowDisputed]
            }
            TradeState::EscrowDisputed => &[TradeState::DisputeResolved],
            TradeState::DisputeResolved => {
                &[TradeState::EscrowReleased, TradeState::EscrowRefunded]
            }
            TradeState::EscrowReleased
            | TradeState::EscrowRefunded
            | TradeState::RequestCancelled => &[],
        }
    }

    /// Whether escrow has not yet been funded in this state.
    pub fn is_pre_funding(&self) -> bool {
        matches!(self, TradeState::RequestCreated | TradeState::RequestAccepted)
    }
}

impl std::fmt::Display for TradeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reject any from→to pair that is not an edge in the transition table.
pub fn ensure_transition(from: TradeState, to: TradeState) -> Result<(), TradeError> {
    if from.valid_transitions().contains(&to) {
        Ok(())
    } else {
        Err(TradeError::InvalidStateTransition { from, to })
    }
}

/// One entry in a trade's bounded transition history.
///
/// The creation entry records the initial state as both endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State before the transition.
    pub from: TradeState,
    /// State after the transition.
    pub to: TradeState,
    /// Account that triggered the transition.
    pub actor: AccountId,
    /// Logical time the transition was committed.
    pub at: LogicalTime,
}
