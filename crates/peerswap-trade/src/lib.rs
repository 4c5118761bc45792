//! # peerswap-trade — Trade Lifecycle State Machine
//!
//! The engine at the center of the workspace: creation, acceptance,
//! funding, fiat confirmation, settlement, cancellation, and the dispute
//! hooks the arbitration layer drives. Offers, prices, and profile
//! counters are collaborators behind traits; escrow custody is delegated
//! to `peerswap-escrow`.
//!
//! Every operation is an atomic unit. Validation runs first, the mutation
//! is applied to a candidate copy and invariant-checked, and only then
//! committed under the trade's map entry guard. Ledger interactions run
//! strictly after the commit.

pub mod engine;
pub mod error;
pub mod offer;
pub mod oracle;
pub mod profile;
pub mod state;

pub use engine::{DisputeWinner, Trade, TradeEngine, TradeEvent, MAX_CONTACT_LEN};
pub use error::TradeError;
pub use offer::{
    InMemoryOfferBook, Offer, OfferBook, OfferError, OfferParams, OfferState, OfferType,
    MAX_OFFER_DESCRIPTION,
};
pub use oracle::{FiatPrice, PriceError, PriceOracle, StaticOracle};
pub use profile::{InMemoryProfiles, ProfileCounters, ProfileDirectory, ProfileError};
pub use state::{ensure_transition, TradeState, TransitionRecord};
