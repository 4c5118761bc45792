//! Offer catalog.
//!
//! The engine only ever reads offers; ownership of the catalog sits with
//! the [`OfferBook`] collaborator. The in-memory book provided here backs
//! single-environment deployments and tests, and enforces the per-owner
//! active-offer cap with an O(1) counter rather than a scan.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use peerswap_core::{AccountId, AssetId, CurrencyCode, OfferId, Page, PageRequest, TradeLimits};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Longest permitted offer description, in bytes.
pub const MAX_OFFER_DESCRIPTION: usize = 280;

/// Errors raised by the offer catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OfferError {
    /// Description exceeds [`MAX_OFFER_DESCRIPTION`].
    #[error("offer description of {len} bytes exceeds maximum {max}")]
    DescriptionTooLong {
        /// Provided length.
        len: usize,
        /// Enforced maximum.
        max: usize,
    },

    /// Minimum amount above maximum, or zero.
    #[error("offer amount bounds [{min}, {max}] are invalid")]
    InvalidAmountBounds {
        /// Offer minimum.
        min: u128,
        /// Offer maximum.
        max: u128,
    },

    /// Owner is at the active-offer cap.
    #[error("account {owner} has {active} active offers, maximum is {max}")]
    LimitExceeded {
        /// Owner at the cap.
        owner: AccountId,
        /// Current active count.
        active: u64,
        /// Configured maximum.
        max: u64,
    },

    /// No offer with this identifier.
    #[error("offer {offer} not found")]
    NotFound {
        /// Unknown identifier.
        offer: OfferId,
    },

    /// Caller does not own the offer.
    #[error("account {account} does not own offer {offer}")]
    NotOwner {
        /// Offer being modified.
        offer: OfferId,
        /// Caller account.
        account: AccountId,
    },
}

/// Which side of the exchange the offer's owner takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferType {
    /// Owner buys the asset for fiat; a taker sells.
    Buy,
    /// Owner sells the asset for fiat; a taker buys.
    Sell,
}

/// Offer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferState {
    /// Accepting new trades.
    Active,
    /// Temporarily hidden; existing trades continue.
    Paused,
    /// Permanently retired.
    Archived,
}

impl OfferState {
    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferState::Active => "ACTIVE",
            OfferState::Paused => "PAUSED",
            OfferState::Archived => "ARCHIVED",
        }
    }
}

impl std::fmt::Display for OfferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A standing buy or sell proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Sequence-assigned identifier.
    pub id: OfferId,
    /// Account that published the offer.
    pub owner: AccountId,
    /// Side the owner takes.
    pub offer_type: OfferType,
    /// Fiat currency quoted.
    pub fiat_currency: CurrencyCode,
    /// Asset exchanged.
    pub asset: AssetId,
    /// Smallest tradable amount.
    pub min_amount: u128,
    /// Largest tradable amount.
    pub max_amount: u128,
    /// Price margin over the oracle quote, in basis points of the quote.
    /// 10_000 trades at the oracle price exactly.
    pub rate_bps: u32,
    /// Free-text terms, bounded by [`MAX_OFFER_DESCRIPTION`].
    pub description: String,
    /// Lifecycle state.
    pub state: OfferState,
}

/// Parameters for publishing a new offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferParams {
    /// Side the owner takes.
    pub offer_type: OfferType,
    /// Fiat currency quoted.
    pub fiat_currency: CurrencyCode,
    /// Asset exchanged.
    pub asset: AssetId,
    /// Smallest tradable amount.
    pub min_amount: u128,
    /// Largest tradable amount.
    pub max_amount: u128,
    /// Price margin in basis points of the oracle quote.
    pub rate_bps: u32,
    /// Free-text terms.
    pub description: String,
}

impl OfferParams {
    fn validate(&self) -> Result<(), OfferError> {
        if self.description.len() > MAX_OFFER_DESCRIPTION {
            return Err(OfferError::DescriptionTooLong {
                len: self.description.len(),
                max: MAX_OFFER_DESCRIPTION,
            });
        }
        if self.min_amount == 0 || self.min_amount > self.max_amount {
            return Err(OfferError::InvalidAmountBounds {
                min: self.min_amount,
                max: self.max_amount,
            });
        }
        Ok(())
    }
}

/// Read access to the offer catalog, the only access the engine needs.
pub trait OfferBook: Send + Sync {
    /// Look up an offer by identifier.
    fn offer(&self, id: OfferId) -> Option<Offer>;
}

/// In-memory offer catalog with per-owner counters and a paginated
/// owner query.
#[derive(Default)]
pub struct InMemoryOfferBook {
    offers: DashMap<OfferId, Offer>,
    by_owner: DashMap<AccountId, Vec<OfferId>>,
    active_counts: DashMap<AccountId, u64>,
    next_id: AtomicU64,
}

impl InMemoryOfferBook {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new offer in the `Active` state.
    ///
    /// # Errors
    ///
    /// Validation errors from the params, or [`OfferError::LimitExceeded`]
    /// when the owner is at `limits.max_active_offers`.
    pub fn publish(
        &self,
        owner: &AccountId,
        params: OfferParams,
        limits: &TradeLimits,
    ) -> Result<OfferId, OfferError> {
        params.validate()?;
        {
            let mut count = self.active_counts.entry(owner.clone()).or_insert(0);
            if *count >= u64::from(limits.max_active_offers) {
                return Err(OfferError::LimitExceeded {
                    owner: owner.clone(),
                    active: *count,
                    max: u64::from(limits.max_active_offers),
                });
            }
            *count += 1;
        }
        let id = OfferId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let offer = Offer {
            id,
            owner: owner.clone(),
            offer_type: params.offer_type,
            fiat_currency: params.fiat_currency,
            asset: params.asset,
            min_amount: params.min_amount,
            max_amount: params.max_amount,
            rate_bps: params.rate_bps,
            description: params.description,
            state: OfferState::Active,
        };
        self.offers.insert(id, offer);
        self.by_owner.entry(owner.clone()).or_default().push(id);
        info!(offer = %id, %owner, "offer published");
        Ok(id)
    }

    fn set_state(
        &self,
        id: OfferId,
        caller: &AccountId,
        to: OfferState,
    ) -> Result<(), OfferError> {
        let mut entry = self
            .offers
            .get_mut(&id)
            .ok_or(OfferError::NotFound { offer: id })?;
        if &entry.owner != caller {
            return Err(OfferError::NotOwner {
                offer: id,
                account: caller.clone(),
            });
        }
        let was_active = entry.state == OfferState::Active;
        entry.state = to;
        let is_active = to == OfferState::Active;
        drop(entry);
        if was_active != is_active {
            let mut count = self.active_counts.entry(caller.clone()).or_insert(0);
            if is_active {
                *count += 1;
            } else {
                *count = count.saturating_sub(1);
            }
        }
        Ok(())
    }

    /// Pause an active offer. Owner only.
    pub fn pause(&self, id: OfferId, caller: &AccountId) -> Result<(), OfferError> {
        self.set_state(id, caller, OfferState::Paused)
    }

    /// Reactivate a paused offer. Owner only.
    pub fn resume(&self, id: OfferId, caller: &AccountId) -> Result<(), OfferError> {
        self.set_state(id, caller, OfferState::Active)
    }

    /// Permanently retire an offer. Owner only.
    pub fn archive(&self, id: OfferId, caller: &AccountId) -> Result<(), OfferError> {
        self.set_state(id, caller, OfferState::Archived)
    }

    /// Active-offer count for an owner, maintained incrementally.
    pub fn active_count(&self, owner: &AccountId) -> u64 {
        self.active_counts.get(owner).map(|c| *c).unwrap_or(0)
    }

    /// Offers published by an owner, in publication order, paginated.
    /// Only the offers inside the requested window are cloned.
    pub fn offers_by_owner(&self, owner: &AccountId, request: PageRequest) -> Page<Offer> {
        let ids = self
            .by_owner
            .get(owner)
            .map(|v| v.clone())
            .unwrap_or_default();
        Page::from_index(&ids, request, |id| {
            self.offers.get(id).map(|o| o.clone())
        })
    }
}

impl OfferBook for InMemoryOfferBook {
    fn offer(&self, id: OfferId) -> Option<Offer> {
        self.offers.get(&id).map(|o| o.clone())
    }
}
