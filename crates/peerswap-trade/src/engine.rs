//! The trade lifecycle engine.
//!
//! Every public operation is one atomic unit: validate under the trade's
//! map entry guard, mutate a candidate copy, re-check trade invariants,
//! and only then commit. Operations that settle escrow commit the state
//! transition first and interact with the ledger after, so a failing
//! outbound transfer can never unwind a committed state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use peerswap_core::{
    config::BPS_DENOMINATOR, AccountId, AssetId, CurrencyCode, LogicalTime, OfferId, Page,
    PageRequest, ProtocolConfig, TradeId, TransitionLog,
};
use peerswap_escrow::{EscrowError, EscrowLedger, SettlementReceipt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::TradeError;
use crate::offer::{Offer, OfferBook, OfferState, OfferType};
use crate::oracle::PriceOracle;
use crate::profile::ProfileDirectory;
use crate::state::{ensure_transition, TradeState, TransitionRecord};

/// Longest permitted contact string, in bytes.
pub const MAX_CONTACT_LEN: usize = 140;

/// One negotiated exchange between a buyer and a seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Sequence-assigned identifier, immutable.
    pub id: TradeId,
    /// Offer this trade was created against.
    pub offer: OfferId,
    /// Party receiving the asset.
    pub buyer: AccountId,
    /// Party custodying the asset and receiving fiat.
    pub seller: AccountId,
    /// Neutral party, bound only when a dispute opens.
    pub arbitrator: Option<AccountId>,
    /// Asset under escrow.
    pub asset: AssetId,
    /// Fiat currency of the off-chain leg.
    pub fiat_currency: CurrencyCode,
    /// Asset amount exchanged.
    pub amount: u128,
    /// Fiat price locked from the oracle at creation, 8 decimals.
    pub locked_price: u128,
    /// Lifecycle state.
    pub state: TradeState,
    /// Creation instant.
    pub created_at: LogicalTime,
    /// Deadline for the pre-settlement phases.
    pub expires_at: LogicalTime,
    /// Deadline stamped when a dispute opens; informational.
    pub dispute_deadline: Option<LogicalTime>,
    /// Buyer's payment contact, bounded by [`MAX_CONTACT_LEN`].
    pub buyer_contact: String,
    /// Seller's payment contact, set at acceptance.
    pub seller_contact: Option<String>,
    /// Bounded ring buffer of recent transitions.
    pub history: TransitionLog<TransitionRecord>,
}

/// Structured record of a committed transition, for off-chain observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Trade that transitioned.
    pub trade: TradeId,
    /// State before.
    pub from: TradeState,
    /// State after.
    pub to: TradeState,
    /// Account that triggered the transition.
    pub actor: AccountId,
    /// Commit instant.
    pub at: LogicalTime,
}

/// Ruling of a settled dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeWinner {
    /// Escrow is released to the buyer, arbitrator fee charged.
    Buyer,
    /// Escrow is refunded to the seller, arbitrator fee charged.
    Seller,
}

/// The trade state machine. Owns trade records and drives the escrow
/// ledger; reads offers, prices, and profile counters from collaborators.
pub struct TradeEngine {
    trades: DashMap<TradeId, Trade>,
    by_user: DashMap<AccountId, Vec<TradeId>>,
    next_id: AtomicU64,
    offers: Arc<dyn OfferBook>,
    oracle: Arc<dyn PriceOracle>,
    profiles: Arc<dyn ProfileDirectory>,
    escrow: Arc<EscrowLedger>,
}

impl TradeEngine {
    /// New engine wired to its collaborators.
    pub fn new(
        offers: Arc<dyn OfferBook>,
        oracle: Arc<dyn PriceOracle>,
        profiles: Arc<dyn ProfileDirectory>,
        escrow: Arc<EscrowLedger>,
    ) -> Self {
        Self {
            trades: DashMap::new(),
            by_user: DashMap::new(),
            next_id: AtomicU64::new(0),
            offers,
            oracle,
            profiles,
            escrow,
        }
    }

    /// The escrow ledger this engine drives.
    pub fn escrow(&self) -> &Arc<EscrowLedger> {
        &self.escrow
    }

    // ── Queries ──

    /// Snapshot of a trade.
    pub fn trade(&self, id: TradeId) -> Option<Trade> {
        self.trades.get(&id).map(|t| t.clone())
    }

    /// Trades a user participates in, in creation order, paginated.
    /// Only the trades inside the requested window are cloned.
    pub fn trades_by_user(&self, user: &AccountId, request: PageRequest) -> Page<Trade> {
        let ids = self
            .by_user
            .get(user)
            .map(|v| v.clone())
            .unwrap_or_default();
        Page::from_index(&ids, request, |id| {
            self.trades.get(id).map(|t| t.clone())
        })
    }

    // ── Internals ──

    fn check_contact(contact: &str) -> Result<(), TradeError> {
        if contact.len() > MAX_CONTACT_LEN {
            return Err(TradeError::ContactTooLong {
                len: contact.len(),
                max: MAX_CONTACT_LEN,
            });
        }
        Ok(())
    }

    /// Trade-level invariants, re-checked on a candidate after every
    /// mutation and before the commit. States that have just been
    /// committed for settlement still hold the full balance because the
    /// ledger interaction runs after the commit.
    fn verify_invariants(&self, trade: &Trade, now: LogicalTime) -> Result<(), TradeError> {
        if trade.amount == 0 {
            return Err(TradeError::InvariantViolated {
                trade: trade.id,
                detail: "amount must be positive",
            });
        }
        let balance = self.escrow.balance_of(trade.id);
        let expected = match trade.state {
            TradeState::RequestCreated
            | TradeState::RequestAccepted
            | TradeState::RequestCancelled => 0,
            _ => trade.amount,
        };
        if balance != expected {
            return Err(TradeError::InvariantViolated {
                trade: trade.id,
                detail: "escrow balance inconsistent with state",
            });
        }
        if trade.state.is_pre_funding() && now.is_past(trade.expires_at) {
            return Err(TradeError::InvariantViolated {
                trade: trade.id,
                detail: "pre-funding state past expiry",
            });
        }
        Ok(())
    }

    fn apply_transition(
        trade: &mut Trade,
        to: TradeState,
        actor: &AccountId,
        now: LogicalTime,
    ) -> Result<TradeEvent, TradeError> {
        ensure_transition(trade.state, to)?;
        let from = trade.state;
        trade.state = to;
        trade.history.record(TransitionRecord {
            from,
            to,
            actor: actor.clone(),
            at: now,
        });
        Ok(TradeEvent {
            trade: trade.id,
            from,
            to,
            actor: actor.clone(),
            at: now,
        })
    }

    /// If a pre-funding trade is past expiry, commit the cancellation and
    /// report the expiry to the caller. The terminal state is durable even
    /// though the triggering operation fails.
    fn observe_expiry(
        &self,
        entry: &mut Trade,
        actor: &AccountId,
        now: LogicalTime,
    ) -> Result<(), TradeError> {
        if !(entry.state.is_pre_funding() && now.is_past(entry.expires_at)) {
            return Ok(());
        }
        let mut candidate = entry.clone();
        let event =
            Self::apply_transition(&mut candidate, TradeState::RequestCancelled, actor, now)?;
        *entry = candidate;
        self.close_for_parties(entry, false);
        info!(trade = %event.trade, from = %event.from, "expired trade cancelled");
        Err(TradeError::Expired {
            trade: entry.id,
            deadline: entry.expires_at,
            now,
        })
    }

    fn notify_opened(&self, user: &AccountId) {
        if let Err(err) = self.profiles.record_trade_opened(user) {
            warn!(%user, %err, "profile open notification failed");
        }
    }

    fn close_for_parties(&self, trade: &Trade, completed: bool) {
        for user in [&trade.buyer, &trade.seller] {
            if let Err(err) = self.profiles.record_trade_closed(user, completed) {
                warn!(%user, %err, "profile close notification failed");
            }
        }
    }

    fn lock_price(quote_price: u128, rate_bps: u32) -> Result<u128, TradeError> {
        quote_price
            .checked_mul(u128::from(rate_bps))
            .map(|scaled| scaled / u128::from(BPS_DENOMINATOR))
            .ok_or(TradeError::Arithmetic {
                context: "locked price",
            })
    }

    fn active_offer(&self, id: OfferId) -> Result<Offer, TradeError> {
        let offer = self
            .offers
            .offer(id)
            .ok_or(crate::offer::OfferError::NotFound { offer: id })?;
        if offer.state != OfferState::Active {
            return Err(TradeError::OfferNotActive {
                offer: id,
                state: offer.state,
            });
        }
        Ok(offer)
    }

    // ── Operations ──

    /// Create a trade against an active offer. The caller takes the side
    /// opposite the offer's owner.
    ///
    /// # Errors
    ///
    /// `SystemPaused`, `OfferNotActive`, `SelfTrade`, `ContactTooLong`,
    /// `InvalidAmountRange`, `LimitExceeded`, a `Price` error for a
    /// missing or stale quote, or `Arithmetic` on price overflow.
    pub fn create_trade(
        &self,
        caller: &AccountId,
        offer_id: OfferId,
        amount: u128,
        buyer_contact: String,
        config: &ProtocolConfig,
        now: LogicalTime,
    ) -> Result<Trade, TradeError> {
        if config.paused.trades {
            return Err(TradeError::SystemPaused);
        }
        let offer = self.active_offer(offer_id)?;
        if &offer.owner == caller {
            return Err(TradeError::SelfTrade { offer: offer_id });
        }
        Self::check_contact(&buyer_contact)?;

        let min = offer.min_amount.max(config.limits.min_trade_amount);
        let max = offer.max_amount.min(config.limits.max_trade_amount);
        if amount < min || amount > max {
            return Err(TradeError::InvalidAmountRange { amount, min, max });
        }

        let active = self.profiles.active_trades(caller);
        if active >= u64::from(config.limits.max_active_trades) {
            return Err(TradeError::LimitExceeded {
                account: caller.clone(),
                active,
                max: u64::from(config.limits.max_active_trades),
            });
        }

        let quote = self.oracle.fiat_price(&offer.fiat_currency)?;
        if quote.stale {
            return Err(crate::oracle::PriceError::Stale {
                currency: offer.fiat_currency.clone(),
            }
            .into());
        }
        let locked_price = Self::lock_price(quote.price, offer.rate_bps)?;

        let (buyer, seller) = match offer.offer_type {
            OfferType::Sell => (caller.clone(), offer.owner.clone()),
            OfferType::Buy => (offer.owner.clone(), caller.clone()),
        };

        let id = TradeId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut history = TransitionLog::default();
        history.record(TransitionRecord {
            from: TradeState::RequestCreated,
            to: TradeState::RequestCreated,
            actor: caller.clone(),
            at: now,
        });
        let trade = Trade {
            id,
            offer: offer_id,
            buyer: buyer.clone(),
            seller: seller.clone(),
            arbitrator: None,
            asset: offer.asset.clone(),
            fiat_currency: offer.fiat_currency.clone(),
            amount,
            locked_price,
            state: TradeState::RequestCreated,
            created_at: now,
            expires_at: now.plus(config.timers.trade_expiry_ticks),
            dispute_deadline: None,
            buyer_contact,
            seller_contact: None,
            history,
        };
        self.verify_invariants(&trade, now)?;

        self.trades.insert(id, trade.clone());
        for user in [&buyer, &seller] {
            self.by_user.entry(user.clone()).or_default().push(id);
            self.notify_opened(user);
        }
        info!(trade = %id, offer = %offer_id, %buyer, %seller, amount, "trade created");
        Ok(trade)
    }

    /// Seller accepts a created request.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, `ContactTooLong`, `Expired` for a
    /// request past its deadline, or `InvalidStateTransition`.
    pub fn accept_request(
        &self,
        caller: &AccountId,
        id: TradeId,
        seller_contact: String,
        now: LogicalTime,
    ) -> Result<TradeEvent, TradeError> {
        let mut entry = self
            .trades
            .get_mut(&id)
            .ok_or(TradeError::NotFound { trade: id })?;
        self.observe_expiry(&mut entry, caller, now)?;
        if caller != &entry.seller {
            return Err(TradeError::Unauthorized {
                trade: id,
                account: caller.clone(),
                required: "seller",
            });
        }
        Self::check_contact(&seller_contact)?;

        let mut candidate = entry.clone();
        let event =
            Self::apply_transition(&mut candidate, TradeState::RequestAccepted, caller, now)?;
        candidate.seller_contact = Some(seller_contact);
        self.verify_invariants(&candidate, now)?;
        *entry = candidate;
        info!(trade = %id, "request accepted");
        Ok(event)
    }

    /// Seller funds escrow for an accepted request. The ledger records
    /// custody before the state commit; both happen under the trade's
    /// entry guard, so the pair is atomic to other operations.
    ///
    /// # Errors
    ///
    /// `SystemPaused`, `NotFound`, `Unauthorized`, `Expired`, an
    /// `Escrow` error (`AlreadyFunded` on a repeated call with state and
    /// balance untouched), or `InvalidStateTransition`.
    pub fn fund_escrow(
        &self,
        caller: &AccountId,
        id: TradeId,
        config: &ProtocolConfig,
        now: LogicalTime,
    ) -> Result<TradeEvent, TradeError> {
        if config.paused.deposits {
            return Err(TradeError::SystemPaused);
        }
        let mut entry = self
            .trades
            .get_mut(&id)
            .ok_or(TradeError::NotFound { trade: id })?;
        self.observe_expiry(&mut entry, caller, now)?;
        if caller != &entry.seller {
            return Err(TradeError::Unauthorized {
                trade: id,
                account: caller.clone(),
                required: "seller",
            });
        }
        if self.escrow.is_funded(id) {
            return Err(EscrowError::AlreadyFunded { trade: id }.into());
        }

        let mut candidate = entry.clone();
        let event = Self::apply_transition(&mut candidate, TradeState::EscrowFunded, caller, now)?;
        let seller = candidate.seller.clone();
        self.escrow
            .deposit(id, candidate.asset.clone(), candidate.amount, &seller, caller)?;
        self.verify_invariants(&candidate, now)?;
        *entry = candidate;
        info!(trade = %id, "escrow funded");
        Ok(event)
    }

    /// Buyer signals the fiat payment was sent.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, or `InvalidStateTransition`.
    pub fn mark_fiat_deposited(
        &self,
        caller: &AccountId,
        id: TradeId,
        now: LogicalTime,
    ) -> Result<TradeEvent, TradeError> {
        let mut entry = self
            .trades
            .get_mut(&id)
            .ok_or(TradeError::NotFound { trade: id })?;
        if caller != &entry.buyer {
            return Err(TradeError::Unauthorized {
                trade: id,
                account: caller.clone(),
                required: "buyer",
            });
        }
        let mut candidate = entry.clone();
        let event = Self::apply_transition(&mut candidate, TradeState::FiatDeposited, caller, now)?;
        self.verify_invariants(&candidate, now)?;
        *entry = candidate;
        info!(trade = %id, "fiat deposit marked");
        Ok(event)
    }

    /// Seller releases escrow to the buyer after confirming fiat receipt.
    /// The fee split is preflighted, then the terminal state commits, then
    /// the ledger pays out.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, `InvalidStateTransition`, or an
    /// `Escrow` error; a fee-config error aborts with the trade still in
    /// `FiatDeposited`.
    pub fn release_escrow(
        &self,
        caller: &AccountId,
        id: TradeId,
        config: &ProtocolConfig,
        now: LogicalTime,
    ) -> Result<(TradeEvent, SettlementReceipt), TradeError> {
        let (event, buyer) = {
            let mut entry = self
                .trades
                .get_mut(&id)
                .ok_or(TradeError::NotFound { trade: id })?;
            if caller != &entry.seller {
                return Err(TradeError::Unauthorized {
                    trade: id,
                    account: caller.clone(),
                    required: "seller",
                });
            }
            let mut candidate = entry.clone();
            let event =
                Self::apply_transition(&mut candidate, TradeState::EscrowReleased, caller, now)?;
            self.verify_invariants(&candidate, now)?;
            // The fee split is checked against the custodied amount before
            // the terminal state commits. A bad config snapshot must leave
            // the trade in a state the ledger can still settle from.
            self.escrow.settlement_preflight(id, &config.fees, false)?;
            let buyer = candidate.buyer.clone();
            *entry = candidate;
            (event, buyer)
        };

        let receipt = self.escrow.release(id, &buyer, &config.fees, None)?;
        if let Some(trade) = self.trade(id) {
            self.close_for_parties(&trade, true);
        }
        info!(trade = %id, net = receipt.payout_amount, "escrow released");
        Ok((event, receipt))
    }

    /// Either party cancels a pre-funding request. No funds move.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, or `InvalidStateTransition` once the
    /// trade is funded or terminal.
    pub fn cancel_request(
        &self,
        caller: &AccountId,
        id: TradeId,
        now: LogicalTime,
    ) -> Result<TradeEvent, TradeError> {
        let mut entry = self
            .trades
            .get_mut(&id)
            .ok_or(TradeError::NotFound { trade: id })?;
        if caller != &entry.buyer && caller != &entry.seller {
            return Err(TradeError::Unauthorized {
                trade: id,
                account: caller.clone(),
                required: "buyer or seller",
            });
        }
        let mut candidate = entry.clone();
        let event =
            Self::apply_transition(&mut candidate, TradeState::RequestCancelled, caller, now)?;
        self.verify_invariants(&candidate, now)?;
        *entry = candidate;
        let trade = entry.clone();
        drop(entry);
        self.close_for_parties(&trade, false);
        info!(trade = %id, "request cancelled");
        Ok(event)
    }

    /// Seller reclaims escrow after the buyer failed to confirm fiat
    /// within the trade window. Only open once the trade is past expiry.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, `RefundTooEarly` inside the window,
    /// `InvalidStateTransition`, or an `Escrow` error.
    pub fn refund_escrow(
        &self,
        caller: &AccountId,
        id: TradeId,
        now: LogicalTime,
    ) -> Result<(TradeEvent, SettlementReceipt), TradeError> {
        let event = {
            let mut entry = self
                .trades
                .get_mut(&id)
                .ok_or(TradeError::NotFound { trade: id })?;
            if caller != &entry.seller {
                return Err(TradeError::Unauthorized {
                    trade: id,
                    account: caller.clone(),
                    required: "seller",
                });
            }
            if entry.state == TradeState::EscrowFunded && !now.is_past(entry.expires_at) {
                return Err(TradeError::RefundTooEarly {
                    trade: id,
                    deadline: entry.expires_at,
                    now,
                });
            }
            let mut candidate = entry.clone();
            let event =
                Self::apply_transition(&mut candidate, TradeState::EscrowRefunded, caller, now)?;
            self.verify_invariants(&candidate, now)?;
            *entry = candidate;
            event
        };

        let receipt = self.escrow.refund(id)?;
        if let Some(trade) = self.trade(id) {
            self.close_for_parties(&trade, false);
        }
        info!(trade = %id, amount = receipt.payout_amount, "escrow refunded to seller");
        Ok((event, receipt))
    }

    // ── Dispute mechanics, driven by the arbitration layer ──

    /// Open a dispute on a fiat-deposited trade, binding `arbitrator`.
    ///
    /// The arbitration layer selects the arbitrator; this operation
    /// verifies the caller is a party and the arbitrator is neutral.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized` for a non-party caller or a non-neutral
    /// arbitrator, or `InvalidStateTransition`.
    pub fn begin_dispute(
        &self,
        caller: &AccountId,
        id: TradeId,
        arbitrator: AccountId,
        config: &ProtocolConfig,
        now: LogicalTime,
    ) -> Result<TradeEvent, TradeError> {
        let mut entry = self
            .trades
            .get_mut(&id)
            .ok_or(TradeError::NotFound { trade: id })?;
        if caller != &entry.buyer && caller != &entry.seller {
            return Err(TradeError::Unauthorized {
                trade: id,
                account: caller.clone(),
                required: "buyer or seller",
            });
        }
        if arbitrator == entry.buyer || arbitrator == entry.seller {
            return Err(TradeError::Unauthorized {
                trade: id,
                account: arbitrator,
                required: "neutral arbitrator",
            });
        }
        let mut candidate = entry.clone();
        let event =
            Self::apply_transition(&mut candidate, TradeState::EscrowDisputed, caller, now)?;
        candidate.arbitrator = Some(arbitrator.clone());
        candidate.dispute_deadline = Some(now.plus(config.timers.dispute_window_ticks));
        self.verify_invariants(&candidate, now)?;
        *entry = candidate;
        info!(trade = %id, %arbitrator, "dispute opened");
        Ok(event)
    }

    /// Resolve a dispute: `DisputeResolved` then the terminal settlement
    /// state commit, after which the ledger settles with the arbitrator
    /// fee included. The fee split is preflighted before the commit.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized` for anyone but the bound arbitrator,
    /// `InvalidStateTransition`, or an `Escrow` error; a fee-config error
    /// aborts with the trade still in `EscrowDisputed`.
    pub fn resolve_dispute(
        &self,
        caller: &AccountId,
        id: TradeId,
        winner: DisputeWinner,
        config: &ProtocolConfig,
        now: LogicalTime,
    ) -> Result<(Vec<TradeEvent>, SettlementReceipt), TradeError> {
        let (events, buyer) = {
            let mut entry = self
                .trades
                .get_mut(&id)
                .ok_or(TradeError::NotFound { trade: id })?;
            if entry.arbitrator.as_ref() != Some(caller) {
                return Err(TradeError::Unauthorized {
                    trade: id,
                    account: caller.clone(),
                    required: "arbitrator",
                });
            }
            let terminal = match winner {
                DisputeWinner::Buyer => TradeState::EscrowReleased,
                DisputeWinner::Seller => TradeState::EscrowRefunded,
            };
            let mut candidate = entry.clone();
            let resolved =
                Self::apply_transition(&mut candidate, TradeState::DisputeResolved, caller, now)?;
            let settled = Self::apply_transition(&mut candidate, terminal, caller, now)?;
            self.verify_invariants(&candidate, now)?;
            // Both rulings charge the arbitrator component, so the preflight
            // covers them with the arbitrator fee included.
            self.escrow.settlement_preflight(id, &config.fees, true)?;
            let buyer = candidate.buyer.clone();
            *entry = candidate;
            (vec![resolved, settled], buyer)
        };

        // The guard is released; only the post-commit ledger interaction
        // remains. The caller is the bound arbitrator, checked above.
        let receipt = match winner {
            DisputeWinner::Buyer => self.escrow.release(id, &buyer, &config.fees, Some(caller))?,
            DisputeWinner::Seller => self.escrow.refund_disputed(id, &config.fees, caller)?,
        };
        if let Some(trade) = self.trade(id) {
            self.close_for_parties(&trade, matches!(winner, DisputeWinner::Buyer));
        }
        info!(trade = %id, winner = ?winner, "dispute resolved");
        Ok((events, receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::{InMemoryOfferBook, OfferParams};
    use crate::oracle::{PriceError, StaticOracle};
    use crate::profile::InMemoryProfiles;
    use peerswap_core::TradeLimits;
    use peerswap_escrow::{FeeAccounts, InMemoryTransfer};

    fn account(name: &str) -> AccountId {
        AccountId::new(name).unwrap()
    }

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD").unwrap()
    }

    fn native() -> AssetId {
        AssetId::new("peer/native").unwrap()
    }

    struct Harness {
        book: Arc<InMemoryOfferBook>,
        oracle: Arc<StaticOracle>,
        profiles: Arc<InMemoryProfiles>,
        backend: Arc<InMemoryTransfer>,
        engine: TradeEngine,
        config: ProtocolConfig,
    }

    impl Harness {
        fn new() -> Self {
            let book = Arc::new(InMemoryOfferBook::new());
            let oracle = Arc::new(StaticOracle::new());
            oracle.set_price(usd(), 5_000_000_000);
            let profiles = Arc::new(InMemoryProfiles::new());
            let backend = Arc::new(InMemoryTransfer::new());
            let escrow = Arc::new(EscrowLedger::new(
                FeeAccounts {
                    burn: account("feeburn"),
                    chain: account("feechain"),
                    warchest: account("warchest"),
                },
                backend.clone(),
            ));
            let engine = TradeEngine::new(
                book.clone(),
                oracle.clone(),
                profiles.clone(),
                escrow,
            );
            Self {
                book,
                oracle,
                profiles,
                backend,
                engine,
                config: ProtocolConfig::default(),
            }
        }

        fn publish_sell_offer(&self, owner: &str) -> OfferId {
            self.book
                .publish(
                    &account(owner),
                    OfferParams {
                        offer_type: OfferType::Sell,
                        fiat_currency: usd(),
                        asset: native(),
                        min_amount: 100,
                        max_amount: 1_000,
                        rate_bps: 10_000,
                        description: "bank transfer".to_string(),
                    },
                    &TradeLimits::default(),
                )
                .unwrap()
        }

        fn created_trade(&self) -> TradeId {
            let offer = self.publish_sell_offer("maker");
            self.engine
                .create_trade(
                    &account("taker"),
                    offer,
                    500,
                    "pay@taker".to_string(),
                    &self.config,
                    LogicalTime::new(0),
                )
                .unwrap()
                .id
        }

        fn funded_trade(&self) -> TradeId {
            let id = self.created_trade();
            self.engine
                .accept_request(&account("maker"), id, "acct 42".to_string(), LogicalTime::new(1))
                .unwrap();
            self.engine
                .fund_escrow(&account("maker"), id, &self.config, LogicalTime::new(2))
                .unwrap();
            id
        }

        fn fiat_deposited_trade(&self) -> TradeId {
            let id = self.funded_trade();
            self.engine
                .mark_fiat_deposited(&account("taker"), id, LogicalTime::new(3))
                .unwrap();
            id
        }

        fn disputed_trade(&self) -> TradeId {
            let id = self.fiat_deposited_trade();
            self.engine
                .begin_dispute(
                    &account("taker"),
                    id,
                    account("arbiter"),
                    &self.config,
                    LogicalTime::new(4),
                )
                .unwrap();
            id
        }

        fn state(&self, id: TradeId) -> TradeState {
            self.engine.trade(id).unwrap().state
        }
    }

    #[test]
    fn create_trade_within_offer_bounds() {
        let h = Harness::new();
        let offer = h.publish_sell_offer("maker");
        let trade = h
            .engine
            .create_trade(
                &account("taker"),
                offer,
                500,
                "pay@taker".to_string(),
                &h.config,
                LogicalTime::new(0),
            )
            .unwrap();
        assert_eq!(trade.state, TradeState::RequestCreated);
        assert_eq!(trade.amount, 500);
        assert_eq!(trade.buyer, account("taker"));
        assert_eq!(trade.seller, account("maker"));
        assert_eq!(trade.locked_price, 5_000_000_000);
        assert_eq!(trade.history.len(), 1);
    }

    #[test]
    fn buy_offer_reverses_roles() {
        let h = Harness::new();
        let offer = h
            .book
            .publish(
                &account("maker"),
                OfferParams {
                    offer_type: OfferType::Buy,
                    fiat_currency: usd(),
                    asset: native(),
                    min_amount: 100,
                    max_amount: 1_000,
                    rate_bps: 10_000,
                    description: String::new(),
                },
                &TradeLimits::default(),
            )
            .unwrap();
        let trade = h
            .engine
            .create_trade(
                &account("taker"),
                offer,
                500,
                "pay@maker".to_string(),
                &h.config,
                LogicalTime::new(0),
            )
            .unwrap();
        assert_eq!(trade.buyer, account("maker"));
        assert_eq!(trade.seller, account("taker"));
    }

    #[test]
    fn amount_outside_offer_bounds_rejected() {
        let h = Harness::new();
        let offer = h.publish_sell_offer("maker");
        for amount in [99, 1_001] {
            let err = h
                .engine
                .create_trade(
                    &account("taker"),
                    offer,
                    amount,
                    String::new(),
                    &h.config,
                    LogicalTime::new(0),
                )
                .unwrap_err();
            assert_eq!(
                err,
                TradeError::InvalidAmountRange {
                    amount,
                    min: 100,
                    max: 1_000
                }
            );
        }
    }

    #[test]
    fn paused_system_rejects_creation() {
        let h = Harness::new();
        let offer = h.publish_sell_offer("maker");
        let mut config = h.config;
        config.paused.trades = true;
        let err = h
            .engine
            .create_trade(
                &account("taker"),
                offer,
                500,
                String::new(),
                &config,
                LogicalTime::new(0),
            )
            .unwrap_err();
        assert_eq!(err, TradeError::SystemPaused);
    }

    #[test]
    fn paused_offer_rejects_creation() {
        let h = Harness::new();
        let offer = h.publish_sell_offer("maker");
        h.book.pause(offer, &account("maker")).unwrap();
        let err = h
            .engine
            .create_trade(
                &account("taker"),
                offer,
                500,
                String::new(),
                &h.config,
                LogicalTime::new(0),
            )
            .unwrap_err();
        assert!(matches!(err, TradeError::OfferNotActive { .. }));
    }

    #[test]
    fn owner_cannot_take_own_offer() {
        let h = Harness::new();
        let offer = h.publish_sell_offer("maker");
        let err = h
            .engine
            .create_trade(
                &account("maker"),
                offer,
                500,
                String::new(),
                &h.config,
                LogicalTime::new(0),
            )
            .unwrap_err();
        assert_eq!(err, TradeError::SelfTrade { offer });
    }

    #[test]
    fn stale_price_aborts_creation() {
        let h = Harness::new();
        let offer = h.publish_sell_offer("maker");
        h.oracle.mark_stale(&usd());
        let err = h
            .engine
            .create_trade(
                &account("taker"),
                offer,
                500,
                String::new(),
                &h.config,
                LogicalTime::new(0),
            )
            .unwrap_err();
        assert_eq!(err, TradeError::Price(PriceError::Stale { currency: usd() }));
    }

    #[test]
    fn active_trade_cap_enforced() {
        let h = Harness::new();
        let offer = h.publish_sell_offer("maker");
        let mut config = h.config;
        config.limits.max_active_trades = 1;
        h.engine
            .create_trade(
                &account("taker"),
                offer,
                500,
                String::new(),
                &config,
                LogicalTime::new(0),
            )
            .unwrap();
        let err = h
            .engine
            .create_trade(
                &account("taker"),
                offer,
                500,
                String::new(),
                &config,
                LogicalTime::new(1),
            )
            .unwrap_err();
        assert!(matches!(err, TradeError::LimitExceeded { active: 1, .. }));
    }

    #[test]
    fn contact_over_bound_rejected() {
        let h = Harness::new();
        let offer = h.publish_sell_offer("maker");
        let err = h
            .engine
            .create_trade(
                &account("taker"),
                offer,
                500,
                "x".repeat(MAX_CONTACT_LEN + 1),
                &h.config,
                LogicalTime::new(0),
            )
            .unwrap_err();
        assert!(matches!(err, TradeError::ContactTooLong { len: 141, .. }));
    }

    #[test]
    fn only_seller_accepts() {
        let h = Harness::new();
        let id = h.created_trade();
        let err = h
            .engine
            .accept_request(&account("taker"), id, String::new(), LogicalTime::new(1))
            .unwrap_err();
        assert!(matches!(
            err,
            TradeError::Unauthorized {
                required: "seller",
                ..
            }
        ));
        assert_eq!(h.state(id), TradeState::RequestCreated);
    }

    #[test]
    fn accept_then_fund_reaches_escrow_funded() {
        let h = Harness::new();
        let id = h.funded_trade();
        assert_eq!(h.state(id), TradeState::EscrowFunded);
        assert_eq!(h.engine.escrow().balance_of(id), 500);
    }

    #[test]
    fn second_fund_fails_with_already_funded() {
        let h = Harness::new();
        let id = h.funded_trade();
        let err = h
            .engine
            .fund_escrow(&account("maker"), id, &h.config, LogicalTime::new(3))
            .unwrap_err();
        assert_eq!(err, TradeError::Escrow(EscrowError::AlreadyFunded { trade: id }));
        assert_eq!(h.state(id), TradeState::EscrowFunded);
        assert_eq!(h.engine.escrow().balance_of(id), 500);
    }

    #[test]
    fn only_buyer_marks_fiat() {
        let h = Harness::new();
        let id = h.funded_trade();
        let err = h
            .engine
            .mark_fiat_deposited(&account("maker"), id, LogicalTime::new(3))
            .unwrap_err();
        assert!(matches!(
            err,
            TradeError::Unauthorized {
                required: "buyer",
                ..
            }
        ));
    }

    #[test]
    fn release_before_fiat_is_invalid_transition() {
        let h = Harness::new();
        let id = h.funded_trade();
        let err = h
            .engine
            .release_escrow(&account("maker"), id, &h.config, LogicalTime::new(3))
            .unwrap_err();
        assert_eq!(
            err,
            TradeError::InvalidStateTransition {
                from: TradeState::EscrowFunded,
                to: TradeState::EscrowReleased,
            }
        );
    }

    #[test]
    fn release_pays_buyer_minus_floored_fees() {
        let h = Harness::new();
        let id = h.fiat_deposited_trade();
        let (event, receipt) = h
            .engine
            .release_escrow(&account("maker"), id, &h.config, LogicalTime::new(4))
            .unwrap();
        assert_eq!(event.to, TradeState::EscrowReleased);
        // 1% + 0.5% + 1% of 500, each floored: 5 + 2 + 5.
        assert_eq!(receipt.fees.total(), 12);
        assert_eq!(receipt.payout_amount, 488);
        assert_eq!(h.backend.balance(&account("taker"), &native()), 488);
        assert_eq!(h.engine.escrow().balance_of(id), 0);
        assert_eq!(h.state(id), TradeState::EscrowReleased);
    }

    #[test]
    fn second_release_fails_without_double_pay() {
        let h = Harness::new();
        let id = h.fiat_deposited_trade();
        h.engine
            .release_escrow(&account("maker"), id, &h.config, LogicalTime::new(4))
            .unwrap();
        let err = h
            .engine
            .release_escrow(&account("maker"), id, &h.config, LogicalTime::new(5))
            .unwrap_err();
        assert!(matches!(err, TradeError::InvalidStateTransition { .. }));
        assert_eq!(h.backend.balance(&account("taker"), &native()), 488);
    }

    fn over_cap_config() -> ProtocolConfig {
        let mut config = ProtocolConfig::default();
        config.fees.burn_bps = 900;
        config.fees.warchest_bps = 300;
        config
    }

    #[test]
    fn bad_fee_config_aborts_release_without_state_change() {
        let h = Harness::new();
        let id = h.fiat_deposited_trade();
        let err = h
            .engine
            .release_escrow(&account("maker"), id, &over_cap_config(), LogicalTime::new(4))
            .unwrap_err();
        assert!(matches!(err, TradeError::Escrow(EscrowError::Fee(_))));
        // The trade must stay settleable: no terminal commit, no custody change.
        assert_eq!(h.state(id), TradeState::FiatDeposited);
        assert_eq!(h.engine.escrow().balance_of(id), 500);

        let (_, receipt) = h
            .engine
            .release_escrow(&account("maker"), id, &h.config, LogicalTime::new(5))
            .unwrap();
        assert_eq!(receipt.payout_amount, 488);
        assert_eq!(h.state(id), TradeState::EscrowReleased);
    }

    #[test]
    fn bad_fee_config_aborts_dispute_settlement_without_state_change() {
        let h = Harness::new();
        let id = h.disputed_trade();
        let err = h
            .engine
            .resolve_dispute(
                &account("arbiter"),
                id,
                DisputeWinner::Buyer,
                &over_cap_config(),
                LogicalTime::new(5),
            )
            .unwrap_err();
        assert!(matches!(err, TradeError::Escrow(EscrowError::Fee(_))));
        assert_eq!(h.state(id), TradeState::EscrowDisputed);
        assert_eq!(h.engine.escrow().balance_of(id), 500);

        let (events, receipt) = h
            .engine
            .resolve_dispute(
                &account("arbiter"),
                id,
                DisputeWinner::Buyer,
                &h.config,
                LogicalTime::new(6),
            )
            .unwrap();
        assert_eq!(events.last().map(|e| e.to), Some(TradeState::EscrowReleased));
        // 1% + 0.5% + 1% + 0.5% of 500, each floored: 5 + 2 + 5 + 2.
        assert_eq!(receipt.payout_amount, 486);
    }

    #[test]
    fn either_party_cancels_before_funding() {
        let h = Harness::new();
        let id = h.created_trade();
        h.engine
            .cancel_request(&account("taker"), id, LogicalTime::new(1))
            .unwrap();
        assert_eq!(h.state(id), TradeState::RequestCancelled);
        assert_eq!(h.profiles.active_trades(&account("taker")), 0);
    }

    #[test]
    fn outsider_cannot_cancel() {
        let h = Harness::new();
        let id = h.created_trade();
        let err = h
            .engine
            .cancel_request(&account("mallory"), id, LogicalTime::new(1))
            .unwrap_err();
        assert!(matches!(err, TradeError::Unauthorized { .. }));
    }

    #[test]
    fn cancel_after_funding_is_invalid() {
        let h = Harness::new();
        let id = h.funded_trade();
        let err = h
            .engine
            .cancel_request(&account("taker"), id, LogicalTime::new(3))
            .unwrap_err();
        assert_eq!(
            err,
            TradeError::InvalidStateTransition {
                from: TradeState::EscrowFunded,
                to: TradeState::RequestCancelled,
            }
        );
    }

    #[test]
    fn refund_gated_until_expiry() {
        let h = Harness::new();
        let id = h.funded_trade();
        let err = h
            .engine
            .refund_escrow(&account("maker"), id, LogicalTime::new(10))
            .unwrap_err();
        assert!(matches!(err, TradeError::RefundTooEarly { .. }));

        let after = LogicalTime::new(h.config.timers.trade_expiry_ticks + 1);
        let (event, receipt) = h.engine.refund_escrow(&account("maker"), id, after).unwrap();
        assert_eq!(event.to, TradeState::EscrowRefunded);
        assert_eq!(receipt.payout_amount, 500);
        assert_eq!(receipt.fees.total(), 0);
        assert_eq!(h.backend.balance(&account("maker"), &native()), 500);
    }

    #[test]
    fn expired_request_cancels_on_observation() {
        let h = Harness::new();
        let id = h.created_trade();
        let after = LogicalTime::new(h.config.timers.trade_expiry_ticks + 1);
        let err = h
            .engine
            .accept_request(&account("maker"), id, String::new(), after)
            .unwrap_err();
        assert!(matches!(err, TradeError::Expired { .. }));
        assert_eq!(h.state(id), TradeState::RequestCancelled);
        assert_eq!(h.profiles.active_trades(&account("taker")), 0);
    }

    #[test]
    fn dispute_binds_arbitrator_and_stamps_deadline() {
        let h = Harness::new();
        let id = h.disputed_trade();
        let trade = h.engine.trade(id).unwrap();
        assert_eq!(trade.state, TradeState::EscrowDisputed);
        assert_eq!(trade.arbitrator, Some(account("arbiter")));
        assert_eq!(
            trade.dispute_deadline,
            Some(LogicalTime::new(4).plus(h.config.timers.dispute_window_ticks))
        );
    }

    #[test]
    fn dispute_requires_party_caller_and_neutral_arbitrator() {
        let h = Harness::new();
        let id = h.fiat_deposited_trade();
        let err = h
            .engine
            .begin_dispute(
                &account("mallory"),
                id,
                account("arbiter"),
                &h.config,
                LogicalTime::new(4),
            )
            .unwrap_err();
        assert!(matches!(err, TradeError::Unauthorized { .. }));

        let err = h
            .engine
            .begin_dispute(
                &account("taker"),
                id,
                account("maker"),
                &h.config,
                LogicalTime::new(4),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TradeError::Unauthorized {
                required: "neutral arbitrator",
                ..
            }
        ));
    }

    #[test]
    fn dispute_before_fiat_is_invalid() {
        let h = Harness::new();
        let id = h.funded_trade();
        let err = h
            .engine
            .begin_dispute(
                &account("taker"),
                id,
                account("arbiter"),
                &h.config,
                LogicalTime::new(3),
            )
            .unwrap_err();
        assert!(matches!(err, TradeError::InvalidStateTransition { .. }));
    }

    #[test]
    fn seller_win_refunds_minus_arbitrator_fee() {
        let h = Harness::new();
        let id = h.disputed_trade();
        let (events, receipt) = h
            .engine
            .resolve_dispute(
                &account("arbiter"),
                id,
                DisputeWinner::Seller,
                &h.config,
                LogicalTime::new(5),
            )
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].to, TradeState::EscrowRefunded);
        assert_eq!(h.state(id), TradeState::EscrowRefunded);
        // 0.5% of 500 floors to 2 for the arbitrator.
        assert_eq!(receipt.fees.arbitrator, 2);
        assert_eq!(receipt.payout_amount, 498);
        assert_eq!(h.backend.balance(&account("maker"), &native()), 498);
        assert_eq!(h.backend.balance(&account("arbiter"), &native()), 2);
    }

    #[test]
    fn buyer_win_releases_with_arbitrator_fee() {
        let h = Harness::new();
        let id = h.disputed_trade();
        let (_, receipt) = h
            .engine
            .resolve_dispute(
                &account("arbiter"),
                id,
                DisputeWinner::Buyer,
                &h.config,
                LogicalTime::new(5),
            )
            .unwrap();
        assert_eq!(h.state(id), TradeState::EscrowReleased);
        // 5 + 2 + 5 protocol fees plus 2 for the arbitrator.
        assert_eq!(receipt.fees.total(), 14);
        assert_eq!(receipt.payout_amount, 486);
        assert_eq!(h.backend.balance(&account("taker"), &native()), 486);
    }

    #[test]
    fn only_bound_arbitrator_resolves() {
        let h = Harness::new();
        let id = h.disputed_trade();
        let err = h
            .engine
            .resolve_dispute(
                &account("maker"),
                id,
                DisputeWinner::Seller,
                &h.config,
                LogicalTime::new(5),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TradeError::Unauthorized {
                required: "arbitrator",
                ..
            }
        ));
        assert_eq!(h.state(id), TradeState::EscrowDisputed);
    }

    #[test]
    fn history_records_full_path() {
        let h = Harness::new();
        let id = h.fiat_deposited_trade();
        h.engine
            .release_escrow(&account("maker"), id, &h.config, LogicalTime::new(4))
            .unwrap();
        let trade = h.engine.trade(id).unwrap();
        let path: Vec<TradeState> = trade.history.entries().map(|r| r.to).collect();
        assert_eq!(
            path,
            vec![
                TradeState::RequestCreated,
                TradeState::RequestAccepted,
                TradeState::EscrowFunded,
                TradeState::FiatDeposited,
                TradeState::EscrowReleased,
            ]
        );
    }

    #[test]
    fn trades_by_user_paginates() {
        let h = Harness::new();
        let offer = h.publish_sell_offer("maker");
        for i in 0..3 {
            h.engine
                .create_trade(
                    &account("taker"),
                    offer,
                    500,
                    String::new(),
                    &h.config,
                    LogicalTime::new(i),
                )
                .unwrap();
        }
        let page = h
            .engine
            .trades_by_user(&account("taker"), PageRequest::new(2, 10).unwrap());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 3);
        let beyond = h
            .engine
            .trades_by_user(&account("taker"), PageRequest::new(3, 10).unwrap());
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 3);
    }

    #[test]
    fn unknown_trade_reports_not_found() {
        let h = Harness::new();
        let err = h
            .engine
            .accept_request(
                &account("maker"),
                TradeId::new(99),
                String::new(),
                LogicalTime::new(0),
            )
            .unwrap_err();
        assert_eq!(
            err,
            TradeError::NotFound {
                trade: TradeId::new(99)
            }
        );
    }
}
