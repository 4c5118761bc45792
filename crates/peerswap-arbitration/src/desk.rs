//! The arbitration desk.
//!
//! Opens disputes on fiat-deposited trades, selects and binds an
//! arbitrator from the pool, and drives the arbitrator's ruling through
//! the trade engine into escrow settlement.

use std::sync::Arc;

use dashmap::DashMap;
use peerswap_core::{AccountId, LogicalTime, ProtocolConfig, TradeId};
use peerswap_escrow::SettlementReceipt;
use peerswap_trade::{DisputeWinner, TradeEngine};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ArbitrationError;
use crate::pool::ArbitratorPool;
use crate::selection::{select_arbitrator, EntropySource};

/// Unique identifier of a dispute case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisputeId(Uuid);

impl DisputeId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for DisputeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dispute:{}", self.0)
    }
}

/// One open or resolved dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeCase {
    /// Case identifier.
    pub id: DisputeId,
    /// Disputed trade.
    pub trade: TradeId,
    /// Arbitrator bound to the case.
    pub arbitrator: AccountId,
    /// Party that opened the dispute.
    pub opened_by: AccountId,
    /// Opening instant.
    pub opened_at: LogicalTime,
    /// Ruling, once settled.
    pub ruling: Option<DisputeWinner>,
}

/// Dispute entry point layered over the trade engine.
pub struct ArbitrationDesk {
    engine: Arc<TradeEngine>,
    pool: Arc<ArbitratorPool>,
    entropy: Arc<dyn EntropySource>,
    cases: DashMap<TradeId, DisputeCase>,
}

impl ArbitrationDesk {
    /// New desk over an engine, a pool, and an entropy source.
    pub fn new(
        engine: Arc<TradeEngine>,
        pool: Arc<ArbitratorPool>,
        entropy: Arc<dyn EntropySource>,
    ) -> Self {
        Self {
            engine,
            pool,
            entropy,
            cases: DashMap::new(),
        }
    }

    /// Open dispute case for a trade, if any.
    pub fn case(&self, trade: TradeId) -> Option<DisputeCase> {
        self.cases.get(&trade).map(|c| c.clone())
    }

    /// Open a dispute on a fiat-deposited trade.
    ///
    /// Selects an arbitrator covering the trade's fiat currency, with the
    /// trade's own parties barred, and binds them through the engine. The
    /// engine enforces that the caller is a party and the state allows a
    /// dispute.
    ///
    /// # Errors
    ///
    /// [`ArbitrationError::TradeNotFound`],
    /// [`ArbitrationError::NoEligibleArbitrator`], or an engine error.
    pub fn open_dispute(
        &self,
        caller: &AccountId,
        trade_id: TradeId,
        config: &ProtocolConfig,
        now: LogicalTime,
    ) -> Result<DisputeCase, ArbitrationError> {
        let trade = self
            .engine
            .trade(trade_id)
            .ok_or(ArbitrationError::TradeNotFound { trade: trade_id })?;

        let candidates = self
            .pool
            .eligible(&trade.fiat_currency, &[&trade.buyer, &trade.seller]);
        let arbitrator = select_arbitrator(&candidates, trade_id, now, self.entropy.as_ref())
            .ok_or_else(|| ArbitrationError::NoEligibleArbitrator {
                currency: trade.fiat_currency.clone(),
            })?
            .clone();

        self.engine
            .begin_dispute(caller, trade_id, arbitrator.clone(), config, now)?;

        let case = DisputeCase {
            id: DisputeId::generate(),
            trade: trade_id,
            arbitrator,
            opened_by: caller.clone(),
            opened_at: now,
            ruling: None,
        };
        self.cases.insert(trade_id, case.clone());
        info!(case = %case.id, trade = %trade_id, arbitrator = %case.arbitrator, "dispute case opened");
        Ok(case)
    }

    /// Settle a dispute with the bound arbitrator's ruling.
    ///
    /// The engine enforces that the caller is the bound arbitrator and
    /// drives the settlement; the case records the ruling.
    ///
    /// # Errors
    ///
    /// [`ArbitrationError::NoOpenDispute`] or an engine error.
    pub fn settle_dispute(
        &self,
        caller: &AccountId,
        trade_id: TradeId,
        winner: DisputeWinner,
        config: &ProtocolConfig,
        now: LogicalTime,
    ) -> Result<(DisputeCase, SettlementReceipt), ArbitrationError> {
        if !self.cases.contains_key(&trade_id) {
            return Err(ArbitrationError::NoOpenDispute { trade: trade_id });
        }
        let (_, receipt) = self
            .engine
            .resolve_dispute(caller, trade_id, winner, config, now)?;
        let case = {
            let mut entry = self
                .cases
                .get_mut(&trade_id)
                .ok_or(ArbitrationError::NoOpenDispute { trade: trade_id })?;
            entry.ruling = Some(winner);
            entry.clone()
        };
        info!(case = %case.id, trade = %trade_id, winner = ?winner, "dispute settled");
        Ok((case, receipt))
    }
}
