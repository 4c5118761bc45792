//! Shared wiring for the scenario tests: a full engine with in-memory
//! collaborators and an arbitration desk over it.

use std::sync::Arc;

use peerswap_arbitration::{ArbitrationDesk, ArbitratorPool, EntropySource};
use peerswap_core::{AccountId, AssetId, CurrencyCode, LogicalTime, OfferId, ProtocolConfig, TradeId, TradeLimits};
use peerswap_escrow::{EscrowLedger, FeeAccounts, InMemoryTransfer};
use peerswap_trade::{
    InMemoryOfferBook, InMemoryProfiles, OfferParams, OfferType, StaticOracle, TradeEngine,
};

/// Deterministic entropy so dispute assignment is stable across runs.
pub struct FixedEntropy(pub u64);

impl EntropySource for FixedEntropy {
    fn entropy_word(&self) -> u64 {
        self.0
    }
}

pub fn account(name: &str) -> AccountId {
    AccountId::new(name).unwrap()
}

pub fn usd() -> CurrencyCode {
    CurrencyCode::new("USD").unwrap()
}

pub fn native() -> AssetId {
    AssetId::new("peer/native").unwrap()
}

pub struct World {
    pub book: Arc<InMemoryOfferBook>,
    pub oracle: Arc<StaticOracle>,
    pub profiles: Arc<InMemoryProfiles>,
    pub backend: Arc<InMemoryTransfer>,
    pub engine: Arc<TradeEngine>,
    pub pool: Arc<ArbitratorPool>,
    pub desk: ArbitrationDesk,
    pub config: ProtocolConfig,
}

impl World {
    pub fn new() -> Self {
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
        let engine = Arc::new(TradeEngine::new(
            book.clone(),
            oracle.clone(),
            profiles.clone(),
            escrow,
        ));
        let pool = Arc::new(ArbitratorPool::new());
        let desk = ArbitrationDesk::new(engine.clone(), pool.clone(), Arc::new(FixedEntropy(7)));
        Self {
            book,
            oracle,
            profiles,
            backend,
            engine,
            pool,
            desk,
            config: ProtocolConfig::default(),
        }
    }

    /// Publish the reference sell offer: min 100, max 1000, oracle rate.
    pub fn publish_offer(&self) -> OfferId {
        self.book
            .publish(
                &account("maker"),
                OfferParams {
                    offer_type: OfferType::Sell,
                    fiat_currency: usd(),
                    asset: native(),
                    min_amount: 100,
                    max_amount: 1_000,
                    rate_bps: 10_000,
                    description: "wire transfer, business hours".to_string(),
                },
                &TradeLimits::default(),
            )
            .unwrap()
    }

    pub fn create_trade(&self, offer: OfferId, amount: u128, at: u64) -> TradeId {
        self.engine
            .create_trade(
                &account("taker"),
                offer,
                amount,
                "taker pay handle".to_string(),
                &self.config,
                LogicalTime::new(at),
            )
            .unwrap()
            .id
    }

    pub fn to_funded(&self, offer: OfferId) -> TradeId {
        let id = self.create_trade(offer, 500, 0);
        self.engine
            .accept_request(
                &account("maker"),
                id,
                "maker bank details".to_string(),
                LogicalTime::new(1),
            )
            .unwrap();
        self.engine
            .fund_escrow(&account("maker"), id, &self.config, LogicalTime::new(2))
            .unwrap();
        id
    }

    pub fn to_fiat_deposited(&self, offer: OfferId) -> TradeId {
        let id = self.to_funded(offer);
        self.engine
            .mark_fiat_deposited(&account("taker"), id, LogicalTime::new(3))
            .unwrap();
        id
    }
}
