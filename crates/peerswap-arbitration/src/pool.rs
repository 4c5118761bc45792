//! Arbitrator registry.
//!
//! Arbitrators register with the set of fiat currencies they cover. The
//! eligibility query returns candidates in a deterministic order so the
//! selection index is stable for a given registry state.

use std::collections::BTreeSet;

use dashmap::DashMap;
use peerswap_core::{AccountId, CurrencyCode};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One registered arbitrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arbitrator {
    /// Account the arbitrator settles under.
    pub account: AccountId,
    /// Fiat currencies this arbitrator covers.
    pub currencies: BTreeSet<CurrencyCode>,
}

/// Registry of arbitrators available for dispute assignment.
#[derive(Debug, Default)]
pub struct ArbitratorPool {
    members: DashMap<AccountId, Arbitrator>,
}

impl ArbitratorPool {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an arbitrator, replacing any earlier registration for the
    /// same account.
    pub fn register(&self, account: AccountId, currencies: impl IntoIterator<Item = CurrencyCode>) {
        let arbitrator = Arbitrator {
            account: account.clone(),
            currencies: currencies.into_iter().collect(),
        };
        info!(%account, "arbitrator registered");
        self.members.insert(account, arbitrator);
    }

    /// Remove an arbitrator from the pool.
    pub fn remove(&self, account: &AccountId) {
        self.members.remove(account);
        info!(%account, "arbitrator removed");
    }

    /// Registered arbitrator count.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the pool has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Accounts covering `currency`, excluding `barred` parties, sorted
    /// by account for a deterministic selection domain.
    pub fn eligible(&self, currency: &CurrencyCode, barred: &[&AccountId]) -> Vec<AccountId> {
        let mut candidates: Vec<AccountId> = self
            .members
            .iter()
            .filter(|entry| entry.currencies.contains(currency))
            .filter(|entry| !barred.contains(&&entry.account))
            .map(|entry| entry.account.clone())
            .collect();
        candidates.sort();
        candidates
    }
}
