//! Profile and limits collaborator.
//!
//! The engine reads active counts before a mutating operation, and a
//! reported breach aborts that operation. Count updates after a commit are
//! best-effort notifications: a failure is logged and the trade operation
//! still succeeds.

use dashmap::DashMap;
use peerswap_core::AccountId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure notifying the profile collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// The directory rejected the update.
    #[error("profile update for {account} rejected")]
    Rejected {
        /// Account whose update failed.
        account: AccountId,
    },
}

/// Per-user counters maintained by the directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCounters {
    /// Trades currently in a non-terminal state.
    pub active_trades: u64,
    /// Trades that reached `EscrowReleased`.
    pub completed_trades: u64,
    /// All trades ever opened.
    pub total_trades: u64,
}

/// Profile and limits directory.
pub trait ProfileDirectory: Send + Sync {
    /// Current active-trade count for a user.
    fn active_trades(&self, user: &AccountId) -> u64;

    /// Record that a trade was opened for this user.
    ///
    /// # Errors
    ///
    /// [`ProfileError::Rejected`] when the directory refuses the update;
    /// the engine logs and continues.
    fn record_trade_opened(&self, user: &AccountId) -> Result<(), ProfileError>;

    /// Record that a trade reached a terminal state for this user.
    /// `completed` is set only for a released settlement.
    ///
    /// # Errors
    ///
    /// [`ProfileError::Rejected`]; the engine logs and continues.
    fn record_trade_closed(&self, user: &AccountId, completed: bool) -> Result<(), ProfileError>;
}

/// In-memory directory backing single-environment deployments and tests.
#[derive(Debug, Default)]
pub struct InMemoryProfiles {
    counters: DashMap<AccountId, ProfileCounters>,
}

impl InMemoryProfiles {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter snapshot for a user.
    pub fn counters(&self, user: &AccountId) -> ProfileCounters {
        self.counters.get(user).map(|c| *c).unwrap_or_default()
    }
}

impl ProfileDirectory for InMemoryProfiles {
    fn active_trades(&self, user: &AccountId) -> u64 {
        self.counters
            .get(user)
            .map(|c| c.active_trades)
            .unwrap_or(0)
    }

    fn record_trade_opened(&self, user: &AccountId) -> Result<(), ProfileError> {
        let mut entry = self.counters.entry(user.clone()).or_default();
        entry.active_trades += 1;
        entry.total_trades += 1;
        Ok(())
    }

    fn record_trade_closed(&self, user: &AccountId, completed: bool) -> Result<(), ProfileError> {
        let mut entry = self.counters.entry(user.clone()).or_default();
        entry.active_trades = entry.active_trades.saturating_sub(1);
        if completed {
            entry.completed_trades += 1;
        }
        Ok(())
    }
}
