//! Outbound asset transfer seam.
//!
//! The ledger never rolls back on a failed transfer. Callers of
//! [`AssetTransfer::transfer`] must have committed their bookkeeping first
//! and must route failures into the pull-withdrawal queue.

use std::collections::HashSet;

use dashmap::DashMap;
use peerswap_core::{AccountId, AssetId};
use thiserror::Error;

/// Failure pushing assets to a recipient.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The recipient rejected the transfer.
    #[error("transfer of {amount} {asset} to {recipient} was rejected")]
    Rejected {
        /// Destination account.
        recipient: AccountId,
        /// Asset being moved.
        asset: AssetId,
        /// Amount that failed to move.
        amount: u128,
    },
}

/// Push-style transfer of custodied assets out of the protocol.
pub trait AssetTransfer: Send + Sync {
    /// Move `amount` of `asset` to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Rejected`] when the recipient cannot or
    /// will not accept the transfer.
    fn transfer(
        &self,
        recipient: &AccountId,
        asset: &AssetId,
        amount: u128,
    ) -> Result<(), TransferError>;
}

/// In-memory transfer backend that credits balances in a map.
///
/// Accounts listed as rejecting refuse every transfer, which exercises the
/// pull-withdrawal path in higher layers.
#[derive(Debug, Default)]
pub struct InMemoryTransfer {
    balances: DashMap<(AccountId, AssetId), u128>,
    rejecting: DashMap<AccountId, ()>,
}

impl InMemoryTransfer {
    /// New backend with no balances and no rejecting accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `account` reject all future transfers.
    pub fn set_rejecting(&self, account: AccountId) {
        self.rejecting.insert(account, ());
    }

    /// Stop `account` from rejecting transfers.
    pub fn clear_rejecting(&self, account: &AccountId) {
        self.rejecting.remove(account);
    }

    /// Credited balance for an account and asset.
    pub fn balance(&self, account: &AccountId, asset: &AssetId) -> u128 {
        self.balances
            .get(&(account.clone(), asset.clone()))
            .map(|entry| *entry)
            .unwrap_or(0)
    }

    /// Accounts holding a nonzero balance of any asset.
    pub fn credited_accounts(&self) -> HashSet<AccountId> {
        self.balances
            .iter()
            .filter(|entry| *entry.value() > 0)
            .map(|entry| entry.key().0.clone())
            .collect()
    }
}

impl AssetTransfer for InMemoryTransfer {
    fn transfer(
        &self,
        recipient: &AccountId,
        asset: &AssetId,
        amount: u128,
    ) -> Result<(), TransferError> {
        if self.rejecting.contains_key(recipient) {
            return Err(TransferError::Rejected {
                recipient: recipient.clone(),
                asset: asset.clone(),
                amount,
            });
        }
        let mut entry = self
            .balances
            .entry((recipient.clone(), asset.clone()))
            .or_insert(0);
        *entry = entry.saturating_add(amount);
        Ok(())
    }
}
