//! Escrow custody ledger.
//!
//! One record per trade, created on first deposit. Settlement zeroes the
//! balance under the record's map guard before any outbound transfer is
//! attempted, so a hostile recipient can never hold the escrow state
//! hostage. Transfers that fail are queued per account and asset for pull
//! withdrawal.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use peerswap_core::{config::FeeConfig, AccountId, AssetId, TradeId};
use peerswap_fees::{calculate_fees, remaining_amount, FeeDistribution, FeeError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::EscrowError;
use crate::transfer::AssetTransfer;

/// Destination accounts for the protocol fee components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAccounts {
    /// Receives the burn component.
    pub burn: AccountId,
    /// Receives the chain operations component.
    pub chain: AccountId,
    /// Receives the warchest component.
    pub warchest: AccountId,
}

/// Custody record for one trade's escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    /// Trade this escrow belongs to.
    pub trade: TradeId,
    /// Asset under custody.
    pub asset: AssetId,
    /// Custodied amount, zeroed exactly once at settlement.
    pub amount: u128,
    /// Account that funded the escrow.
    pub depositor: AccountId,
    /// Set when release or refund has zeroed the balance.
    pub settled: bool,
}

/// Outcome of a release or refund, returned to the caller and logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    /// Trade that settled.
    pub trade: TradeId,
    /// Asset that moved.
    pub asset: AssetId,
    /// Amount that was under custody.
    pub gross: u128,
    /// Fee split applied; all zeros for an undisputed refund.
    pub fees: FeeDistribution,
    /// Account receiving the net payout.
    pub payout_account: AccountId,
    /// Net amount after fees.
    pub payout_amount: u128,
}

/// The custody ledger. Shared across operations; every mutation happens
/// under the owning map entry's guard.
pub struct EscrowLedger {
    records: DashMap<TradeId, EscrowRecord>,
    delegates: DashMap<AccountId, HashSet<AccountId>>,
    pending: DashMap<(AccountId, AssetId), u128>,
    fee_accounts: FeeAccounts,
    transfer: Arc<dyn AssetTransfer>,
}

impl EscrowLedger {
    /// New ledger wired to the given fee destinations and transfer backend.
    pub fn new(fee_accounts: FeeAccounts, transfer: Arc<dyn AssetTransfer>) -> Self {
        Self {
            records: DashMap::new(),
            delegates: DashMap::new(),
            pending: DashMap::new(),
            fee_accounts,
            transfer,
        }
    }

    // ── Delegate authorization ──

    /// Allow `delegate` to fund escrows on behalf of `funder`.
    pub fn authorize_delegate(&self, funder: &AccountId, delegate: AccountId) {
        self.delegates
            .entry(funder.clone())
            .or_default()
            .insert(delegate);
    }

    /// Withdraw a previously granted delegation.
    pub fn revoke_delegate(&self, funder: &AccountId, delegate: &AccountId) {
        if let Some(mut set) = self.delegates.get_mut(funder) {
            set.remove(delegate);
        }
    }

    fn is_authorized(&self, funder: &AccountId, depositor: &AccountId) -> bool {
        if funder == depositor {
            return true;
        }
        self.delegates
            .get(funder)
            .map(|set| set.contains(depositor))
            .unwrap_or(false)
    }

    // ── Custody ──

    /// Fund the escrow for a trade. At most one deposit ever succeeds.
    ///
    /// `funder` is the account expected to supply the funds (the seller);
    /// `depositor` is the account actually making the call, which must be
    /// the funder or an authorized delegate.
    ///
    /// # Errors
    ///
    /// [`EscrowError::AlreadyFunded`] if a deposit already landed,
    /// [`EscrowError::UnauthorizedDepositor`] for a depositor that is
    /// neither the funder nor a delegate, [`EscrowError::ZeroDeposit`]
    /// for a zero amount.
    pub fn deposit(
        &self,
        trade: TradeId,
        asset: AssetId,
        amount: u128,
        funder: &AccountId,
        depositor: &AccountId,
    ) -> Result<(), EscrowError> {
        if amount == 0 {
            return Err(EscrowError::ZeroDeposit { trade });
        }
        if !self.is_authorized(funder, depositor) {
            return Err(EscrowError::UnauthorizedDepositor {
                trade,
                depositor: depositor.clone(),
            });
        }
        match self.records.entry(trade) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(EscrowError::AlreadyFunded { trade })
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(EscrowRecord {
                    trade,
                    asset: asset.clone(),
                    amount,
                    depositor: depositor.clone(),
                    settled: false,
                });
                info!(%trade, %asset, amount, %depositor, "escrow funded");
                Ok(())
            }
        }
    }

    /// Custodied balance for a trade, zero when unfunded or settled.
    pub fn balance_of(&self, trade: TradeId) -> u128 {
        self.records.get(&trade).map(|r| r.amount).unwrap_or(0)
    }

    /// Whether the trade holds live custodied funds.
    pub fn is_funded(&self, trade: TradeId) -> bool {
        self.records
            .get(&trade)
            .map(|r| r.amount > 0 && !r.settled)
            .unwrap_or(false)
    }

    // ── Settlement ──

    /// Check the fee split against the custodied amount without touching
    /// custody. The trade layer runs this before committing a terminal
    /// state, so a bad fee config aborts while the trade can still settle.
    ///
    /// # Errors
    ///
    /// [`EscrowError::NotFunded`], [`EscrowError::AlreadySettled`] or a
    /// wrapped [`FeeError`] the eventual settlement would hit.
    pub fn settlement_preflight(
        &self,
        trade: TradeId,
        fee_config: &FeeConfig,
        include_arbitrator: bool,
    ) -> Result<(), EscrowError> {
        let gross = {
            let entry = self
                .records
                .get(&trade)
                .ok_or(EscrowError::NotFunded { trade })?;
            if entry.settled {
                return Err(EscrowError::AlreadySettled { trade });
            }
            entry.amount
        };
        let fees = calculate_fees(gross, fee_config, include_arbitrator)?;
        remaining_amount(gross, &fees)?;
        Ok(())
    }

    /// Zero the record under its guard, returning a snapshot for payout.
    fn take_custody(&self, trade: TradeId) -> Result<EscrowRecord, EscrowError> {
        let mut entry = self
            .records
            .get_mut(&trade)
            .ok_or(EscrowError::NotFunded { trade })?;
        if entry.settled {
            return Err(EscrowError::AlreadySettled { trade });
        }
        if entry.amount == 0 {
            return Err(EscrowError::NotFunded { trade });
        }
        let snapshot = entry.clone();
        entry.amount = 0;
        entry.settled = true;
        Ok(snapshot)
    }

    /// Release custody to `recipient`, splitting out protocol fees.
    ///
    /// The arbitrator fee is charged only when `arbitrator` is attached,
    /// which the trade layer does exclusively for disputed settlements.
    /// The balance is zeroed before any transfer is pushed; transfers that
    /// fail land in the pull-withdrawal queue.
    ///
    /// # Errors
    ///
    /// [`EscrowError::NotFunded`], [`EscrowError::AlreadySettled`] or a
    /// wrapped [`FeeError`] from the fee split.
    pub fn release(
        &self,
        trade: TradeId,
        recipient: &AccountId,
        fee_config: &FeeConfig,
        arbitrator: Option<&AccountId>,
    ) -> Result<SettlementReceipt, EscrowError> {
        // Fee math is validated before custody is touched so a bad config
        // cannot strand a zeroed balance.
        let gross = {
            let entry = self
                .records
                .get(&trade)
                .ok_or(EscrowError::NotFunded { trade })?;
            if entry.settled {
                return Err(EscrowError::AlreadySettled { trade });
            }
            entry.amount
        };
        let fees = calculate_fees(gross, fee_config, arbitrator.is_some())?;
        let net = remaining_amount(gross, &fees)?;

        let record = self.take_custody(trade)?;

        self.push_or_queue(recipient, &record.asset, net);
        self.push_or_queue(&self.fee_accounts.burn, &record.asset, fees.burn);
        self.push_or_queue(&self.fee_accounts.chain, &record.asset, fees.chain);
        self.push_or_queue(&self.fee_accounts.warchest, &record.asset, fees.warchest);
        if let Some(arbitrator) = arbitrator {
            self.push_or_queue(arbitrator, &record.asset, fees.arbitrator);
        }

        info!(%trade, gross, net, %recipient, "escrow released");
        Ok(SettlementReceipt {
            trade,
            asset: record.asset,
            gross,
            fees,
            payout_account: recipient.clone(),
            payout_amount: net,
        })
    }

    /// Return the full custodied amount to the original depositor.
    ///
    /// No fees are charged on an undisputed refund.
    ///
    /// # Errors
    ///
    /// [`EscrowError::NotFunded`] or [`EscrowError::AlreadySettled`].
    pub fn refund(&self, trade: TradeId) -> Result<SettlementReceipt, EscrowError> {
        let record = self.take_custody(trade)?;
        self.push_or_queue(&record.depositor, &record.asset, record.amount);
        info!(%trade, amount = record.amount, depositor = %record.depositor, "escrow refunded");
        Ok(SettlementReceipt {
            trade,
            asset: record.asset,
            gross: record.amount,
            fees: FeeDistribution::zero(),
            payout_account: record.depositor,
            payout_amount: record.amount,
        })
    }

    /// Refund a disputed trade to the depositor, minus the arbitrator fee.
    ///
    /// Only the arbitrator component is charged; burn, chain, and warchest
    /// apply exclusively to released settlements.
    ///
    /// # Errors
    ///
    /// [`EscrowError::NotFunded`], [`EscrowError::AlreadySettled`] or a
    /// wrapped [`FeeError`].
    pub fn refund_disputed(
        &self,
        trade: TradeId,
        fee_config: &FeeConfig,
        arbitrator: &AccountId,
    ) -> Result<SettlementReceipt, EscrowError> {
        let gross = {
            let entry = self
                .records
                .get(&trade)
                .ok_or(EscrowError::NotFunded { trade })?;
            if entry.settled {
                return Err(EscrowError::AlreadySettled { trade });
            }
            entry.amount
        };
        let full = calculate_fees(gross, fee_config, true)?;
        let fees = FeeDistribution {
            burn: 0,
            chain: 0,
            warchest: 0,
            arbitrator: full.arbitrator,
        };
        let net = remaining_amount(gross, &fees)?;

        let record = self.take_custody(trade)?;
        self.push_or_queue(&record.depositor, &record.asset, net);
        self.push_or_queue(arbitrator, &record.asset, fees.arbitrator);

        info!(%trade, gross, net, %arbitrator, "disputed escrow refunded");
        Ok(SettlementReceipt {
            trade,
            asset: record.asset,
            gross,
            fees,
            payout_account: record.depositor,
            payout_amount: net,
        })
    }

    // ── Pull withdrawal ──

    fn push_or_queue(&self, recipient: &AccountId, asset: &AssetId, amount: u128) {
        if amount == 0 {
            return;
        }
        if let Err(err) = self.transfer.transfer(recipient, asset, amount) {
            warn!(%recipient, %asset, amount, %err, "push transfer failed, queued for withdrawal");
            let mut entry = self
                .pending
                .entry((recipient.clone(), asset.clone()))
                .or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// Amount queued for pull withdrawal by an account.
    pub fn pending_withdrawal(&self, account: &AccountId, asset: &AssetId) -> u128 {
        self.pending
            .get(&(account.clone(), asset.clone()))
            .map(|entry| *entry)
            .unwrap_or(0)
    }

    /// Pull a queued balance. The queue entry is cleared before the push
    /// is retried and restored if the push fails again.
    ///
    /// # Errors
    ///
    /// [`EscrowError::NothingToWithdraw`] when nothing is queued, and
    /// [`EscrowError::WithdrawalFailed`] when the retry is rejected.
    pub fn withdraw(&self, account: &AccountId, asset: &AssetId) -> Result<u128, EscrowError> {
        let key = (account.clone(), asset.clone());
        let (_, amount) = self
            .pending
            .remove(&key)
            .ok_or_else(|| EscrowError::NothingToWithdraw {
                account: account.clone(),
            })?;
        if self.transfer.transfer(account, asset, amount).is_err() {
            let mut entry = self.pending.entry(key).or_insert(0);
            *entry = entry.saturating_add(amount);
            return Err(EscrowError::WithdrawalFailed {
                account: account.clone(),
                amount,
            });
        }
        info!(%account, %asset, amount, "pending withdrawal pulled");
        Ok(amount)
    }
}
