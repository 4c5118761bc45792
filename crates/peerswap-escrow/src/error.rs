//! Error types for escrow custody operations.

use peerswap_core::{AccountId, TradeId};
use peerswap_fees::FeeError;
use thiserror::Error;

/// Errors raised by the escrow ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    /// A deposit was attempted on a trade that already holds funds.
    #[error("escrow for {trade} is already funded")]
    AlreadyFunded {
        /// Trade whose escrow was already funded.
        trade: TradeId,
    },

    /// No escrow record exists or it holds no funds.
    #[error("escrow for {trade} is not funded")]
    NotFunded {
        /// Trade without custodied funds.
        trade: TradeId,
    },

    /// The escrow for this trade was already settled.
    #[error("escrow for {trade} was already settled")]
    AlreadySettled {
        /// Trade whose escrow was settled earlier.
        trade: TradeId,
    },

    /// The depositor is neither the expected funder nor an authorized
    /// delegate of the funder.
    #[error("account {depositor} is not authorized to fund escrow for {trade}")]
    UnauthorizedDepositor {
        /// Trade being funded.
        trade: TradeId,
        /// Account that attempted the deposit.
        depositor: AccountId,
    },

    /// A zero-amount deposit was attempted.
    #[error("escrow deposit for {trade} must be positive")]
    ZeroDeposit {
        /// Trade with the rejected deposit.
        trade: TradeId,
    },

    /// No pending withdrawal exists for this account and asset.
    #[error("no pending withdrawal for account {account}")]
    NothingToWithdraw {
        /// Account that attempted the withdrawal.
        account: AccountId,
    },

    /// A pull withdrawal could not be pushed out; the balance stays queued.
    #[error("withdrawal of {amount} for {account} failed and remains queued")]
    WithdrawalFailed {
        /// Account whose withdrawal failed.
        account: AccountId,
        /// Amount still queued.
        amount: u128,
    },

    /// Fee arithmetic failed during settlement.
    #[error("fee computation failed: {0}")]
    Fee(#[from] FeeError),
}
