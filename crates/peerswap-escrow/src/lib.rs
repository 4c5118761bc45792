//! # peerswap-escrow — Custody Ledger
//!
//! Holds custodied assets per trade from the moment a seller funds until
//! settlement zeroes the balance exactly once. The ledger enforces the
//! single-deposit invariant, delegate authorization for depositors, and the
//! mutate-then-transfer ordering: a settlement commits its bookkeeping
//! before any outbound transfer is attempted, and a failed push transfer is
//! queued for pull withdrawal instead of unwinding the settlement.

pub mod error;
pub mod ledger;
pub mod transfer;

pub use error::EscrowError;
pub use ledger::{EscrowLedger, EscrowRecord, FeeAccounts, SettlementReceipt};
pub use transfer::{AssetTransfer, InMemoryTransfer, TransferError};
