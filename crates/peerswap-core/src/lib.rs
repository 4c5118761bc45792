//! # peerswap-core — Foundational Types for the Peerswap Engine
//!
//! This crate is the bedrock of the Peerswap workspace. Every other crate
//! depends on `peerswap-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** [`AccountId`],
//!    [`CurrencyCode`], [`AssetId`], [`TradeId`], [`OfferId`] — all newtypes
//!    with validated constructors. No bare strings for identifiers.
//!
//! 2. **Logical time only.** The engine never reads a wall clock. Every
//!    deadline is a [`LogicalTime`] supplied by the deterministic execution
//!    environment and compared, never awaited.
//!
//! 3. **Configuration as an explicit snapshot.** [`ProtocolConfig`] is
//!    passed into each operation as a parameter. There is no global
//!    configuration singleton anywhere in the workspace.
//!
//! 4. **Bounded everything.** [`TransitionLog`] is a fixed-capacity ring
//!    buffer; every list-returning query goes through [`PageRequest`] with
//!    a hard maximum page size.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `peerswap-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement `Serialize`/`Deserialize`.

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod pagination;

// Re-export primary types for ergonomic imports.
pub use clock::LogicalTime;
pub use config::{FeeConfig, PauseFlags, ProtocolConfig, TimerConfig, TradeLimits};
pub use error::{ConfigError, ValidationError};
pub use history::{TransitionLog, TRANSITION_HISTORY_CAPACITY};
pub use identity::{AccountId, AssetId, CurrencyCode, OfferId, TradeId};
pub use pagination::{Page, PageError, PageRequest, MAX_PAGE_SIZE};
