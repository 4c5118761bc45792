//! # peerswap-arbitration — Dispute Lifecycle
//!
//! Layers dispute handling on top of the trade engine: a registry of
//! arbitrators keyed by the fiat currencies they cover, entropy-mixed
//! selection that never leans on a single observable value, and the desk
//! that opens disputes and drives rulings into escrow settlement.

pub mod desk;
pub mod error;
pub mod pool;
pub mod selection;

pub use desk::{ArbitrationDesk, DisputeCase, DisputeId};
pub use error::ArbitrationError;
pub use pool::{Arbitrator, ArbitratorPool};
pub use selection::{select_arbitrator, EntropySource, OsEntropy};
