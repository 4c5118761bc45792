//! # Protocol Configuration Snapshot
//!
//! The protocol configuration is administered out-of-band. The engine reads
//! an immutable [`ProtocolConfig`] snapshot per operation and never mutates
//! it — every public operation takes `&ProtocolConfig` as an explicit
//! parameter, so tests can vary configuration freely and no hidden
//! singleton couples the crates together.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Basis-point denominator: 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Default global cap on the sum of all fee components: 10% of gross.
pub const DEFAULT_FEE_CAP_BPS: u32 = 1_000;

/// Fee percentages, in basis points of the gross trade amount.
///
/// Components: `burn` (destroyed), `chain` (chain treasury), `warchest`
/// (protocol treasury) and `arbitrator` (paid only on disputed trades).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Burned portion.
    pub burn_bps: u32,
    /// Chain-treasury portion.
    pub chain_bps: u32,
    /// Protocol-warchest portion.
    pub warchest_bps: u32,
    /// Arbitrator compensation, charged only when a dispute was opened.
    pub arbitrator_bps: u32,
    /// Global cap on the sum of all components.
    pub cap_bps: u32,
}

impl FeeConfig {
    /// Sum of every component, arbitrator included.
    ///
    /// `u32` additions cannot overflow `u64`, so the sum is widened once
    /// instead of chaining checked adds.
    pub fn total_bps(&self) -> u64 {
        u64::from(self.burn_bps)
            + u64::from(self.chain_bps)
            + u64::from(self.warchest_bps)
            + u64::from(self.arbitrator_bps)
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            burn_bps: 100,      // 1%
            chain_bps: 50,      // 0.5%
            warchest_bps: 100,  // 1%
            arbitrator_bps: 50, // 0.5%
            cap_bps: DEFAULT_FEE_CAP_BPS,
        }
    }
}

/// Global per-trade amount limits and per-user concurrency caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeLimits {
    /// Smallest tradeable amount, in asset base units.
    pub min_trade_amount: u128,
    /// Largest tradeable amount, in asset base units.
    pub max_trade_amount: u128,
    /// Maximum simultaneously active (non-terminal) trades per user.
    pub max_active_trades: u32,
    /// Maximum simultaneously active offers per owner.
    pub max_active_offers: u32,
}

impl Default for TradeLimits {
    fn default() -> Self {
        Self {
            min_trade_amount: 1,
            max_trade_amount: 1_000_000_000,
            max_active_trades: 10,
            max_active_offers: 10,
        }
    }
}

/// Lifecycle timers, in logical-clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Ticks from trade creation until the request expires.
    pub trade_expiry_ticks: u64,
    /// Ticks from dispute opening until the dispute window closes.
    pub dispute_window_ticks: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            trade_expiry_ticks: 1_200,
            dispute_window_ticks: 7_200,
        }
    }
}

/// Global pause switches. A paused subsystem rejects mutating operations
/// with a `SystemPaused` error; reads are unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PauseFlags {
    /// Pause trade creation and progression.
    pub trades: bool,
    /// Pause new deposits into escrow (release/refund stay available so
    /// funds are never trapped by a pause).
    pub deposits: bool,
}

/// The full protocol configuration snapshot read by every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Fee percentages.
    pub fees: FeeConfig,
    /// Amount limits and concurrency caps.
    pub limits: TradeLimits,
    /// Lifecycle timers.
    pub timers: TimerConfig,
    /// Pause switches.
    pub paused: PauseFlags,
}

impl ProtocolConfig {
    /// Validate the snapshot's internal consistency.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::FeeCapExceeded`] if the fee components sum past the cap.
    /// - [`ConfigError::InvertedTradeLimits`] if `min > max`.
    /// - [`ConfigError::ZeroLimit`] if a concurrency cap or timer is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let total = self.fees.total_bps();
        if total > u64::from(self.fees.cap_bps) {
            return Err(ConfigError::FeeCapExceeded {
                total_bps: total as u32,
                cap_bps: self.fees.cap_bps,
            });
        }
        if self.limits.min_trade_amount > self.limits.max_trade_amount {
            return Err(ConfigError::InvertedTradeLimits {
                min: self.limits.min_trade_amount,
                max: self.limits.max_trade_amount,
            });
        }
        if self.limits.max_active_trades == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_active_trades",
            });
        }
        if self.limits.max_active_offers == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_active_offers",
            });
        }
        if self.timers.trade_expiry_ticks == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "trade_expiry_ticks",
            });
        }
        if self.timers.dispute_window_ticks == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "dispute_window_ticks",
            });
        }
        Ok(())
    }
}
