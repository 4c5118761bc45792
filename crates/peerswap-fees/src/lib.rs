//! # peerswap-fees — Fee Distribution Arithmetic
//!
//! Pure, allocation-free fee math for escrow settlement. Given a gross
//! escrow amount and a [`FeeConfig`], this crate computes the split across
//! the burn, chain, warchest, and arbitrator accounts.
//!
//! All arithmetic is checked. Each component is computed independently as
//! `floor(gross * component_bps / 10_000)`, so rounding dust stays with the
//! seller payout rather than accruing to any fee account. Overflow in the
//! widening multiply is a hard error, never a wrap or a saturation.

use peerswap_core::config::{FeeConfig, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error from fee computation or fee configuration validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    /// Configured fee components sum past the configured cap.
    #[error("total fee {total_bps} bps exceeds cap {cap_bps} bps")]
    CapExceeded {
        /// Sum of all fee components in basis points.
        total_bps: u64,
        /// Configured cap in basis points.
        cap_bps: u64,
    },

    /// Intermediate multiplication overflowed.
    #[error("fee arithmetic overflow on gross amount {gross}")]
    Overflow {
        /// Gross amount that triggered the overflow.
        gross: u128,
    },

    /// Fees would consume more than the gross amount.
    #[error("fees {fees} exceed gross amount {gross}")]
    FeesExceedGross {
        /// Total computed fees.
        fees: u128,
        /// Gross escrow amount.
        gross: u128,
    },
}

/// The computed split of a gross escrow amount across fee destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDistribution {
    /// Amount destined for the burn account.
    pub burn: u128,
    /// Amount destined for the chain operations account.
    pub chain: u128,
    /// Amount destined for the warchest account.
    pub warchest: u128,
    /// Amount destined for the arbitrator, zero when no dispute occurred.
    pub arbitrator: u128,
}

impl FeeDistribution {
    /// A distribution with every component zero.
    pub fn zero() -> Self {
        Self {
            burn: 0,
            chain: 0,
            warchest: 0,
            arbitrator: 0,
        }
    }

    /// Sum of all components.
    ///
    /// Cannot overflow in practice: each component is at most `gross` and
    /// their bps sum is capped well below the denominator, but the sum is
    /// still checked at the call sites that subtract it from gross.
    pub fn total(&self) -> u128 {
        self.burn + self.chain + self.warchest + self.arbitrator
    }
}

/// Floor of `gross * bps / 10_000` with checked arithmetic.
fn component(gross: u128, bps: u32) -> Result<u128, FeeError> {
    gross
        .checked_mul(u128::from(bps))
        .map(|scaled| scaled / u128::from(BPS_DENOMINATOR))
        .ok_or(FeeError::Overflow { gross })
}

/// Validate that a fee configuration's components fit under its cap.
///
/// # Errors
///
/// Returns [`FeeError::CapExceeded`] when the component sum is over the cap.
pub fn validate_fee_config(config: &FeeConfig) -> Result<(), FeeError> {
    let total = config.total_bps();
    if total > u64::from(config.cap_bps) {
        return Err(FeeError::CapExceeded {
            total_bps: total,
            cap_bps: u64::from(config.cap_bps),
        });
    }
    Ok(())
}

/// Compute the fee distribution for a gross escrow amount.
///
/// The arbitrator component is only charged when `include_arbitrator` is
/// set, which happens exclusively for settlements that went through a
/// dispute. Each component floors independently.
///
/// # Errors
///
/// Returns [`FeeError::CapExceeded`] for an invalid config and
/// [`FeeError::Overflow`] if an intermediate multiply overflows `u128`.
pub fn calculate_fees(
    gross: u128,
    config: &FeeConfig,
    include_arbitrator: bool,
) -> Result<FeeDistribution, FeeError> {
    validate_fee_config(config)?;
    Ok(FeeDistribution {
        burn: component(gross, config.burn_bps)?,
        chain: component(gross, config.chain_bps)?,
        warchest: component(gross, config.warchest_bps)?,
        arbitrator: if include_arbitrator {
            component(gross, config.arbitrator_bps)?
        } else {
            0
        },
    })
}

/// Net amount left for the seller payout after fees.
///
/// # Errors
///
/// Returns [`FeeError::FeesExceedGross`] if the distribution does not fit
/// inside the gross amount. With a validated config this cannot happen,
/// but settlement code treats it as a hard error rather than trusting the
/// cap invariant transitively.
pub fn remaining_amount(gross: u128, fees: &FeeDistribution) -> Result<u128, FeeError> {
    let total = fees.total();
    gross.checked_sub(total).ok_or(FeeError::FeesExceedGross {
        fees: total,
        gross,
    })
}
