//! # Error Types — Shared Validation and Configuration Errors
//!
//! Errors raised while constructing core types. Operation-level errors
//! (state transitions, authorization, escrow bookkeeping) live in the
//! crates that own those operations; everything here is about the shape
//! and range of input values.
//!
//! All errors use `thiserror` and carry the offending value so callers can
//! report expected-vs-actual without extra lookups.

use thiserror::Error;

/// Error constructing a validated core type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Account identifier does not match the required format.
    #[error("invalid account id: {0:?}")]
    InvalidAccountId(String),

    /// Currency code is not a three-letter uppercase ISO 4217 code.
    #[error("invalid currency code: {0:?}")]
    InvalidCurrencyCode(String),

    /// Asset identifier does not match the required denom format.
    #[error("invalid asset id: {0:?}")]
    InvalidAssetId(String),

    /// A bounded text field exceeds its maximum length.
    #[error("{field} is {len} characters, maximum is {max}")]
    TextTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Actual length supplied.
        len: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// An amount of zero was supplied where a positive amount is required.
    #[error("amount must be positive")]
    ZeroAmount,
}

/// Error validating a [`ProtocolConfig`](crate::config::ProtocolConfig) snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The fee components sum past the global cap.
    #[error("fee components total {total_bps} bps, cap is {cap_bps} bps")]
    FeeCapExceeded {
        /// Sum of all fee components in basis points.
        total_bps: u32,
        /// Configured cap in basis points.
        cap_bps: u32,
    },

    /// Trade amount limits are inverted.
    #[error("minimum trade amount {min} exceeds maximum {max}")]
    InvertedTradeLimits {
        /// Configured minimum.
        min: u128,
        /// Configured maximum.
        max: u128,
    },

    /// A limit that must be positive was configured as zero.
    #[error("{field} must be positive")]
    ZeroLimit {
        /// Name of the offending configuration field.
        field: &'static str,
    },
}
