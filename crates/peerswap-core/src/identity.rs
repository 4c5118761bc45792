//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the engine. Each
//! identifier is a distinct type — you cannot pass an [`OfferId`] where a
//! [`TradeId`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`AccountId`], [`CurrencyCode`], [`AssetId`])
//! validate format at construction time. Sequence-based identifiers
//! ([`TradeId`], [`OfferId`]) wrap the monotonically increasing `u64`
//! assigned by their store and are always valid by construction.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Helper macro to implement `Deserialize` for string newtypes that must
/// validate their contents. Deserializes as a plain `String`, then routes
/// through the type's `new()` constructor so that invalid values are
/// rejected at deserialization time — not silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Sequence-based identifiers (assigned by the owning store)
// ---------------------------------------------------------------------------

/// A trade identifier, assigned from a monotonically increasing sequence
/// at trade creation and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(u64);

impl TradeId {
    /// Wrap an existing sequence value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Access the underlying sequence value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TradeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "trade:{}", self.0)
    }
}

/// An offer identifier, assigned from a monotonically increasing sequence
/// by the offer book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfferId(u64);

impl OfferId {
    /// Wrap an existing sequence value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Access the underlying sequence value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for OfferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "offer:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// String-based identifiers (validated at construction)
// ---------------------------------------------------------------------------

/// An account address within the execution environment.
///
/// The engine treats addresses as opaque but bounded: lowercase ASCII
/// alphanumeric, 4–64 characters. Chain bindings map their native address
/// encodings into this canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AccountId(String);

impl_validating_deserialize!(AccountId);

impl AccountId {
    /// Minimum address length.
    pub const MIN_LEN: usize = 4;
    /// Maximum address length.
    pub const MAX_LEN: usize = 64;

    /// Create an account id from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAccountId`] if the string is not
    /// 4–64 lowercase ASCII alphanumeric characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let len = s.len();
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len)
            || !s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(ValidationError::InvalidAccountId(s));
        }
        Ok(Self(s))
    }

    /// Access the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 fiat currency code: exactly three uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CurrencyCode(String);

impl_validating_deserialize!(CurrencyCode);

impl CurrencyCode {
    /// Create a currency code, validating the three-letter uppercase format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCurrencyCode`] if the string is
    /// not exactly three uppercase ASCII letters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.len() != 3 || !s.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrencyCode(s));
        }
        Ok(Self(s))
    }

    /// Access the currency code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An on-chain asset denomination.
///
/// Lenient by design — denom conventions vary per execution environment:
/// 2–48 characters drawn from lowercase alphanumerics plus `/`, `:`, `-`
/// and `.` (enough for native coins, IBC denoms, and token addresses in
/// canonical form).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AssetId(String);

impl_validating_deserialize!(AssetId);

impl AssetId {
    /// Minimum denom length.
    pub const MIN_LEN: usize = 2;
    /// Maximum denom length.
    pub const MAX_LEN: usize = 48;

    /// Create an asset id from a denom string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAssetId`] on length or character
    /// violations.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let len = s.len();
        let valid_chars = s.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '/' | ':' | '-' | '.')
        });
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len) || !valid_chars {
            return Err(ValidationError::InvalidAssetId(s));
        }
        Ok(Self(s))
    }

    /// Access the denom string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
