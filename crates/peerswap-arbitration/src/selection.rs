//! Arbitrator selection.
//!
//! The selection index mixes an entropy word with the trade identifier
//! and the observation time through SHA-256, so no single
//! attacker-observable value determines the outcome on its own. The
//! entropy word itself comes from an [`EntropySource`], which chain
//! bindings may back with a verifiable-random source; the default draws
//! from the operating system.

use peerswap_core::{AccountId, LogicalTime, TradeId};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Supplier of one fresh entropy word per selection.
pub trait EntropySource: Send + Sync {
    /// A fresh 64-bit entropy word.
    fn entropy_word(&self) -> u64;
}

/// Operating-system randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn entropy_word(&self) -> u64 {
        OsRng.next_u64()
    }
}

/// Pick an arbitrator from an ordered candidate list.
///
/// Returns `None` for an empty list. The same inputs always select the
/// same candidate, which keeps replayed operations deterministic when a
/// deterministic [`EntropySource`] is supplied.
pub fn select_arbitrator<'a>(
    candidates: &'a [AccountId],
    trade: TradeId,
    at: LogicalTime,
    entropy: &dyn EntropySource,
) -> Option<&'a AccountId> {
    if candidates.is_empty() {
        return None;
    }
    let mut hasher = Sha256::new();
    hasher.update(entropy.entropy_word().to_be_bytes());
    hasher.update(trade.value().to_be_bytes());
    hasher.update(at.ticks().to_be_bytes());
    let digest = hasher.finalize();
    let mut word_bytes = [0u8; 8];
    word_bytes.copy_from_slice(&digest[..8]);
    let word = u64::from_be_bytes(word_bytes);
    let index = (word % candidates.len() as u64) as usize;
    Some(&candidates[index])
}
