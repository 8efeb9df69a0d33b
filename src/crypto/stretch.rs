//! Legacy AES-KDF key transform.
//!
//! The key buffer is encrypted in place with AES-256 (keyed with the seed),
//! block by block, `rounds` times. Only the round count hardens it, so it is
//! kept for reading existing databases and nothing else.

use aes::Aes256;
use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
use zeroize::Zeroizing;

use super::hash::hash;
use super::registry::HashAlgorithm;
use super::{BLOCK_LEN, SEED_LEN};
use crate::error::{EngineError, Result};

/// Applies `rounds` AES-256 encryptions to every 16-byte block of `key`.
///
/// Zero rounds returns `key` unchanged. `key` must be a whole number of
/// blocks and `seed` must be a 32-byte AES-256 key.
pub fn stretch(key: &[u8], seed: &[u8], rounds: u64) -> Result<Zeroizing<Vec<u8>>> {
    if seed.is_empty() {
        return Err(EngineError::invalid("Missing seed"));
    }
    if key.is_empty() {
        return Err(EngineError::invalid("Missing key"));
    }
    if key.len() % BLOCK_LEN != 0 {
        return Err(EngineError::invalid(format!(
            "key of {} bytes is not a multiple of the {BLOCK_LEN}-byte block size",
            key.len()
        )));
    }

    let cipher = Aes256::new_from_slice(seed).map_err(|_| EngineError::InvalidKeyLength {
        primitive: "AES-256",
        expected: "32 bytes",
        actual: seed.len(),
    })?;

    let mut out = Zeroizing::new(key.to_vec());
    for _ in 0..rounds {
        for block in out.chunks_exact_mut(BLOCK_LEN) {
            cipher.encrypt_block(GenericArray::from_mut_slice(block));
        }
    }

    Ok(out)
}

/// AES-KDF parameters as stored in a database header.
#[derive(Clone)]
pub struct AesKdf {
    seed: Zeroizing<Vec<u8>>,
    rounds: u64,
}

impl AesKdf {
    pub const MIN_SEED_LEN: usize = 8;
    pub const MAX_SEED_LEN: usize = SEED_LEN;

    pub fn new(seed: &[u8], rounds: u64) -> Result<Self> {
        if !(Self::MIN_SEED_LEN..=Self::MAX_SEED_LEN).contains(&seed.len()) {
            return Err(EngineError::invalid(format!(
                "AES-KDF seed must be {}..={} bytes, got {}",
                Self::MIN_SEED_LEN,
                Self::MAX_SEED_LEN,
                seed.len()
            )));
        }
        if rounds < 1 {
            return Err(EngineError::invalid("AES-KDF rounds must be >= 1"));
        }
        Ok(Self {
            seed: Zeroizing::new(seed.to_vec()),
            rounds,
        })
    }

    pub fn seed(&self) -> &[u8] {
        &self.seed
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Stretches `raw` and compresses the result with SHA-256.
    pub fn transform(&self, raw: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let stretched = stretch(raw, &self.seed, self.rounds)?;
        Ok(Zeroizing::new(hash(HashAlgorithm::Sha256, &stretched)))
    }
}

impl std::fmt::Debug for AesKdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AesKdf(seed_len={}, rounds={})", self.seed.len(), self.rounds)
    }
}
