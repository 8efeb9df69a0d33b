//! Stable identifiers for hash algorithms and cipher modes, and their
//! resolution into concrete primitives.
//!
//! The integer values are part of the host contract and never change:
//!
//! ```text
//! HashAlgorithm  Sha256 = 0, Sha512 = 1
//! CipherMode     Aes128Cbc = 0, Aes256Cbc = 1, Aes128Ctr = 2, Aes256Ctr = 3,
//!                TwofishCbc = 4, ChaCha20 = 5, Salsa20 = 6, Aes256Gcm = 7,
//!                Invalid = -1
//! Direction      Decrypt = 0, Encrypt = 1
//! ```

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use super::hash::{Digest, Mac};
use super::{BLOCK_LEN, GCM_NONCE_LEN, GCM_TAG_LEN};
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256 = 0,
    Sha512 = 1,
}

impl HashAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Digest (and HMAC tag) length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

impl TryFrom<i32> for HashAlgorithm {
    type Error = EngineError;

    fn try_from(id: i32) -> Result<Self> {
        match id {
            0 => Ok(HashAlgorithm::Sha256),
            1 => Ok(HashAlgorithm::Sha512),
            other => Err(EngineError::UnknownAlgorithm(format!("hash algorithm id {other}"))),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(EngineError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherMode {
    Aes128Cbc = 0,
    Aes256Cbc = 1,
    Aes128Ctr = 2,
    Aes256Ctr = 3,
    TwofishCbc = 4,
    ChaCha20 = 5,
    Salsa20 = 6,
    Aes256Gcm = 7,
    Invalid = -1,
}

impl CipherMode {
    pub const ALL: [CipherMode; 8] = [
        CipherMode::Aes128Cbc,
        CipherMode::Aes256Cbc,
        CipherMode::Aes128Ctr,
        CipherMode::Aes256Ctr,
        CipherMode::TwofishCbc,
        CipherMode::ChaCha20,
        CipherMode::Salsa20,
        CipherMode::Aes256Gcm,
    ];

    /// Canonical primitive name, as used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            CipherMode::Aes128Cbc => "AES-128/CBC",
            CipherMode::Aes256Cbc => "AES-256/CBC",
            CipherMode::Aes128Ctr => "CTR(AES-128)",
            CipherMode::Aes256Ctr => "CTR(AES-256)",
            CipherMode::TwofishCbc => "Twofish/CBC",
            CipherMode::ChaCha20 => "ChaCha20",
            CipherMode::Salsa20 => "Salsa20",
            CipherMode::Aes256Gcm => "AES-256/GCM",
            CipherMode::Invalid => "invalid",
        }
    }

    /// Whether the primitive behind this mode is compiled into this build.
    pub fn is_available(self) -> bool {
        match self {
            CipherMode::TwofishCbc => cfg!(feature = "twofish"),
            CipherMode::Salsa20 => cfg!(feature = "salsa20"),
            CipherMode::Invalid => false,
            _ => true,
        }
    }

    /// Every mode this build can resolve.
    pub fn available() -> impl Iterator<Item = CipherMode> {
        Self::ALL.into_iter().filter(|mode| mode.is_available())
    }

    /// Command-line token.
    pub fn token(self) -> &'static str {
        match self {
            CipherMode::Aes128Cbc => "aes128-cbc",
            CipherMode::Aes256Cbc => "aes256-cbc",
            CipherMode::Aes128Ctr => "aes128-ctr",
            CipherMode::Aes256Ctr => "aes256-ctr",
            CipherMode::TwofishCbc => "twofish-cbc",
            CipherMode::ChaCha20 => "chacha20",
            CipherMode::Salsa20 => "salsa20",
            CipherMode::Aes256Gcm => "aes256-gcm",
            CipherMode::Invalid => "invalid",
        }
    }
}

impl TryFrom<i32> for CipherMode {
    type Error = EngineError;

    fn try_from(id: i32) -> Result<Self> {
        if id == CipherMode::Invalid as i32 {
            return Ok(CipherMode::Invalid);
        }
        CipherMode::ALL
            .into_iter()
            .find(|mode| *mode as i32 == id)
            .ok_or_else(|| EngineError::UnknownAlgorithm(format!("cipher mode id {id}")))
    }
}

impl FromStr for CipherMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.to_ascii_lowercase();
        CipherMode::ALL
            .into_iter()
            .find(|mode| mode.token() == wanted)
            .ok_or_else(|| EngineError::UnknownAlgorithm(s.to_string()))
    }
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Decrypt = 0,
    Encrypt = 1,
}

impl TryFrom<i32> for Direction {
    type Error = EngineError;

    fn try_from(id: i32) -> Result<Self> {
        match id {
            0 => Ok(Direction::Decrypt),
            1 => Ok(Direction::Encrypt),
            other => Err(EngineError::invalid(format!("invalid direction {other}"))),
        }
    }
}

impl FromStr for Direction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "encrypt" | "enc" => Ok(Direction::Encrypt),
            "decrypt" | "dec" => Ok(Direction::Decrypt),
            _ => Err(EngineError::invalid(format!("invalid direction '{s}'"))),
        }
    }
}

/// Underlying block or stream primitive of a cipher mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Aes128,
    Aes256,
    Twofish,
    ChaCha20,
    Salsa20,
}

/// How the primitive is applied to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chaining {
    /// Cipher block chaining with PKCS#7 padding.
    Cbc,
    /// Big-endian 128-bit counter mode.
    Ctr,
    /// Native stream cipher, no chaining wrapper.
    Stream,
    /// Galois/counter mode with a 16-byte appended tag.
    Gcm,
}

/// A resolved (mode, direction) pair, ready to be keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherOp {
    mode: CipherMode,
    direction: Direction,
    primitive: Primitive,
    chaining: Chaining,
}

impl CipherOp {
    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    pub fn chaining(&self) -> Chaining {
        self.chaining
    }

    pub fn name(&self) -> &'static str {
        self.mode.name()
    }

    pub fn is_authenticated(&self) -> bool {
        self.chaining == Chaining::Gcm
    }

    pub fn valid_key_length(&self, len: usize) -> bool {
        // ChaCha20 and Salsa20 also define 128-bit keys; only 256-bit keys are accepted
        match self.primitive {
            Primitive::Aes128 => len == 16,
            Primitive::Twofish => matches!(len, 16 | 24 | 32),
            Primitive::Aes256 | Primitive::ChaCha20 | Primitive::Salsa20 => len == 32,
        }
    }

    /// Human-readable key sizes, for diagnostics.
    pub fn expected_key_length(&self) -> &'static str {
        match self.primitive {
            Primitive::Aes128 => "16 bytes",
            Primitive::Twofish => "16, 24 or 32 bytes",
            Primitive::Aes256 | Primitive::ChaCha20 | Primitive::Salsa20 => "32 bytes",
        }
    }

    pub fn valid_nonce_length(&self, len: usize) -> bool {
        match (self.chaining, self.primitive) {
            (Chaining::Cbc, _) => len == BLOCK_LEN,
            (Chaining::Ctr, _) => (1..=BLOCK_LEN).contains(&len),
            (Chaining::Gcm, _) => len == GCM_NONCE_LEN,
            (Chaining::Stream, Primitive::ChaCha20) => matches!(len, 8 | 12 | 24),
            (Chaining::Stream, _) => matches!(len, 8 | 24),
        }
    }

    /// Nonce length used when generating a fresh nonce for this mode.
    pub fn default_nonce_len(&self) -> usize {
        match (self.chaining, self.primitive) {
            (Chaining::Cbc | Chaining::Ctr, _) => BLOCK_LEN,
            (Chaining::Gcm, _) => GCM_NONCE_LEN,
            (Chaining::Stream, Primitive::ChaCha20) => 12,
            (Chaining::Stream, _) => 8,
        }
    }

    pub fn tag_len(&self) -> usize {
        if self.is_authenticated() { GCM_TAG_LEN } else { 0 }
    }
}

/// Returns a fresh digest state for `algorithm`.
pub fn resolve_digest(algorithm: HashAlgorithm) -> Digest {
    Digest::new(algorithm)
}

/// Returns a MAC state for `algorithm` keyed with `key`.
pub fn resolve_mac(algorithm: HashAlgorithm, key: &[u8]) -> Result<Mac> {
    Mac::new(algorithm, key)
}

/// Maps a mode and direction to the primitive that implements them.
///
/// The `Invalid` sentinel is always rejected before anything is constructed.
pub fn resolve_cipher(mode: CipherMode, direction: Direction) -> Result<CipherOp> {
    let (primitive, chaining) = match mode {
        CipherMode::Aes128Cbc => (Primitive::Aes128, Chaining::Cbc),
        CipherMode::Aes256Cbc => (Primitive::Aes256, Chaining::Cbc),
        CipherMode::Aes128Ctr => (Primitive::Aes128, Chaining::Ctr),
        CipherMode::Aes256Ctr => (Primitive::Aes256, Chaining::Ctr),
        CipherMode::TwofishCbc => (Primitive::Twofish, Chaining::Cbc),
        CipherMode::ChaCha20 => (Primitive::ChaCha20, Chaining::Stream),
        CipherMode::Salsa20 => (Primitive::Salsa20, Chaining::Stream),
        CipherMode::Aes256Gcm => (Primitive::Aes256, Chaining::Gcm),
        CipherMode::Invalid => {
            warn!("resolve_cipher: invalid mode");
            return Err(EngineError::invalid("Invalid mode"));
        }
    };

    if !mode.is_available() {
        warn!("resolve_cipher: {} is not compiled into this build", mode.name());
        return Err(EngineError::UnavailablePrimitive(mode.name().to_string()));
    }

    Ok(CipherOp {
        mode,
        direction,
        primitive,
        chaining,
    })
}
