//! SHA-2 digests and HMACs with incremental update.

use hmac::{Hmac, Mac as _};
use sha2::{Digest as _, Sha256, Sha512};

use super::registry::HashAlgorithm;
use super::wipe_state;
use crate::error::{EngineError, Result};

enum DigestState {
    Sha256(Sha256),
    Sha512(Sha512),
}

/// Running digest over an open-ended sequence of chunks.
pub struct Digest {
    algorithm: HashAlgorithm,
    state: DigestState,
}

impl Digest {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha256 => DigestState::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => DigestState::Sha512(Sha512::new()),
        };
        Self { algorithm, state }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            DigestState::Sha256(h) => h.update(data),
            DigestState::Sha512(h) => h.update(data),
        }
    }

    pub fn finalize(mut self) -> Vec<u8> {
        match &mut self.state {
            DigestState::Sha256(h) => h.finalize_reset().to_vec(),
            DigestState::Sha512(h) => h.finalize_reset().to_vec(),
        }
    }
}

impl Drop for Digest {
    fn drop(&mut self) {
        match &mut self.state {
            DigestState::Sha256(h) => wipe_state(h),
            DigestState::Sha512(h) => wipe_state(h),
        }
    }
}

enum MacState {
    Sha256(Hmac<Sha256>),
    Sha512(Hmac<Sha512>),
}

/// Running HMAC keyed once at construction.
pub struct Mac {
    algorithm: HashAlgorithm,
    state: MacState,
}

impl Mac {
    pub fn new(algorithm: HashAlgorithm, key: &[u8]) -> Result<Self> {
        if key.is_empty() {
            return Err(EngineError::invalid("Missing key"));
        }

        let key_error = |_| EngineError::InvalidKeyLength {
            primitive: "HMAC",
            expected: "a non-empty key",
            actual: key.len(),
        };
        let state = match algorithm {
            HashAlgorithm::Sha256 => {
                MacState::Sha256(Hmac::<Sha256>::new_from_slice(key).map_err(key_error)?)
            }
            HashAlgorithm::Sha512 => {
                MacState::Sha512(Hmac::<Sha512>::new_from_slice(key).map_err(key_error)?)
            }
        };
        Ok(Self { algorithm, state })
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            MacState::Sha256(m) => m.update(data),
            MacState::Sha512(m) => m.update(data),
        }
    }

    pub fn finalize(mut self) -> Vec<u8> {
        match &mut self.state {
            MacState::Sha256(m) => m.finalize_reset().into_bytes().to_vec(),
            MacState::Sha512(m) => m.finalize_reset().into_bytes().to_vec(),
        }
    }
}

impl Drop for Mac {
    fn drop(&mut self) {
        // the keyed inner/outer states are equivalent to the key itself
        match &mut self.state {
            MacState::Sha256(m) => wipe_state(m),
            MacState::Sha512(m) => wipe_state(m),
        }
    }
}

/// One-shot digest of `data`.
pub fn hash(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut digest = Digest::new(algorithm);
    digest.update(data);
    digest.finalize()
}

/// One-shot HMAC of `data` under `key`.
pub fn hmac(algorithm: HashAlgorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Mac::new(algorithm, key)?;
    mac.update(data);
    Ok(mac.finalize())
}
