//! Cryptographic primitive engine for a password-manager credential
//! database.
//!
//! The engine stretches keys with the legacy AES-KDF transform or derives
//! them with Argon2, computes SHA-2 digests and HMACs (one-shot or across
//! many calls), and encrypts or decrypts buffers under a selectable cipher
//! mode.
//!
//! Typed operations live in [`crypto`] and [`session`]; [`api`] exposes the
//! same operations keyed by the raw integer ids a host application passes in.

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod session;

pub use crate::config::EngineConfig;
pub use crate::crypto::{
    AesKdf, Argon2Variant, Argon2Version, CipherMode, CipherStream, Direction, HashAlgorithm,
    KdfParams,
};
pub use crate::error::{EngineError, Result};
pub use crate::session::{CipherHandle, DigestSession, Engine, MacSession, digest, mac};

use zeroize::Zeroizing;

static ENGINE: Engine = Engine::new();

/// The process-wide engine holding the shared digest and MAC slots.
pub fn engine() -> &'static Engine {
    &ENGINE
}

/// Legacy AES-KDF key transform: `rounds` AES-256 encryptions of `key`
/// under `seed`.
pub fn transform_key(key: &[u8], seed: &[u8], rounds: u64) -> Result<Zeroizing<Vec<u8>>> {
    crypto::stretch(key, seed, rounds)
}

/// Encrypts or decrypts `buffer` in place. On failure the buffer is left
/// untouched.
pub fn cipher(
    mode: CipherMode,
    direction: Direction,
    key: &[u8],
    nonce: &[u8],
    buffer: &mut Vec<u8>,
) -> Result<()> {
    crypto::apply_in_place(mode, direction, key, nonce, buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_key_composes_over_rounds() {
        let key = [0x5au8; 16];
        let seed = [0xa5u8; 32];

        for (r1, r2) in [(0, 1), (1, 2), (3, 10), (7, 64)] {
            let direct = transform_key(&key, &seed, r2).unwrap();
            let first = transform_key(&key, &seed, r1).unwrap();
            let rest = transform_key(&first, &seed, r2 - r1).unwrap();
            assert_eq!(*direct, *rest, "r1={r1} r2={r2}");
        }
    }

    #[test]
    fn transform_key_zero_rounds_is_identity() {
        let key = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        assert_eq!(*transform_key(&key, &[9u8; 32], 0).unwrap(), key);
    }

    #[test]
    fn cipher_roundtrips_in_place() {
        let key = [0x10u8; 32];
        for mode in CipherMode::available() {
            let nonce = crypto::generate_nonce(mode).unwrap();
            let key = if matches!(mode, CipherMode::Aes128Cbc | CipherMode::Aes128Ctr) {
                &key[..16]
            } else {
                &key[..]
            };

            let mut buffer = b"correct horse battery staple".to_vec();
            cipher(mode, Direction::Encrypt, key, &nonce, &mut buffer).unwrap();
            assert_ne!(buffer, b"correct horse battery staple", "{mode}");
            cipher(mode, Direction::Decrypt, key, &nonce, &mut buffer).unwrap();
            assert_eq!(buffer, b"correct horse battery staple", "{mode}");
        }
    }

    #[test]
    fn engine_is_shared() {
        assert!(std::ptr::eq(engine(), engine()));
    }
}
