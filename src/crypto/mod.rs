//! Cryptographic primitives backing the credential database.
//!
//! Provides legacy key stretching, Argon2 key derivation, digests and MACs,
//! and symmetric encryption under a selectable cipher mode.

use hmac::Hmac;
use sha2::{Sha256, Sha512};

pub mod cipher;
pub mod hash;
pub mod kdf;
pub mod random;
pub mod registry;
pub mod stretch;

pub use cipher::{CipherStream, apply, apply_in_place};
pub use hash::{Digest, Mac};
pub use kdf::{Argon2Variant, Argon2Version, KdfParams, derive_key};
pub use random::{generate_nonce, generate_salt, generate_seed};
pub use registry::{
    CipherMode, CipherOp, Direction, HashAlgorithm, resolve_cipher, resolve_digest, resolve_mac,
};
pub use stretch::{AesKdf, stretch};

/// Length of one AES / Twofish block (16 bytes).
pub const BLOCK_LEN: usize = 16;
/// Length of the AES-KDF seed (32 bytes, an AES-256 key).
pub const SEED_LEN: usize = 32;
/// Length of a derived encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of a freshly generated Argon2 salt (32 bytes).
pub const SALT_LEN: usize = 32;
/// Length of the AES-256-GCM nonce (12 bytes).
pub const GCM_NONCE_LEN: usize = 12;
/// Length of the AES-256-GCM tag (16 bytes).
pub const GCM_TAG_LEN: usize = 16;

/// Primitive states whose bytes may be overwritten with zeros in place.
///
/// # Safety
///
/// The all-zero bit pattern must be a valid value of the implementing type,
/// and the type must own no pointers or references.
unsafe trait PlainState {}

// SAFETY: the SHA-2 cores hold fixed-size word arrays, a block counter and a
// byte buffer with its fill position; all of them are valid at zero.
unsafe impl PlainState for Sha256 {}
unsafe impl PlainState for Sha512 {}
// SAFETY: an HMAC state is two SHA-2 cores, so the same holds.
unsafe impl PlainState for Hmac<Sha256> {}
unsafe impl PlainState for Hmac<Sha512> {}

/// Overwrites a hash or HMAC state before it is released; these states do
/// not implement `Zeroize`.
fn wipe_state<T: PlainState>(state: &mut T) {
    let ptr = state as *mut T as *mut u8;
    for offset in 0..core::mem::size_of::<T>() {
        // SAFETY: `offset` stays within `*state`, and `PlainState` makes the
        // all-zero pattern a valid `T` for its later `Drop`.
        unsafe { ptr.add(offset).write_volatile(0) };
    }
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
}
