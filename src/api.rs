//! Host-facing boundary keyed by raw integer ids.
//!
//! Ids are decoded here and everything else is delegated to the typed
//! engine. `start_*` and `continue_*` report only success or failure, and
//! log the reason of a failure; every other call returns the typed error.

use log::warn;
use zeroize::Zeroizing;

use crate::crypto::cipher::check_inputs;
use crate::crypto::{CipherMode, Direction, HashAlgorithm, stretch};
use crate::engine;
use crate::error::{EngineError, Result};
use crate::session::CipherHandle;

pub fn transform_key(key: &[u8], seed: &[u8], rounds: i64) -> Result<Zeroizing<Vec<u8>>> {
    let rounds = u64::try_from(rounds)
        .map_err(|_| EngineError::invalid(format!("negative round count {rounds}")))?;
    stretch(key, seed, rounds)
}

pub fn digest<C: AsRef<[u8]>>(algorithm: i32, chunks: &[C]) -> Result<Vec<u8>> {
    engine().digest(HashAlgorithm::try_from(algorithm)?, chunks)
}

pub fn mac<C: AsRef<[u8]>>(algorithm: i32, key: &[u8], chunks: &[C]) -> Result<Vec<u8>> {
    engine().mac(HashAlgorithm::try_from(algorithm)?, key, chunks)
}

pub fn start_digest(algorithm: i32) -> bool {
    report(
        "start_digest",
        HashAlgorithm::try_from(algorithm).and_then(|alg| engine().start_digest(alg)),
    )
}

pub fn continue_digest(chunk: &[u8]) -> bool {
    report("continue_digest", engine().continue_digest(chunk))
}

pub fn finish_digest() -> Result<Vec<u8>> {
    engine().finish_digest()
}

pub fn start_mac(algorithm: i32, key: &[u8]) -> bool {
    report(
        "start_mac",
        HashAlgorithm::try_from(algorithm).and_then(|alg| engine().start_mac(alg, key)),
    )
}

pub fn continue_mac(chunk: &[u8]) -> bool {
    report("continue_mac", engine().continue_mac(chunk))
}

pub fn finish_mac() -> Result<Vec<u8>> {
    engine().finish_mac()
}

/// Encrypts or decrypts `buffer` in place.
///
/// Missing inputs are reported before the ids are looked at.
pub fn cipher(
    mode: i32,
    direction: i32,
    key: &[u8],
    nonce: &[u8],
    buffer: &mut Vec<u8>,
) -> Result<()> {
    check_inputs(key, nonce, buffer)?;
    let mode = CipherMode::try_from(mode)?;
    let direction = Direction::try_from(direction)?;
    crate::cipher(mode, direction, key, nonce, buffer)
}

pub fn create_cipher(mode: i32, direction: i32, key: &[u8], nonce: &[u8]) -> Result<u64> {
    let mode = CipherMode::try_from(mode)?;
    let direction = Direction::try_from(direction)?;
    engine()
        .create_cipher(mode, direction, key, nonce)
        .map(CipherHandle::id)
}

pub fn process_cipher(handle: u64, data: &[u8]) -> Result<Vec<u8>> {
    engine().process_cipher(CipherHandle::from(handle), data)
}

pub fn finish_cipher(handle: u64, data: &[u8]) -> Result<Vec<u8>> {
    engine().finish_cipher(CipherHandle::from(handle), data)
}

pub fn destroy_cipher(handle: u64) -> bool {
    report(
        "destroy_cipher",
        engine().destroy_cipher(CipherHandle::from(handle)),
    )
}

fn report(call: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("{call} failed: {e}");
            false
        }
    }
}
