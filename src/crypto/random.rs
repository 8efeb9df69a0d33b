use getrandom::fill;

use super::registry::{CipherMode, Direction, resolve_cipher};
use super::{SALT_LEN, SEED_LEN};
use crate::error::{EngineError, Result};

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| EngineError::UnavailablePrimitive("OS random generator".to_string()))
}

/// Generate AES-KDF seed
pub fn generate_seed() -> Result<[u8; SEED_LEN]> {
    let mut seed = [0u8; SEED_LEN];
    secure_random(&mut seed)?;
    Ok(seed)
}

/// Generate Argon2 salt
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Generate a nonce of the preferred length for `mode`
pub fn generate_nonce(mode: CipherMode) -> Result<Vec<u8>> {
    let op = resolve_cipher(mode, Direction::Encrypt)?;
    let mut nonce = vec![0u8; op.default_nonce_len()];
    secure_random(&mut nonce)?;
    Ok(nonce)
}
