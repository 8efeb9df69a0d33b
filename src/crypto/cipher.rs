//! Symmetric encryption and decryption under a selectable cipher mode.
//!
//! Every call is validated in a fixed order before any keystream or block
//! operation runs:
//!
//! 1. key, nonce and data must be present
//! 2. the mode must not be the `Invalid` sentinel
//! 3. the primitive for (mode, direction) must be available
//! 4. the key must fit the primitive
//! 5. the nonce must fit the mode
//!
//! A failed call never hands back partial output.

use aes::cipher::{
    BlockCipher, BlockDecryptMut, BlockEncryptMut, InnerIvInit, InvalidLength, KeyInit,
    KeyIvInit, StreamCipher, generic_array::GenericArray,
};
use aes::{Aes128, Aes256};
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use log::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

#[cfg(feature = "salsa20")]
use salsa20::{Salsa20, XSalsa20};
#[cfg(feature = "twofish")]
use twofish::Twofish;

use super::registry::{Chaining, CipherMode, CipherOp, Direction, Primitive, resolve_cipher};
use super::{BLOCK_LEN, GCM_NONCE_LEN, GCM_TAG_LEN};
use crate::error::{EngineError, Result};

/// Encrypts or decrypts `buffer` in one call.
///
/// The authenticated mode appends its tag on encrypt and verifies and strips
/// it on decrypt.
pub fn apply(
    mode: CipherMode,
    direction: Direction,
    key: &[u8],
    nonce: &[u8],
    buffer: &[u8],
) -> Result<Vec<u8>> {
    check_inputs(key, nonce, buffer)?;
    CipherStream::start(mode, direction, key, nonce)?.finish(buffer)
}

/// Like [`apply`], but replaces `buffer` with the result.
///
/// On failure `buffer` is left exactly as it was.
pub fn apply_in_place(
    mode: CipherMode,
    direction: Direction,
    key: &[u8],
    nonce: &[u8],
    buffer: &mut Vec<u8>,
) -> Result<()> {
    let out = apply(mode, direction, key, nonce, buffer)?;
    let mut previous = std::mem::replace(buffer, out);
    previous.zeroize();
    Ok(())
}

pub(crate) fn check_inputs(key: &[u8], nonce: &[u8], data: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(EngineError::invalid("Missing key"));
    }
    if nonce.is_empty() {
        return Err(EngineError::invalid("Missing IV"));
    }
    if data.is_empty() {
        return Err(EngineError::invalid("Missing data"));
    }
    Ok(())
}

/// A keyed cipher that can be fed data across several calls.
pub struct CipherStream {
    op: CipherOp,
    transform: Transform,
}

impl CipherStream {
    pub fn start(
        mode: CipherMode,
        direction: Direction,
        key: &[u8],
        nonce: &[u8],
    ) -> Result<Self> {
        if key.is_empty() {
            return Err(EngineError::invalid("Missing key"));
        }
        if nonce.is_empty() {
            return Err(EngineError::invalid("Missing IV"));
        }

        let op = resolve_cipher(mode, direction)?;

        if !op.valid_key_length(key.len()) {
            warn!("invalid key size of {} for {}", key.len(), op.name());
            return Err(key_length_error(&op, key.len()));
        }

        if !op.valid_nonce_length(nonce.len()) {
            warn!("invalid IV size of {} for {}", nonce.len(), op.name());
            return Err(EngineError::InvalidNonceLength {
                mode: op.name(),
                actual: nonce.len(),
            });
        }

        let transform = Transform::new(&op, key, nonce)?;
        debug!("started {} {:?}", op.name(), op.direction());

        Ok(Self { op, transform })
    }

    pub fn op(&self) -> &CipherOp {
        &self.op
    }

    /// Transforms as much of the data seen so far as can be decided now.
    ///
    /// CBC holds back partial blocks (and, when decrypting, the final block
    /// for unpadding); GCM holds everything until [`CipherStream::finish`].
    pub fn update(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let hold_back_last = self.op.direction() == Direction::Decrypt;
        match &mut self.transform {
            Transform::Stream(keystream) => {
                let mut out = data.to_vec();
                keystream.apply(&mut out)?;
                Ok(out)
            }
            Transform::Chain { chain, pending } => {
                pending.extend_from_slice(data);
                Ok(drain_blocks(chain, pending, hold_back_last))
            }
            Transform::Sealed { pending, .. } => {
                pending.extend_from_slice(data);
                Ok(Vec::new())
            }
        }
    }

    /// Processes the final data and closes the stream.
    pub fn finish(self, data: &[u8]) -> Result<Vec<u8>> {
        let direction = self.op.direction();
        match self.transform {
            Transform::Stream(mut keystream) => {
                let mut out = data.to_vec();
                keystream.apply(&mut out)?;
                Ok(out)
            }
            Transform::Chain { chain, mut pending } => {
                pending.extend_from_slice(data);
                match direction {
                    Direction::Encrypt => pad_and_seal_chain(chain, pending),
                    Direction::Decrypt => open_chain_and_unpad(chain, pending),
                }
            }
            Transform::Sealed {
                cipher,
                nonce,
                mut pending,
            } => {
                pending.extend_from_slice(data);
                match direction {
                    Direction::Encrypt => gcm_seal(&cipher, &nonce, pending),
                    Direction::Decrypt => gcm_open(&cipher, &nonce, pending),
                }
            }
        }
    }
}

impl std::fmt::Debug for CipherStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CipherStream({}, {:?})",
            self.op.name(),
            self.op.direction()
        )
    }
}

enum Transform {
    Chain {
        chain: BlockChain,
        pending: Zeroizing<Vec<u8>>,
    },
    Stream(Keystream),
    Sealed {
        cipher: Box<Aes256Gcm>,
        nonce: [u8; GCM_NONCE_LEN],
        pending: Zeroizing<Vec<u8>>,
    },
}

impl Transform {
    fn new(op: &CipherOp, key: &[u8], nonce: &[u8]) -> Result<Self> {
        match op.chaining() {
            Chaining::Cbc => Ok(Transform::Chain {
                chain: BlockChain::new(op, key, nonce)?,
                pending: Zeroizing::new(Vec::new()),
            }),
            Chaining::Ctr | Chaining::Stream => {
                Ok(Transform::Stream(Keystream::new(op, key, nonce)?))
            }
            Chaining::Gcm => {
                let cipher =
                    Aes256Gcm::new_from_slice(key).map_err(|_| key_length_error(op, key.len()))?;
                let nonce = nonce
                    .try_into()
                    .map_err(|_| EngineError::InvalidNonceLength {
                        mode: op.name(),
                        actual: nonce.len(),
                    })?;
                Ok(Transform::Sealed {
                    cipher: Box::new(cipher),
                    nonce,
                    pending: Zeroizing::new(Vec::new()),
                })
            }
        }
    }
}

fn key_length_error(op: &CipherOp, actual: usize) -> EngineError {
    EngineError::InvalidKeyLength {
        primitive: op.name(),
        expected: op.expected_key_length(),
        actual,
    }
}

enum BlockChain {
    Aes128Enc(cbc::Encryptor<Aes128>),
    Aes128Dec(cbc::Decryptor<Aes128>),
    Aes256Enc(cbc::Encryptor<Aes256>),
    Aes256Dec(cbc::Decryptor<Aes256>),
    #[cfg(feature = "twofish")]
    TwofishEnc(cbc::Encryptor<Twofish>),
    #[cfg(feature = "twofish")]
    TwofishDec(cbc::Decryptor<Twofish>),
}

fn cbc_encryptor<C>(key: &[u8], iv: &[u8]) -> std::result::Result<cbc::Encryptor<C>, InvalidLength>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    cbc::Encryptor::inner_iv_slice_init(C::new_from_slice(key)?, iv)
}

fn cbc_decryptor<C>(key: &[u8], iv: &[u8]) -> std::result::Result<cbc::Decryptor<C>, InvalidLength>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    cbc::Decryptor::inner_iv_slice_init(C::new_from_slice(key)?, iv)
}

impl BlockChain {
    fn new(op: &CipherOp, key: &[u8], iv: &[u8]) -> Result<Self> {
        let encrypt = op.direction() == Direction::Encrypt;
        let chain = match (op.primitive(), encrypt) {
            (Primitive::Aes128, true) => cbc_encryptor(key, iv).map(BlockChain::Aes128Enc),
            (Primitive::Aes128, false) => cbc_decryptor(key, iv).map(BlockChain::Aes128Dec),
            (Primitive::Aes256, true) => cbc_encryptor(key, iv).map(BlockChain::Aes256Enc),
            (Primitive::Aes256, false) => cbc_decryptor(key, iv).map(BlockChain::Aes256Dec),
            #[cfg(feature = "twofish")]
            (Primitive::Twofish, true) => cbc_encryptor(key, iv).map(BlockChain::TwofishEnc),
            #[cfg(feature = "twofish")]
            (Primitive::Twofish, false) => cbc_decryptor(key, iv).map(BlockChain::TwofishDec),
            _ => return Err(EngineError::UnavailablePrimitive(op.name().to_string())),
        };
        chain.map_err(|_| key_length_error(op, key.len()))
    }

    fn process(&mut self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            BlockChain::Aes128Enc(c) => c.encrypt_block_mut(block),
            BlockChain::Aes128Dec(c) => c.decrypt_block_mut(block),
            BlockChain::Aes256Enc(c) => c.encrypt_block_mut(block),
            BlockChain::Aes256Dec(c) => c.decrypt_block_mut(block),
            #[cfg(feature = "twofish")]
            BlockChain::TwofishEnc(c) => c.encrypt_block_mut(block),
            #[cfg(feature = "twofish")]
            BlockChain::TwofishDec(c) => c.decrypt_block_mut(block),
        }
    }
}

/// Processes every whole block in `pending`, optionally keeping the final
/// whole block back.
fn drain_blocks(chain: &mut BlockChain, pending: &mut Vec<u8>, hold_back_last: bool) -> Vec<u8> {
    let mut ready = pending.len() - pending.len() % BLOCK_LEN;
    if hold_back_last && ready == pending.len() {
        ready = ready.saturating_sub(BLOCK_LEN);
    }

    let mut out: Vec<u8> = pending.drain(..ready).collect();
    for block in out.chunks_exact_mut(BLOCK_LEN) {
        chain.process(block);
    }
    out
}

fn pad_and_seal_chain(mut chain: BlockChain, mut pending: Zeroizing<Vec<u8>>) -> Result<Vec<u8>> {
    let mut out = Zeroizing::new(drain_blocks(&mut chain, &mut pending, false));

    // PKCS#7: always at least one byte of padding
    let pad = BLOCK_LEN - pending.len();
    let mut last = Zeroizing::new([pad as u8; BLOCK_LEN]);
    last[..pending.len()].copy_from_slice(&pending);
    chain.process(&mut last[..]);
    out.extend_from_slice(&last[..]);

    Ok(std::mem::take(&mut *out))
}

fn open_chain_and_unpad(mut chain: BlockChain, mut pending: Zeroizing<Vec<u8>>) -> Result<Vec<u8>> {
    if pending.is_empty() || pending.len() % BLOCK_LEN != 0 {
        return Err(EngineError::InvalidPadding);
    }

    let mut out = Zeroizing::new(drain_blocks(&mut chain, &mut pending, true));

    let mut last = Zeroizing::new(std::mem::take(&mut *pending));
    chain.process(&mut last);

    let pad = last[BLOCK_LEN - 1] as usize;
    if pad == 0 || pad > BLOCK_LEN || last[BLOCK_LEN - pad..].iter().any(|&b| b as usize != pad) {
        return Err(EngineError::InvalidPadding);
    }
    out.extend_from_slice(&last[..BLOCK_LEN - pad]);

    Ok(std::mem::take(&mut *out))
}

fn gcm_seal(cipher: &Aes256Gcm, nonce: &[u8], mut buffer: Zeroizing<Vec<u8>>) -> Result<Vec<u8>> {
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buffer)
        .map_err(|_| EngineError::invalid("plaintext too long for AES-256/GCM"))?;
    buffer.extend_from_slice(&tag);
    Ok(std::mem::take(&mut *buffer))
}

fn gcm_open(cipher: &Aes256Gcm, nonce: &[u8], mut buffer: Zeroizing<Vec<u8>>) -> Result<Vec<u8>> {
    if buffer.len() < GCM_TAG_LEN {
        return Err(EngineError::AuthenticationFailed);
    }

    let split = buffer.len() - GCM_TAG_LEN;
    let tag = Tag::clone_from_slice(&buffer[split..]);
    buffer.truncate(split);

    cipher
        .decrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buffer, &tag)
        .map_err(|_| EngineError::AuthenticationFailed)?;
    Ok(std::mem::take(&mut *buffer))
}

enum Keystream {
    Aes128Ctr(ctr::Ctr128BE<Aes128>),
    Aes256Ctr(ctr::Ctr128BE<Aes256>),
    ChaCha20Legacy(chacha20::ChaCha20Legacy),
    ChaCha20(chacha20::ChaCha20),
    XChaCha20(chacha20::XChaCha20),
    #[cfg(feature = "salsa20")]
    Salsa20(Salsa20),
    #[cfg(feature = "salsa20")]
    XSalsa20(XSalsa20),
}

impl Keystream {
    fn new(op: &CipherOp, key: &[u8], nonce: &[u8]) -> Result<Self> {
        let stream = match (op.primitive(), nonce.len()) {
            (Primitive::Aes128, _) => {
                ctr::Ctr128BE::new_from_slices(key, &counter_block(nonce)).map(Keystream::Aes128Ctr)
            }
            (Primitive::Aes256, _) => {
                ctr::Ctr128BE::new_from_slices(key, &counter_block(nonce)).map(Keystream::Aes256Ctr)
            }
            (Primitive::ChaCha20, 8) => {
                chacha20::ChaCha20Legacy::new_from_slices(key, nonce).map(Keystream::ChaCha20Legacy)
            }
            (Primitive::ChaCha20, 12) => {
                chacha20::ChaCha20::new_from_slices(key, nonce).map(Keystream::ChaCha20)
            }
            (Primitive::ChaCha20, _) => {
                chacha20::XChaCha20::new_from_slices(key, nonce).map(Keystream::XChaCha20)
            }
            #[cfg(feature = "salsa20")]
            (Primitive::Salsa20, 8) => Salsa20::new_from_slices(key, nonce).map(Keystream::Salsa20),
            #[cfg(feature = "salsa20")]
            (Primitive::Salsa20, _) => {
                XSalsa20::new_from_slices(key, nonce).map(Keystream::XSalsa20)
            }
            _ => return Err(EngineError::UnavailablePrimitive(op.name().to_string())),
        };
        stream.map_err(|_| key_length_error(op, key.len()))
    }

    fn apply(&mut self, buf: &mut [u8]) -> Result<()> {
        let applied = match self {
            Keystream::Aes128Ctr(c) => c.try_apply_keystream(buf),
            Keystream::Aes256Ctr(c) => c.try_apply_keystream(buf),
            Keystream::ChaCha20Legacy(c) => c.try_apply_keystream(buf),
            Keystream::ChaCha20(c) => c.try_apply_keystream(buf),
            Keystream::XChaCha20(c) => c.try_apply_keystream(buf),
            #[cfg(feature = "salsa20")]
            Keystream::Salsa20(c) => c.try_apply_keystream(buf),
            #[cfg(feature = "salsa20")]
            Keystream::XSalsa20(c) => c.try_apply_keystream(buf),
        };
        applied.map_err(|_| EngineError::invalid("keystream exhausted for this nonce"))
    }
}

/// CTR nonces shorter than a block are right-padded with zeros.
fn counter_block(nonce: &[u8]) -> [u8; BLOCK_LEN] {
    let mut block = [0u8; BLOCK_LEN];
    block[..nonce.len()].copy_from_slice(nonce);
    block
}
