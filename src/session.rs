//! Incremental digest, MAC and cipher sessions.
//!
//! [`DigestSession`] and [`MacSession`] are owned objects: any number may be
//! open at once. [`Engine`] layers the process-wide boundary on top of them,
//! with one digest slot, one MAC slot and a table of cipher streams.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use parking_lot::{Mutex, const_mutex};

use crate::crypto::{
    CipherMode, CipherStream, Digest, Direction, HashAlgorithm, Mac, resolve_digest, resolve_mac,
};
use crate::error::{EngineError, Result};

pub struct DigestSession {
    digest: Digest,
}

impl DigestSession {
    pub fn start(algorithm: HashAlgorithm) -> Self {
        Self {
            digest: resolve_digest(algorithm),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.digest.algorithm()
    }

    /// Folds `chunk` into the running digest.
    ///
    /// An empty chunk is rejected and leaves the session untouched.
    pub fn update(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.is_empty() {
            return Err(EngineError::invalid("Missing data"));
        }
        self.digest.update(chunk);
        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        self.digest.finalize()
    }
}

impl fmt::Debug for DigestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DigestSession({})", self.algorithm())
    }
}

/// HMAC session; the key is bound at `start` and wiped when the session
/// is finished or dropped.
pub struct MacSession {
    mac: Mac,
}

impl MacSession {
    pub fn start(algorithm: HashAlgorithm, key: &[u8]) -> Result<Self> {
        Ok(Self {
            mac: resolve_mac(algorithm, key)?,
        })
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.mac.algorithm()
    }

    pub fn update(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.is_empty() {
            return Err(EngineError::invalid("Missing data"));
        }
        self.mac.update(chunk);
        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        self.mac.finalize()
    }
}

impl fmt::Debug for MacSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacSession({})", self.algorithm())
    }
}

/// Digest of an ordered list of chunks. Empty chunks are skipped, but the
/// list itself must not be empty.
pub fn digest<C: AsRef<[u8]>>(algorithm: HashAlgorithm, chunks: &[C]) -> Result<Vec<u8>> {
    if chunks.is_empty() {
        return Err(EngineError::invalid("Missing data"));
    }

    let mut session = DigestSession::start(algorithm);
    for chunk in non_empty(chunks) {
        session.update(chunk)?;
    }
    Ok(session.finish())
}

/// HMAC of an ordered list of chunks under `key`.
pub fn mac<C: AsRef<[u8]>>(algorithm: HashAlgorithm, key: &[u8], chunks: &[C]) -> Result<Vec<u8>> {
    if chunks.is_empty() {
        return Err(EngineError::invalid("Missing data"));
    }

    let mut session = MacSession::start(algorithm, key)?;
    for chunk in non_empty(chunks) {
        session.update(chunk)?;
    }
    Ok(session.finish())
}

fn non_empty<C: AsRef<[u8]>>(chunks: &[C]) -> impl Iterator<Item = &[u8]> {
    chunks.iter().map(AsRef::<[u8]>::as_ref).filter(|chunk| !chunk.is_empty())
}

/// Opaque reference to a cipher stream held by an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CipherHandle(u64);

impl CipherHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl From<u64> for CipherHandle {
    fn from(id: u64) -> Self {
        CipherHandle(id)
    }
}

pub struct Engine {
    digest: Mutex<Option<DigestSession>>,
    mac: Mutex<Option<MacSession>>,
    ciphers: Mutex<BTreeMap<CipherHandle, CipherStream>>,
    next_handle: AtomicU64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub const fn new() -> Self {
        Self {
            digest: const_mutex(None),
            mac: const_mutex(None),
            ciphers: const_mutex(BTreeMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn start_digest(&self, algorithm: HashAlgorithm) -> Result<()> {
        let mut slot = self.digest.lock();
        if slot.is_some() {
            warn!("start_digest: a digest session is already open");
            return Err(EngineError::SessionConflict("digest"));
        }
        *slot = Some(DigestSession::start(algorithm));
        debug!("digest session started ({algorithm})");
        Ok(())
    }

    pub fn continue_digest(&self, chunk: &[u8]) -> Result<()> {
        self.digest
            .lock()
            .as_mut()
            .ok_or(EngineError::SessionNotOpen("digest"))?
            .update(chunk)
    }

    pub fn finish_digest(&self) -> Result<Vec<u8>> {
        let session = self
            .digest
            .lock()
            .take()
            .ok_or(EngineError::SessionNotOpen("digest"))?;
        debug!("digest session finished ({})", session.algorithm());
        Ok(session.finish())
    }

    /// One-shot digest; refused while a manual digest session is open.
    pub fn digest<C: AsRef<[u8]>>(
        &self,
        algorithm: HashAlgorithm,
        chunks: &[C],
    ) -> Result<Vec<u8>> {
        let slot = self.digest.lock();
        if slot.is_some() {
            warn!("digest: a digest session is already open");
            return Err(EngineError::SessionConflict("digest"));
        }
        digest(algorithm, chunks)
    }

    pub fn start_mac(&self, algorithm: HashAlgorithm, key: &[u8]) -> Result<()> {
        let mut slot = self.mac.lock();
        if slot.is_some() {
            warn!("start_mac: a MAC session is already open");
            return Err(EngineError::SessionConflict("MAC"));
        }
        *slot = Some(MacSession::start(algorithm, key)?);
        debug!("MAC session started ({algorithm})");
        Ok(())
    }

    pub fn continue_mac(&self, chunk: &[u8]) -> Result<()> {
        self.mac
            .lock()
            .as_mut()
            .ok_or(EngineError::SessionNotOpen("MAC"))?
            .update(chunk)
    }

    pub fn finish_mac(&self) -> Result<Vec<u8>> {
        let session = self
            .mac
            .lock()
            .take()
            .ok_or(EngineError::SessionNotOpen("MAC"))?;
        debug!("MAC session finished ({})", session.algorithm());
        Ok(session.finish())
    }

    pub fn mac<C: AsRef<[u8]>>(
        &self,
        algorithm: HashAlgorithm,
        key: &[u8],
        chunks: &[C],
    ) -> Result<Vec<u8>> {
        let slot = self.mac.lock();
        if slot.is_some() {
            warn!("mac: a MAC session is already open");
            return Err(EngineError::SessionConflict("MAC"));
        }
        mac(algorithm, key, chunks)
    }

    pub fn create_cipher(
        &self,
        mode: CipherMode,
        direction: Direction,
        key: &[u8],
        nonce: &[u8],
    ) -> Result<CipherHandle> {
        let stream = CipherStream::start(mode, direction, key, nonce)?;
        let handle = CipherHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.ciphers.lock().insert(handle, stream);
        debug!("cipher stream {} opened ({mode})", handle.0);
        Ok(handle)
    }

    pub fn process_cipher(&self, handle: CipherHandle, data: &[u8]) -> Result<Vec<u8>> {
        self.ciphers
            .lock()
            .get_mut(&handle)
            .ok_or(EngineError::SessionNotOpen("cipher"))?
            .update(data)
    }

    /// Processes the final data and closes the stream, whether or not the
    /// final step succeeds.
    pub fn finish_cipher(&self, handle: CipherHandle, data: &[u8]) -> Result<Vec<u8>> {
        let stream = self
            .ciphers
            .lock()
            .remove(&handle)
            .ok_or(EngineError::SessionNotOpen("cipher"))?;
        debug!("cipher stream {} finished", handle.0);
        stream.finish(data)
    }

    pub fn destroy_cipher(&self, handle: CipherHandle) -> Result<()> {
        self.ciphers
            .lock()
            .remove(&handle)
            .map(drop)
            .ok_or(EngineError::SessionNotOpen("cipher"))
    }

    pub fn open_ciphers(&self) -> usize {
        self.ciphers.lock().len()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("digest_open", &self.digest.lock().is_some())
            .field("mac_open", &self.mac.lock().is_some())
            .field("ciphers", &self.open_ciphers())
            .finish()
    }
}
