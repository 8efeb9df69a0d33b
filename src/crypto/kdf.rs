use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::KEY_LEN;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Argon2Variant {
    D,
    Id,
}

impl std::str::FromStr for Argon2Variant {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "d" | "argon2d" => Ok(Argon2Variant::D),
            "id" | "argon2id" => Ok(Argon2Variant::Id),
            _ => Err(EngineError::UnknownAlgorithm(format!("argon2 variant '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Argon2Version {
    V10,
    V13,
}

impl TryFrom<u32> for Argon2Version {
    type Error = EngineError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0x10 => Ok(Argon2Version::V10),
            0x13 => Ok(Argon2Version::V13),
            other => Err(EngineError::invalid(format!(
                "unsupported argon2 version 0x{other:x}"
            ))),
        }
    }
}

impl From<Argon2Version> for u32 {
    fn from(version: Argon2Version) -> Self {
        match version {
            Argon2Version::V10 => 0x10,
            Argon2Version::V13 => 0x13,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
    variant: Argon2Variant,
    version: Argon2Version,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            // default memory cost
            mem_cost_kib: 64 * 1024, // 64 MiB
            // default number of iterations
            time_cost: 3,
            // default number of lanes
            parallelism: 2,
            variant: Argon2Variant::Id,
            version: Argon2Version::V13,
        }
    }
}

impl KdfParams {
    pub const MIN_SALT_LEN: usize = 8;
    pub const MAX_SALT_LEN: usize = 64;

    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
            ..Self::default()
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_variant(mut self, variant: Argon2Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_version(mut self, version: Argon2Version) -> Self {
        self.version = version;
        self
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn variant(&self) -> Argon2Variant {
        self.variant
    }

    pub fn version(&self) -> Argon2Version {
        self.version
    }

    pub fn validate(&self) -> Result<()> {
        if self.mem_cost_kib < 8 {
            return Err(EngineError::invalid("argon2 memory cost too low"));
        }
        if self.time_cost < 1 {
            return Err(EngineError::invalid("argon2 time cost must be >= 1"));
        }
        if self.parallelism < 1 {
            return Err(EngineError::invalid("argon2 parallelism must be >= 1"));
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            return Err(EngineError::invalid(
                "argon2 memory cost must be at least 8 * parallelism",
            ));
        }
        Ok(())
    }
}

/// Derives a 32-byte key from `password` with Argon2.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    kdf: KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    kdf.validate()?;

    if !(KdfParams::MIN_SALT_LEN..=KdfParams::MAX_SALT_LEN).contains(&salt.len()) {
        return Err(EngineError::invalid(format!(
            "argon2 salt must be {}..={} bytes, got {}",
            KdfParams::MIN_SALT_LEN,
            KdfParams::MAX_SALT_LEN,
            salt.len()
        )));
    }

    let params = Params::new(
        kdf.mem_cost_kib,
        kdf.time_cost,
        kdf.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| EngineError::invalid(format!("failed to construct Argon2 params: {e}")))?;

    let algorithm = match kdf.variant {
        Argon2Variant::D => Algorithm::Argon2d,
        Argon2Variant::Id => Algorithm::Argon2id,
    };
    let version = match kdf.version {
        Argon2Version::V10 => Version::V0x10,
        Argon2Version::V13 => Version::V0x13,
    };
    let argon2 = Argon2::new(algorithm, version, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, &mut *key)
        .map_err(|e| EngineError::invalid(format!("argon2 key derivation failed: {e}")))?;

    Ok(key)
}
