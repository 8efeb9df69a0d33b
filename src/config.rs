//! Command-line defaults loaded from a JSON configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::crypto::KdfParams;

pub const CONFIG_ENV: &str = "VAULTCRYPT_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Default Argon2 parameters for `derive`
    pub argon2: KdfParams,
    /// Default AES-KDF round count for `transform-key`
    pub aes_kdf_rounds: u64,
    /// Read size when streaming files into a digest or MAC
    pub chunk_size: usize,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            argon2: KdfParams::default(),
            aes_kdf_rounds: 60_000,
            chunk_size: 64 * 1024,
            log_level: "warn".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads the configuration.
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used if present, and the built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be greater than zero");
        }
        if self.aes_kdf_rounds == 0 {
            bail!("aes_kdf_rounds must be >= 1");
        }
        self.argon2
            .validate()
            .context("invalid argon2 parameters in config")?;
        Ok(())
    }
}

/// `config.json` in the platform configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "vaultcrypt").map(|dirs| dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "chunk_size": 4096 }"#).unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.aes_kdf_rounds, EngineConfig::default().aes_kdf_rounds);
        assert_eq!(config.argon2, KdfParams::default());
    }

    #[test]
    fn argon2_section_roundtrips() {
        let config = EngineConfig {
            argon2: KdfParams::new(256, 2, 1).unwrap(),
            ..EngineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert!(json.contains("\"version\":19"));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "chunk_size": 0 }"#).unwrap();

        assert!(EngineConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn weak_argon2_params_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "argon2": {
                    "mem_cost_kib": 16,
                    "time_cost": 1,
                    "parallelism": 4,
                    "variant": "id",
                    "version": 19
                }
            }"#,
        )
        .unwrap();

        assert!(EngineConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(EngineConfig::load(Some(&dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "chunk_sise": 10 }"#).unwrap();

        assert!(EngineConfig::load(Some(&path)).is_err());
    }
}
