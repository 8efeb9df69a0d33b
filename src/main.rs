use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
mod auth;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use vaultcrypt::crypto::{self, Argon2Variant, KdfParams};
use vaultcrypt::{
    AesKdf, CipherMode, Direction, DigestSession, EngineConfig, HashAlgorithm, MacSession,
};
use zeroize::Zeroizing;

#[derive(Debug, clap::Args)]
struct Argon2Args {
    /// Argon2 memory cost in KiB (default from config: 65536)
    #[arg(long = "argon-mem")]
    mem_cost_kib: Option<u32>,

    /// Argon2 time cost / iterations (default from config: 3)
    #[arg(long = "argon-time")]
    time_cost: Option<u32>,

    /// Argon2 parallelism (default from config: 2)
    #[arg(long = "argon-parallelism")]
    parallelism: Option<u32>,

    /// Argon2 variant: d or id
    #[arg(long)]
    variant: Option<Argon2Variant>,
}

impl Argon2Args {
    fn to_kdf_params(&self, default: KdfParams) -> anyhow::Result<KdfParams> {
        let params = KdfParams::new(
            self.mem_cost_kib.unwrap_or(default.mem_cost_kib()),
            self.time_cost.unwrap_or(default.time_cost()),
            self.parallelism.unwrap_or(default.parallelism()),
        )?
        .with_variant(self.variant.unwrap_or(default.variant()))
        .with_version(default.version());
        Ok(params)
    }
}

#[derive(Debug, Parser)]
#[command(name = "vaultcrypt")]
#[command(
    version,
    about = "Key derivation, hashing and encryption primitives for credential databases."
)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true, value_name = "PATH", env = "VAULTCRYPT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Applies the AES-KDF key transform
    #[command(arg_required_else_help = true)]
    TransformKey {
        /// Key to transform (hex, a multiple of 16 bytes)
        #[arg(long)]
        key: String,
        /// AES-256 seed (hex, 32 bytes)
        #[arg(long)]
        seed: String,
        /// Number of rounds (default from config)
        #[arg(long)]
        rounds: Option<u64>,
        /// Finish with SHA-256 like a database key transform does
        #[arg(long, default_value_t = false)]
        hash: bool,
    },

    /// Derives a key from the master password with Argon2
    Derive {
        /// Salt (hex); a random one is generated if omitted
        #[arg(long)]
        salt: Option<String>,
        #[command(flatten)]
        argon2: Argon2Args,
    },

    /// Hashes a file, or stdin
    Digest {
        #[arg(long, short)]
        algorithm: HashAlgorithm,
        file: Option<PathBuf>,
    },

    /// Computes an HMAC over a file, or stdin
    #[command(arg_required_else_help = true)]
    Mac {
        #[arg(long, short)]
        algorithm: HashAlgorithm,
        /// HMAC key (hex)
        #[arg(long)]
        key: String,
        file: Option<PathBuf>,
    },

    /// Encrypts or decrypts a file, or stdin
    #[command(arg_required_else_help = true)]
    Cipher {
        /// aes128-cbc, aes256-cbc, aes128-ctr, aes256-ctr, twofish-cbc, chacha20, salsa20
        /// or aes256-gcm
        #[arg(long, short)]
        mode: CipherMode,
        /// encrypt or decrypt
        #[arg(long, short)]
        direction: Direction,
        /// Key (hex)
        #[arg(long)]
        key: String,
        /// Nonce / IV (hex)
        #[arg(long)]
        nonce: String,
        #[arg(long, short)]
        input: Option<PathBuf>,
        /// Output file; hex is printed to stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Prints a random nonce for a cipher mode
    Nonce {
        #[arg(long, short)]
        mode: CipherMode,
    },

    /// Prints a random AES-KDF seed
    Seed,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    let config = EngineConfig::load(args.config.as_deref())?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    match args.command {
        Commands::TransformKey {
            key,
            seed,
            rounds,
            hash,
        } => {
            let key = decode_hex("key", &key)?;
            let seed = decode_hex("seed", &seed)?;
            let rounds = rounds.unwrap_or(config.aes_kdf_rounds);

            let out = if hash {
                AesKdf::new(&seed, rounds)?.transform(&key)?
            } else {
                vaultcrypt::transform_key(&key, &seed, rounds)?
            };
            println!("{}", hex::encode(&*out));
        }
        Commands::Derive { salt, argon2 } => {
            let kdf = argon2.to_kdf_params(config.argon2)?;
            let salt = match salt {
                Some(salt) => decode_hex("salt", &salt)?.to_vec(),
                None => crypto::generate_salt()?.to_vec(),
            };
            let password = auth::read_password()?;
            let key = crypto::derive_key(password.as_bytes(), &salt, kdf)?;
            println!("salt: {}", hex::encode(&salt));
            println!("key:  {}", hex::encode(&*key));
        }
        Commands::Digest { algorithm, file } => {
            let mut session = DigestSession::start(algorithm);
            stream_input(file.as_deref(), config.chunk_size, |chunk| {
                session.update(chunk)
            })?;
            println!("{}", hex::encode(session.finish()));
        }
        Commands::Mac {
            algorithm,
            key,
            file,
        } => {
            let key = decode_hex("key", &key)?;
            let mut session = MacSession::start(algorithm, &key)?;
            stream_input(file.as_deref(), config.chunk_size, |chunk| {
                session.update(chunk)
            })?;
            println!("{}", hex::encode(session.finish()));
        }
        Commands::Cipher {
            mode,
            direction,
            key,
            nonce,
            input,
            output,
        } => {
            let key = decode_hex("key", &key)?;
            let nonce = decode_hex("nonce", &nonce)?;
            let mut buffer = Zeroizing::new(read_input(input.as_deref())?);

            vaultcrypt::cipher(mode, direction, &key, &nonce, &mut buffer)
                .with_context(|| format!("{mode} {direction:?} failed"))?;

            match output {
                Some(path) => fs::write(&path, &*buffer)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{}", hex::encode(&*buffer)),
            }
        }
        Commands::Nonce { mode } => {
            println!("{}", hex::encode(crypto::generate_nonce(mode)?));
        }
        Commands::Seed => {
            println!("{}", hex::encode(crypto::generate_seed()?));
        }
    }

    Ok(())
}

fn decode_hex(what: &str, value: &str) -> Result<Zeroizing<Vec<u8>>> {
    hex::decode(value.trim())
        .map(Zeroizing::new)
        .with_context(|| format!("{what} is not valid hex"))
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    open_input(path)?.read_to_end(&mut data)?;
    Ok(data)
}

/// Feeds the input to `sink` in chunks of at most `chunk_size` bytes.
fn stream_input(
    path: Option<&Path>,
    chunk_size: usize,
    mut sink: impl FnMut(&[u8]) -> vaultcrypt::Result<()>,
) -> Result<()> {
    let mut reader = open_input(path)?;
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sink(&buf[..n])?;
    }
    Ok(())
}
