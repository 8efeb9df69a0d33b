use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tempfile::{TempDir, tempdir};

/// Runs from an empty directory with an empty config, so a local `.env` or
/// platform `config.json` cannot leak into the tests.
fn bin() -> Command {
    static SCRATCH: OnceLock<TempDir> = OnceLock::new();
    let scratch = SCRATCH.get_or_init(|| {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("defaults.json"), "{}").unwrap();
        dir
    });

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vaultcrypt"));
    cmd.current_dir(scratch.path())
        .env("VAULTCRYPT_CONFIG", scratch.path().join("defaults.json"))
        .env_remove("VAULTCRYPT_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn platform_config_home(config: &str) -> TempDir {
    let home = tempdir().unwrap();
    let dir = home.path().join("vaultcrypt");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.json"), config).unwrap();
    home
}

const SHA256_ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

#[test]
fn digest_of_file_matches_known_vector() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("abc.txt");
    fs::write(&file, "abc").unwrap();

    bin()
        .arg("digest")
        .arg("--algorithm")
        .arg("sha256")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(SHA256_ABC));
}

#[test]
fn digest_reads_stdin() {
    bin()
        .arg("digest")
        .arg("-a")
        .arg("sha512")
        .write_stdin("abc")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ddaf35a193617abacc417349ae204131"));
}

#[test]
fn tiny_chunk_size_gives_same_digest() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{ "chunk_size": 1 }"#).unwrap();
    let file = dir.path().join("abc.txt");
    fs::write(&file, "abc").unwrap();

    bin()
        .arg("--config")
        .arg(&config)
        .arg("digest")
        .arg("-a")
        .arg("sha256")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(SHA256_ABC));
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{ "chunk_size": 0 }"#).unwrap();

    bin()
        .env("VAULTCRYPT_CONFIG", &config)
        .arg("seed")
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk_size"));
}

#[cfg(target_os = "linux")]
#[test]
fn platform_config_is_used_without_explicit_one() {
    let home = platform_config_home(r#"{ "chunk_size": 0 }"#);

    bin()
        .env_remove("VAULTCRYPT_CONFIG")
        .env("XDG_CONFIG_HOME", home.path())
        .arg("seed")
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk_size"));
}

#[cfg(target_os = "linux")]
#[test]
fn explicit_config_shadows_platform_config() {
    let home = platform_config_home(r#"{ "chunk_size": 0 }"#);

    bin()
        .env("XDG_CONFIG_HOME", home.path())
        .arg("seed")
        .assert()
        .success();
}

#[test]
fn dotenv_in_working_directory_is_loaded() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".env"), "VAULTCRYPT_PASSWORD=from-dotenv\n").unwrap();
    let derive = |cwd: &Path| {
        bin()
            .current_dir(cwd)
            .arg("derive")
            .arg("--salt")
            .arg("5a".repeat(16))
            .arg("--argon-mem")
            .arg("64")
            .arg("--argon-time")
            .arg("1")
            .arg("--argon-parallelism")
            .arg("1")
            .write_stdin("from-stdin\n")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    };

    let scratch = tempdir().unwrap();
    assert_ne!(derive(dir.path()), derive(scratch.path()));
}

#[test]
fn mac_matches_rfc4231() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("msg.txt");
    fs::write(&file, "what do ya want for nothing?").unwrap();

    bin()
        .arg("mac")
        .arg("-a")
        .arg("sha256")
        .arg("--key")
        .arg(hex::encode("Jefe"))
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843",
        ));
}

#[test]
fn transform_key_single_round() {
    bin()
        .arg("transform-key")
        .arg("--key")
        .arg("00112233445566778899aabbccddeeff")
        .arg("--seed")
        .arg("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f")
        .arg("--rounds")
        .arg("1")
        .assert()
        .success()
        .stdout("8ea2b7ca516745bfeafc49904b496089\n");
}

#[test]
fn transform_key_with_hash_prints_32_bytes() {
    bin()
        .arg("transform-key")
        .arg("--key")
        .arg("00".repeat(32))
        .arg("--seed")
        .arg("11".repeat(32))
        .arg("--rounds")
        .arg("100")
        .arg("--hash")
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{64}\n$").unwrap());
}

#[test]
fn transform_key_rejects_partial_block() {
    bin()
        .arg("transform-key")
        .arg("--key")
        .arg("0011")
        .arg("--seed")
        .arg("11".repeat(32))
        .assert()
        .failure()
        .stderr(predicate::str::contains("multiple"));
}

#[test]
fn gcm_known_answer_from_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("zeros.bin");
    fs::write(&input, [0u8; 16]).unwrap();

    bin()
        .arg("cipher")
        .arg("--mode")
        .arg("aes256-gcm")
        .arg("--direction")
        .arg("encrypt")
        .arg("--key")
        .arg("00".repeat(32))
        .arg("--nonce")
        .arg("00".repeat(12))
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "cea7403d4d606b6e074ec5d3baf39d18d0d1c8a799996bf0265b98b5d48ab919",
        ));
}

#[test]
fn cipher_roundtrip_through_files() {
    let dir = tempdir().unwrap();
    let plain = dir.path().join("plain.txt");
    let sealed = dir.path().join("sealed.bin");
    let opened = dir.path().join("opened.txt");
    fs::write(&plain, "credential database payload").unwrap();

    let key = "42".repeat(32);
    let nonce = "24".repeat(16);

    for (direction, input, output) in [
        ("encrypt", &plain, &sealed),
        ("decrypt", &sealed, &opened),
    ] {
        bin()
            .arg("cipher")
            .arg("-m")
            .arg("aes256-cbc")
            .arg("-d")
            .arg(direction)
            .arg("--key")
            .arg(&key)
            .arg("--nonce")
            .arg(&nonce)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .assert()
            .success();
    }

    assert_eq!(fs::read(&sealed).unwrap().len(), 32);
    assert_eq!(
        fs::read_to_string(&opened).unwrap(),
        "credential database payload"
    );
}

#[test]
fn wrong_nonce_length_fails() {
    bin()
        .arg("cipher")
        .arg("-m")
        .arg("aes256-cbc")
        .arg("-d")
        .arg("encrypt")
        .arg("--key")
        .arg("42".repeat(32))
        .arg("--nonce")
        .arg("24".repeat(8))
        .write_stdin("data")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid IV size of 8 for AES-256/CBC"));
}

#[test]
fn tampered_gcm_fails_authentication() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sealed.bin");
    let mut sealed =
        hex::decode("cea7403d4d606b6e074ec5d3baf39d18d0d1c8a799996bf0265b98b5d48ab919").unwrap();
    sealed[0] ^= 1;
    fs::write(&input, &sealed).unwrap();

    bin()
        .arg("cipher")
        .arg("-m")
        .arg("aes256-gcm")
        .arg("-d")
        .arg("decrypt")
        .arg("--key")
        .arg("00".repeat(32))
        .arg("--nonce")
        .arg("00".repeat(12))
        .arg("-i")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("authentication failed"));
}

#[test]
fn unknown_mode_is_rejected() {
    bin()
        .arg("cipher")
        .arg("-m")
        .arg("rot13")
        .arg("-d")
        .arg("encrypt")
        .arg("--key")
        .arg("00")
        .arg("--nonce")
        .arg("00")
        .assert()
        .failure();
}

#[test]
fn nonce_has_mode_length() {
    bin()
        .arg("nonce")
        .arg("--mode")
        .arg("aes256-gcm")
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{24}\n$").unwrap());
}

#[cfg(feature = "salsa20")]
#[test]
fn salsa20_nonce_is_8_bytes() {
    bin()
        .arg("nonce")
        .arg("--mode")
        .arg("salsa20")
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{16}\n$").unwrap());
}

#[test]
fn seed_is_32_bytes() {
    bin()
        .arg("seed")
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{64}\n$").unwrap());
}

#[test]
fn derive_is_deterministic_for_fixed_salt() {
    let salt = "5a".repeat(16);
    let run = || {
        bin()
            .env("VAULTCRYPT_PASSWORD", "pw")
            .arg("derive")
            .arg("--salt")
            .arg(&salt)
            .arg("--argon-mem")
            .arg("64")
            .arg("--argon-time")
            .arg("1")
            .arg("--argon-parallelism")
            .arg("1")
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("salt: {salt}")))
            .get_output()
            .stdout
            .clone()
    };

    assert_eq!(run(), run());
}

#[test]
fn derive_reads_password_from_stdin() {
    bin()
        .env_remove("VAULTCRYPT_PASSWORD")
        .arg("derive")
        .arg("--argon-mem")
        .arg("64")
        .arg("--argon-time")
        .arg("1")
        .arg("--argon-parallelism")
        .arg("1")
        .arg("--variant")
        .arg("d")
        .write_stdin("pw\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("key:"));
}

#[test]
fn derive_rejects_weak_params() {
    bin()
        .env("VAULTCRYPT_PASSWORD", "pw")
        .arg("derive")
        .arg("--argon-mem")
        .arg("16")
        .arg("--argon-parallelism")
        .arg("4")
        .assert()
        .failure();
}
