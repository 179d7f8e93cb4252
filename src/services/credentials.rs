//! Argon2id hashing for passwords and PINs, plus random token generation.
//!
//! Hashing and verification are CPU-intensive and run on the blocking pool.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use crate::config::SecurityConfig;

#[derive(Debug, Clone)]
pub struct SecretHasher {
    config: SecurityConfig,
}

impl SecretHasher {
    #[must_use]
    pub const fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    pub async fn hash(&self, secret: &str) -> Result<String> {
        let secret = secret.to_string();
        let config = self.config.clone();
        task::spawn_blocking(move || hash_secret(&secret, &config))
            .await
            .context("Hashing task panicked")?
    }

    pub async fn verify(&self, secret: &str, hash: &str) -> Result<bool> {
        let secret = secret.to_string();
        let hash = hash.to_string();
        task::spawn_blocking(move || verify_secret(&secret, &hash))
            .await
            .context("Verification task panicked")?
    }
}

pub fn hash_secret(secret: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash secret: {e}"))?;

    Ok(hash.to_string())
}

/// Parameters are read from the PHC string, so hashes made with older
/// settings keep verifying.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate a random single-use token (64 character hex string)
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
