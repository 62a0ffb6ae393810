use argon2::{
    Algorithm, Argon2, Params, PasswordHasher as _, Version,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::config::PasswordHashConfig;

/// Argon2id hashing with a configurable cost.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(config: &PasswordHashConfig) -> anyhow::Result<Self> {
        let params = Params::new(
            config.memory_kib.unwrap_or(Params::DEFAULT_M_COST),
            config.iterations.unwrap_or(Params::DEFAULT_T_COST),
            config.parallelism.unwrap_or(Params::DEFAULT_P_COST),
            None,
        )
        .map_err(|e| anyhow::anyhow!("invalid password hash parameters: {e}"))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plaintext: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    /// Returns false for a wrong password and for a hash that cannot be parsed.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        // Parameters are read back from the PHC string, so hashes made with
        // an older cost still verify.
        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
