use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use domains::{DomainError, DomainResult, PasswordHasher};
use tracing::warn;

/// Argon2id with the crate's default cost parameters. Hashes are stored as
/// PHC strings, so the salt and parameters travel with the hash.
#[derive(Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom cost parameters: memory in KiB, iterations and lanes.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> DomainResult<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|err| DomainError::internal(format!("invalid argon2 parameters: {err}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> DomainResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| DomainError::internal(format!("password hashing failed: {err}")))
    }

    fn verify(&self, password: &str, password_hash: &str) -> bool {
        let parsed = match PasswordHash::new(password_hash) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%err, "stored password hash is not a valid PHC string");
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
