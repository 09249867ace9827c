//! # Auth adapters
//!
//! Credential primitives behind the `PasswordHasher` and `TokenService` ports:
//! Argon2id password hashing and HS256 JWT access/refresh tokens.

pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtTokenService;
pub use password::Argon2Hasher;
