//! HS256 bearer tokens.
//!
//! Two kinds are issued: short-lived access tokens for authenticating
//! requests and longer-lived refresh tokens that can only be exchanged for a
//! new access token. The `token_type` claim keeps them apart.

use chrono::{Duration, Utc};
use domains::{DomainError, DomainResult, TokenPair, TokenService, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

const INVALID_TOKEN: &str = "token is invalid or expired";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
    token_type: TokenType,
}

pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtTokenService {
    pub fn new(secret: &[u8], access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl: seconds(access_ttl_secs),
            refresh_ttl: seconds(refresh_ttl_secs),
        }
    }

    fn sign(&self, user: UserId, token_type: TokenType) -> DomainResult<String> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| DomainError::internal(format!("token signing failed: {err}")))
    }

    fn open(&self, token: &str, expected: TokenType) -> DomainResult<UserId> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            debug!(%err, "rejected bearer token");
            DomainError::Unauthorized(INVALID_TOKEN.to_string())
        })?;
        if data.claims.token_type != expected {
            debug!(?expected, got = ?data.claims.token_type, "wrong token type");
            return Err(DomainError::Unauthorized(INVALID_TOKEN.to_string()));
        }
        data.claims
            .sub
            .parse()
            .map_err(|_| DomainError::Unauthorized(INVALID_TOKEN.to_string()))
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
}

impl TokenService for JwtTokenService {
    fn issue(&self, user: UserId) -> DomainResult<TokenPair> {
        Ok(TokenPair {
            access: self.sign(user, TokenType::Access)?,
            refresh: self.sign(user, TokenType::Refresh)?,
        })
    }

    fn refresh(&self, refresh_token: &str) -> DomainResult<String> {
        let user = self.open(refresh_token, TokenType::Refresh)?;
        self.sign(user, TokenType::Access)
    }

    fn verify_access(&self, access_token: &str) -> DomainResult<UserId> {
        self.open(access_token, TokenType::Access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"an-unremarkable-but-long-enough-test-secret";

    fn service() -> JwtTokenService {
        JwtTokenService::new(SECRET, 300, 86_400)
    }

    #[test]
    fn access_token_round_trips_the_user() {
        let tokens = service().issue(42).unwrap();
        assert_eq!(service().verify_access(&tokens.access).unwrap(), 42);
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let svc = service();
        let tokens = svc.issue(7).unwrap();

        assert!(matches!(
            svc.verify_access(&tokens.refresh),
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            svc.refresh(&tokens.access),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn refresh_yields_a_usable_access_token() {
        let svc = service();
        let tokens = svc.issue(7).unwrap();
        let access = svc.refresh(&tokens.refresh).unwrap();

        assert_ne!(access, tokens.access);
        assert_eq!(svc.verify_access(&access).unwrap(), 7);
    }

    #[test]
    fn every_token_gets_its_own_jti() {
        let tokens = service().issue(1).unwrap();
        let claims = |token: &str| {
            decode::<Claims>(token, &DecodingKey::from_secret(SECRET), &service().validation)
                .unwrap()
                .claims
        };
        assert_ne!(claims(&tokens.access).jti, claims(&tokens.refresh).jti);
        assert!(Uuid::parse_str(&claims(&tokens.access).jti).is_ok());
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let tokens = JwtTokenService::new(b"some-other-secret-of-decent-length!!", 300, 600)
            .issue(1)
            .unwrap();
        assert!(service().verify_access(&tokens.access).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "1".into(),
            iat: now - 600,
            exp: now - 300,
            jti: Uuid::new_v4().to_string(),
            token_type: TokenType::Access,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(
            service().verify_access(&token),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(service().verify_access("not.a.jwt").is_err());
        assert!(service().refresh("").is_err());
    }

    #[test]
    fn claims_serialize_token_type_in_lowercase() {
        let value = serde_json::to_value(TokenType::Refresh).unwrap();
        assert_eq!(value, serde_json::json!("refresh"));
    }
}
