//! Bearer token issuance and validation.
//!
//! Tokens are HS256 JWTs. The `sub`, `email` and `role` claims can be
//! field-encrypted with the [`FieldCipher`] so that a token leaked to a log
//! does not reveal who it belongs to.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::JwtConfig, error::AppError, security::cipher::FieldCipher};

use super::roles::Role;

/// Authenticated caller, produced from a validated token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    cipher: Option<FieldCipher>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .field("encrypt_claims", &self.cipher.is_some())
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: &JwtConfig, cipher: &FieldCipher) -> anyhow::Result<Self> {
        if config.secret.is_empty() {
            anyhow::bail!("JWT secret is not configured");
        }
        let ttl = Duration::try_hours(config.ttl_hours)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or_else(|| anyhow::anyhow!("JWT TTL of {} hours is out of range", config.ttl_hours))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl,
            cipher: config.encrypt_claims.then(|| cipher.clone()),
        })
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;
        self.issue_with_expiry(identity, now, expires_at)
    }

    /// Issues a token with explicit timestamps.
    pub fn issue_with_expiry(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: self.seal(&identity.user_id.to_string()),
            email: self.seal(&identity.email),
            role: self.seal(identity.role.as_str()),
            exp: expires_at.timestamp().max(0) as usize,
            iat: issued_at.timestamp().max(0) as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    pub fn validate(&self, raw: &str) -> Result<Identity, AppError> {
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized("Missing token".into()));
        }

        let decoded = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AppError::Unauthorized("Invalid or expired token".into())
            })?;
        let claims = decoded.claims;

        let user_id = Uuid::parse_str(&self.open(&claims.sub)?)
            .map_err(|_| AppError::Unauthorized("Malformed token claims".into()))?;
        let email = self.open(&claims.email)?;
        let role = self
            .open(&claims.role)?
            .parse::<Role>()
            .map_err(|_| AppError::Unauthorized("Malformed token claims".into()))?;

        Ok(Identity {
            user_id,
            email,
            role,
        })
    }

    fn seal(&self, value: &str) -> String {
        match &self.cipher {
            Some(cipher) => cipher.encrypt_str(value),
            None => value.to_string(),
        }
    }

    fn open(&self, value: &str) -> Result<String, AppError> {
        match &self.cipher {
            Some(cipher) => cipher
                .decrypt_string(value)
                .map_err(|_| AppError::Unauthorized("Malformed token claims".into())),
            None => Ok(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str, encrypt_claims: bool) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            ttl_hours: 24,
            encrypt_claims,
        }
    }

    fn cipher() -> FieldCipher {
        FieldCipher::new([9u8; 32])
    }

    fn identity() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: "ana@example.com".into(),
            role: Role::Admin,
        }
    }

    fn assert_unauthorized(result: Result<Identity, AppError>) {
        assert!(matches!(result, Err(AppError::Unauthorized(_))), "{result:?}");
    }

    #[test]
    fn round_trips_identity_and_role() {
        for encrypt in [true, false] {
            let service = TokenService::new(&config("secret", encrypt), &cipher()).unwrap();
            let who = identity();
            let token = service.issue(&who).unwrap();
            assert_eq!(service.validate(&token).unwrap(), who);
        }
    }

    #[test]
    fn accepts_bearer_prefix() {
        let service = TokenService::new(&config("secret", true), &cipher()).unwrap();
        let who = identity();
        let token = service.issue(&who).unwrap();
        assert_eq!(service.validate(&format!("Bearer {token}")).unwrap(), who);
    }

    #[test]
    fn encrypted_claims_do_not_leak_role() {
        let service = TokenService::new(&config("secret", true), &cipher()).unwrap();
        let token = service.issue(&identity()).unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        let claims = decode::<Claims>(&token, &DecodingKey::from_secret(b""), &validation)
            .unwrap()
            .claims;
        assert_ne!(claims.role, "admin");
        assert_ne!(claims.email, "ana@example.com");
    }

    #[test]
    fn rejects_expired_token() {
        let service = TokenService::new(&config("secret", true), &cipher()).unwrap();
        let issued = Utc::now() - Duration::hours(48);
        let token = service
            .issue_with_expiry(&identity(), issued, issued + Duration::hours(24))
            .unwrap();
        assert_unauthorized(service.validate(&token));
    }

    #[test]
    fn out_of_range_ttl_is_a_setup_error() {
        let mut huge = config("secret", true);
        huge.ttl_hours = i64::MAX;
        assert!(TokenService::new(&huge, &cipher()).is_err());
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let ours = TokenService::new(&config("secret", true), &cipher()).unwrap();
        let theirs = TokenService::new(&config("other", true), &cipher()).unwrap();
        let token = theirs.issue(&identity()).unwrap();
        assert_unauthorized(ours.validate(&token));
    }

    #[test]
    fn rejects_tampered_payload() {
        let service = TokenService::new(&config("secret", false), &cipher()).unwrap();
        let token = service.issue(&identity()).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1] = parts[1].chars().rev().collect();
        assert_unauthorized(service.validate(&parts.join(".")));
    }

    #[test]
    fn rejects_other_algorithm() {
        let service = TokenService::new(&config("secret", false), &cipher()).unwrap();
        let who = identity();
        let claims = Claims {
            sub: who.user_id.to_string(),
            email: who.email.clone(),
            role: who.role.to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
            iat: Utc::now().timestamp() as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_unauthorized(service.validate(&token));
    }

    #[test]
    fn rejects_missing_and_garbage_tokens() {
        let service = TokenService::new(&config("secret", true), &cipher()).unwrap();
        assert_unauthorized(service.validate(""));
        assert_unauthorized(service.validate("Bearer "));
        assert_unauthorized(service.validate("not.a.jwt"));
    }

    #[test]
    fn rejects_unknown_role_claim() {
        let service = TokenService::new(&config("secret", false), &cipher()).unwrap();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "x@example.com".into(),
            role: "root".into(),
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
            iat: Utc::now().timestamp() as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_unauthorized(service.validate(&token));
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        assert!(TokenService::new(&config("", true), &cipher()).is_err());
    }
}
