use chrono::Utc;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::keys::{Jwk, KeyMaterial, VerificationKey};
use super::resolver::{AuthInfo, RoleResolver};
use super::{ServiceError, TokenError};
use crate::config::JwtConfig;

/// Lifetime used when the configured value cannot be used.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Longest accepted lifetime (365 days).
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 86_400;

/// Claims carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub iss: String,
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not before; always equal to `iat`
    pub nbf: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Organization, serialized as `null` when absent
    pub org_id: Option<Uuid>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub email: String,
    /// Display name
    pub name: String,
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Result<Uuid, ServiceError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| TokenError::Malformed("subject is not a UUID".to_string()).into())
    }
}

/// Token response returned to client
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until expiry
    pub expires_in: i64,
}

/// Parse a lifetime such as `1h`, `7d`, `15m` or `3600` into seconds.
///
/// Anything unparseable, zero, negative or above 365 days falls back to one hour.
pub fn parse_expires_in(value: &str) -> i64 {
    let trimmed = value.trim();

    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((idx, 'h')) => (&trimmed[..idx], 3600),
        Some((idx, 'd')) => (&trimmed[..idx], 86_400),
        Some((idx, 'm')) => (&trimmed[..idx], 60),
        _ => (trimmed, 1),
    };

    match digits
        .parse::<i64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
    {
        Some(seconds) if seconds > 0 && seconds <= MAX_TOKEN_LIFETIME_SECS => seconds,
        _ => {
            tracing::warn!(
                value = %value,
                fallback_seconds = DEFAULT_TOKEN_LIFETIME_SECS,
                "Unusable token lifetime, falling back to default"
            );
            DEFAULT_TOKEN_LIFETIME_SECS
        }
    }
}

/// Builds and signs access tokens from resolved authorization data.
#[derive(Clone)]
pub struct TokenIssuer {
    resolver: RoleResolver,
    keys: KeyMaterial,
    issuer: String,
    audience: String,
    lifetime_secs: i64,
}

impl TokenIssuer {
    pub fn new(resolver: RoleResolver, keys: KeyMaterial, config: &JwtConfig) -> Self {
        let lifetime_secs = parse_expires_in(&config.expires_in);
        tracing::info!(
            issuer = %config.issuer,
            audience = %config.audience,
            lifetime_secs,
            "Token issuer initialized"
        );

        Self {
            resolver,
            keys,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Resolve the user's current roles and issue a signed token.
    pub async fn issue_token(&self, user_id: Uuid) -> Result<IssuedToken, ServiceError> {
        self.keys.encoding_key()?;

        let info = self.resolver.resolve_auth_info(user_id).await?;
        let claims = self.build_claims(&info, Utc::now().timestamp())?;
        let access_token = self.sign_claims(&claims)?;

        tracing::info!(
            user_id = %info.user_id,
            roles = ?claims.roles,
            exp = claims.exp,
            "Issued access token"
        );

        Ok(IssuedToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.lifetime_secs,
        })
    }

    /// Claims for `info` as issued at `now` (epoch seconds).
    pub fn build_claims(
        &self,
        info: &AuthInfo,
        now: i64,
    ) -> Result<AccessTokenClaims, ServiceError> {
        let exp = now.checked_add(self.lifetime_secs).ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!(
                "token expiry overflows: now={} lifetime={}",
                now,
                self.lifetime_secs
            ))
        })?;

        Ok(AccessTokenClaims {
            sub: info.user_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            nbf: now,
            exp,
            org_id: info.organization_id,
            roles: info.roles.clone(),
            permissions: info.permissions.clone(),
            email: info.email.clone(),
            name: info.display_name.clone(),
        })
    }

    /// Sign with RS256; the header carries the `kid` when the public key is known.
    pub fn sign_claims(&self, claims: &AccessTokenClaims) -> Result<String, ServiceError> {
        let encoding_key = self.keys.encoding_key()?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.keys.kid().map(str::to_string);

        encode(&header, claims, encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }
}

/// Verifies RS256 access tokens against a single known key.
#[derive(Clone)]
pub struct TokenVerifier {
    key: Option<VerificationKey>,
    validation: Validation,
}

impl TokenVerifier {
    /// Verifier backed by this service's own key material.
    pub fn new(keys: &KeyMaterial, issuer: &str, audience: &str) -> Self {
        Self {
            key: keys.verification_key().ok().cloned(),
            validation: Self::validation(issuer, audience),
        }
    }

    /// Verifier for a service that only has the published JWKS entry.
    pub fn from_jwk(jwk: &Jwk, issuer: &str, audience: &str) -> Result<Self, ServiceError> {
        Ok(Self {
            key: Some(VerificationKey::from_jwk(jwk)?),
            validation: Self::validation(issuer, audience),
        })
    }

    fn validation(issuer: &str, audience: &str) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "sub", "iss", "aud"]);
        validation
    }

    /// Validate signature, algorithm, key id, temporal claims, issuer and audience.
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, ServiceError> {
        let key = self.key.as_ref().ok_or_else(|| {
            ServiceError::Configuration("JWT public key is not configured".to_string())
        })?;

        self.check(key, token).map_err(|reason| {
            tracing::debug!(reason = %reason, "Rejected access token");
            ServiceError::InvalidToken(reason)
        })
    }

    fn check(&self, key: &VerificationKey, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let header = decode_header(token)?;

        if header.alg != Algorithm::RS256 {
            return Err(TokenError::WrongAlgorithm);
        }
        if let Some(kid) = &header.kid {
            if kid != key.kid() {
                return Err(TokenError::UnknownKey);
            }
        }

        let data = decode::<AccessTokenClaims>(token, key.decoding_key(), &self.validation)?;
        Ok(data.claims)
    }
}
