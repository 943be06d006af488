//! Signing key pair and its public JWKS representation.
//!
//! Keys come from configuration as PEM text. Either half may be missing at
//! construction; operations needing it fail with `Configuration` on use.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use utoipa::ToSchema;

use super::ServiceError;
use crate::config::JwtConfig;

const KEY_ID_LEN: usize = 8;

/// Derive the key id of a PEM public key (SPKI or PKCS#1).
///
/// The id depends only on the key, not on its PEM encoding or line endings.
pub fn key_id(public_key_pem: &str) -> Result<String, ServiceError> {
    key_id_of(&parse_public_key(public_key_pem)?)
}

/// First 8 hex chars of SHA-256 over the key's SPKI DER encoding.
fn key_id_of(public_key: &RsaPublicKey) -> Result<String, ServiceError> {
    let der = public_key.to_public_key_der().map_err(|e| {
        ServiceError::Configuration(format!("Failed to encode public key: {}", e))
    })?;
    let digest = Sha256::digest(der.as_bytes());
    let mut kid = hex::encode(digest);
    kid.truncate(KEY_ID_LEN);
    Ok(kid)
}

/// A single RSA verification key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Jwk {
    pub kty: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub kid: String,
    pub alg: String,
    /// Modulus, base64url without padding.
    pub n: String,
    /// Public exponent, base64url without padding.
    pub e: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Public half of the key pair, ready for verification.
#[derive(Clone)]
pub struct VerificationKey {
    kid: String,
    decoding_key: DecodingKey,
    jwk: Jwk,
}

impl VerificationKey {
    /// Parse an SPKI (`PUBLIC KEY`) or PKCS#1 (`RSA PUBLIC KEY`) PEM.
    pub fn from_pem(pem: &str) -> Result<Self, ServiceError> {
        let public_key = parse_public_key(pem)?;
        let kid = key_id_of(&public_key)?;

        let jwk = Jwk {
            kty: "RSA".to_string(),
            key_use: "sig".to_string(),
            kid: kid.clone(),
            alg: "RS256".to_string(),
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        };

        let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).map_err(|e| {
            ServiceError::Configuration(format!("Invalid public key components: {}", e))
        })?;

        Ok(Self {
            kid,
            decoding_key,
            jwk,
        })
    }

    /// Build a verification key from a published JWK.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, ServiceError> {
        if jwk.kty != "RSA" || jwk.alg != "RS256" {
            return Err(ServiceError::Configuration(format!(
                "Unsupported JWK: kty={} alg={}",
                jwk.kty, jwk.alg
            )));
        }

        let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| ServiceError::Configuration(format!("Invalid JWK: {}", e)))?;

        Ok(Self {
            kid: jwk.kid.clone(),
            decoding_key,
            jwk: jwk.clone(),
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }
}

fn parse_public_key(pem: &str) -> Result<RsaPublicKey, ServiceError> {
    let pem = pem.trim();
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| ServiceError::Configuration(format!("Failed to parse public key: {}", e)))
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, ServiceError> {
    let pem = pem.trim();
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| ServiceError::Configuration(format!("Failed to parse private key: {}", e)))
}

struct Inner {
    signing: Option<EncodingKey>,
    verification: Option<VerificationKey>,
}

/// The configured key pair. Immutable after construction and cheap to clone.
#[derive(Clone)]
pub struct KeyMaterial {
    inner: Arc<Inner>,
}

impl KeyMaterial {
    /// Parse the PEM key pair. Absent halves are allowed; malformed ones are not.
    pub fn from_pem(
        private_key_pem: Option<&str>,
        public_key_pem: Option<&str>,
    ) -> Result<Self, ServiceError> {
        let private_key = private_key_pem.map(parse_private_key).transpose()?;
        let verification = public_key_pem.map(VerificationKey::from_pem).transpose()?;

        if let (Some(private_key), Some(public_pem)) = (&private_key, public_key_pem) {
            if RsaPublicKey::from(private_key) != parse_public_key(public_pem)? {
                return Err(ServiceError::Configuration(
                    "Public key does not belong to the configured private key".to_string(),
                ));
            }
        }

        let signing = private_key_pem
            .map(|pem| {
                EncodingKey::from_rsa_pem(pem.trim().as_bytes()).map_err(|e| {
                    ServiceError::Configuration(format!("Failed to load private key: {}", e))
                })
            })
            .transpose()?;

        if let Some(key) = &verification {
            tracing::info!(kid = %key.kid(), "Loaded RS256 verification key");
        }

        Ok(Self {
            inner: Arc::new(Inner {
                signing,
                verification,
            }),
        })
    }

    pub fn from_config(config: &JwtConfig) -> Result<Self, ServiceError> {
        Self::from_pem(
            config.private_key_pem.as_deref(),
            config.public_key_pem.as_deref(),
        )
    }

    pub fn has_signing_key(&self) -> bool {
        self.inner.signing.is_some()
    }

    pub fn has_verification_key(&self) -> bool {
        self.inner.verification.is_some()
    }

    /// `kid` of the configured public key, if any.
    pub fn kid(&self) -> Option<&str> {
        self.inner.verification.as_ref().map(VerificationKey::kid)
    }

    pub fn encoding_key(&self) -> Result<&EncodingKey, ServiceError> {
        self.inner.signing.as_ref().ok_or_else(|| {
            ServiceError::Configuration("JWT private key is not configured".to_string())
        })
    }

    pub fn verification_key(&self) -> Result<&VerificationKey, ServiceError> {
        self.inner.verification.as_ref().ok_or_else(|| {
            ServiceError::Configuration("JWT public key is not configured".to_string())
        })
    }

    /// JWKS document with the single configured verification key.
    pub fn verification_key_set(&self) -> Result<JwkSet, ServiceError> {
        let key = self.verification_key()?;
        Ok(JwkSet {
            keys: vec![key.jwk().clone()],
        })
    }

    /// Fail unless both halves of the pair are present.
    pub fn ensure_complete(&self) -> Result<(), ServiceError> {
        self.encoding_key()?;
        self.verification_key()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_PEM: &str = include_str!("../../tests/fixtures/signing_private.pem");
    const PUBLIC_PEM: &str = include_str!("../../tests/fixtures/signing_public.pem");
    const ROGUE_PUBLIC_PEM: &str = include_str!("../../tests/fixtures/rogue_public.pem");

    #[test]
    fn test_key_id_is_deterministic() {
        let kid = key_id(PUBLIC_PEM).unwrap();
        assert_eq!(kid, key_id(PUBLIC_PEM).unwrap());
        assert_eq!(kid, key_id(&format!("\n{}  \n", PUBLIC_PEM)).unwrap());
        assert_eq!(kid.len(), 8);
        assert!(kid.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_id_ignores_pem_encoding() {
        use rsa::pkcs1::{EncodeRsaPublicKey, LineEnding};

        let kid = key_id(PUBLIC_PEM).unwrap();

        let crlf = PUBLIC_PEM.replace("\r\n", "\n").replace('\n', "\r\n");
        assert_eq!(key_id(&crlf).unwrap(), kid);

        let pkcs1 = RsaPublicKey::from_public_key_pem(PUBLIC_PEM.trim())
            .unwrap()
            .to_pkcs1_pem(LineEnding::LF)
            .unwrap();
        assert!(pkcs1.starts_with("-----BEGIN RSA PUBLIC KEY-----"));
        assert_eq!(key_id(&pkcs1).unwrap(), kid);
        assert_eq!(VerificationKey::from_pem(&pkcs1).unwrap().kid(), kid);
    }

    #[test]
    fn test_key_id_rejects_malformed_pem() {
        assert!(matches!(
            key_id("not a key"),
            Err(ServiceError::Configuration(_))
        ));
    }

    #[test]
    fn test_key_id_differs_per_key() {
        assert_ne!(
            key_id(PUBLIC_PEM).unwrap(),
            key_id(ROGUE_PUBLIC_PEM).unwrap()
        );
    }

    #[test]
    fn test_jwks_document_fields() {
        let keys = KeyMaterial::from_pem(Some(PRIVATE_PEM), Some(PUBLIC_PEM)).unwrap();
        let jwks = keys.verification_key_set().unwrap();

        assert_eq!(jwks.keys.len(), 1);
        let jwk = &jwks.keys[0];
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.key_use, "sig");
        assert_eq!(jwk.alg, "RS256");
        assert_eq!(jwk.kid, key_id(PUBLIC_PEM).unwrap());
        // 65537
        assert_eq!(jwk.e, "AQAB");
        assert!(!jwk.n.contains('='));

        let json = serde_json::to_value(&jwks).unwrap();
        assert_eq!(json["keys"][0]["use"], "sig");
    }

    #[test]
    fn test_missing_public_key_fails_on_use() {
        let keys = KeyMaterial::from_pem(Some(PRIVATE_PEM), None).unwrap();
        assert!(keys.has_signing_key());
        assert!(keys.kid().is_none());
        assert!(matches!(
            keys.verification_key_set(),
            Err(ServiceError::Configuration(_))
        ));
        assert!(keys.ensure_complete().is_err());
    }

    #[test]
    fn test_missing_private_key_fails_on_use() {
        let keys = KeyMaterial::from_pem(None, Some(PUBLIC_PEM)).unwrap();
        assert!(matches!(
            keys.encoding_key(),
            Err(ServiceError::Configuration(_))
        ));
        assert!(keys.verification_key_set().is_ok());
    }

    #[test]
    fn test_malformed_pem_rejected_at_construction() {
        let result = KeyMaterial::from_pem(None, Some("-----BEGIN PUBLIC KEY-----\nnope\n"));
        assert!(matches!(result, Err(ServiceError::Configuration(_))));
    }

    #[test]
    fn test_mismatched_pair_rejected() {
        let result = KeyMaterial::from_pem(Some(PRIVATE_PEM), Some(ROGUE_PUBLIC_PEM));
        assert!(matches!(result, Err(ServiceError::Configuration(_))));
    }

    #[test]
    fn test_jwk_round_trips_into_verification_key() {
        let from_pem = VerificationKey::from_pem(PUBLIC_PEM).unwrap();
        let from_jwk = VerificationKey::from_jwk(from_pem.jwk()).unwrap();
        assert_eq!(from_jwk.kid(), from_pem.kid());

        let mut wrong = from_pem.jwk().clone();
        wrong.alg = "HS256".to_string();
        assert!(VerificationKey::from_jwk(&wrong).is_err());
    }
}
