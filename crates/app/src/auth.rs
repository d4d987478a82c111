//! Session tokens for the admin login.
//!
//! Tokens are compact HS256 JWTs carrying the username and an expiry 24 hours
//! after issue. Verification checks the algorithm, the signature (in constant
//! time) and the expiry.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Authorization header required")]
    MissingHeader,
    #[error("Bearer token required")]
    NotBearer,
    #[error("Invalid token")]
    Malformed,
    #[error("Invalid token")]
    BadSignature,
    #[error("Invalid token")]
    UnsupportedAlgorithm,
    #[error("Token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub exp: i64,
}

pub struct JwtAuth {
    username: String,
    password: String,
    secret: Vec<u8>,
    ttl: Duration,
}

impl JwtAuth {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        secret: impl AsRef<[u8]>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            secret: secret.as_ref().to_vec(),
            ttl: Duration::hours(24),
        }
    }

    /// Checks the configured admin credentials and issues a token.
    pub fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let username_ok = self.digest_matches(username, &self.username)?;
        let password_ok = self.digest_matches(password, &self.password)?;
        if !(username_ok && password_ok) {
            return Err(AuthError::InvalidCredentials);
        }
        self.issue(username, Utc::now())
    }

    pub fn issue(&self, username: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            username: username.to_string(),
            exp: (now + self.ttl).timestamp(),
        };

        let header = encode_part(&header)?;
        let claims = encode_part(&claims)?;
        let signing_input = format!("{header}.{claims}");
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input)?.finalize().into_bytes());
        Ok(format!("{signing_input}.{signature}"))
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed);
        };

        let decoded_header: Header = decode_part(header)?;
        if decoded_header.alg != ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::Malformed)?;
        self.mac(&format!("{header}.{claims}"))?
            .verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        let claims: Claims = decode_part(claims)?;
        if now.timestamp() > claims.exp {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    /// Validates an `Authorization` header value.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let token = header.strip_prefix("Bearer ").ok_or(AuthError::NotBearer)?;
        self.verify(token, Utc::now())
    }

    /// Compares keyed digests of both values so the check takes the same time
    /// wherever the first difference is.
    fn digest_matches(&self, candidate: &str, expected: &str) -> Result<bool, AuthError> {
        let expected = self.mac(expected)?.finalize().into_bytes();
        Ok(self.mac(candidate)?.verify_slice(&expected).is_ok())
    }

    fn mac(&self, signing_input: &str) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|error| AuthError::Signing(error.to_string()))?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

fn encode_part<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value).map_err(|error| AuthError::Signing(error.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_part<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| AuthError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::Malformed)
}
