//! HS256 bearer tokens in the JWT compact format.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;
use crate::common::config::AuthConfig;
use crate::common::{AttendanceError, Result};

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Teacher id.
    pub sub: Uuid,
    pub email: String,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AttendanceError::Config("token secret must not be empty".to_string()));
        }
        Ok(Self { secret, ttl })
    }

    /// Reads the secret from the environment variable named in the config.
    /// In dev mode a missing secret is replaced by a random one, which
    /// invalidates tokens on every restart.
    pub fn from_config(auth: &AuthConfig, dev_mode: bool) -> Result<Self> {
        let ttl = Duration::hours(i64::from(auth.token_ttl_hours));

        match std::env::var(&auth.secret_env) {
            Ok(secret) if !secret.is_empty() => Self::new(secret, ttl),
            _ if dev_mode => {
                tracing::warn!("{} is not set, using a random token secret", auth.secret_env);
                let mut secret = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut secret);
                Self::new(secret, ttl)
            }
            _ => Err(AttendanceError::Config(format!(
                "Environment variable {} must hold the token secret", auth.secret_env
            ))),
        }
    }

    pub fn issue(&self, teacher_id: Uuid, email: &str) -> Result<String> {
        self.issue_at(teacher_id, email, Utc::now())
    }

    pub fn issue_at(&self, teacher_id: Uuid, email: &str, now: DateTime<Utc>) -> Result<String> {
        let claims = TokenClaims {
            sub: teacher_id,
            email: email.to_string(),
            exp: (now + self.ttl).timestamp(),
        };
        let claims = serde_json::to_vec(&claims)
            .map_err(|e| AttendanceError::Other(anyhow::anyhow!("Failed to encode claims: {}", e)))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let signature = self.mac(&signing_input)?.finalize().into_bytes();
        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims> {
        let malformed = || AttendanceError::Unauthorized("malformed token".to_string());

        let (signing_input, signature) = token.trim().rsplit_once('.').ok_or_else(malformed)?;
        let (header, claims) = signing_input.split_once('.').ok_or_else(malformed)?;

        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| malformed())?;
        self.mac(signing_input)?
            .verify_slice(&signature)
            .map_err(|_| AttendanceError::Unauthorized("invalid token signature".to_string()))?;

        let header: Header = URL_SAFE_NO_PAD
            .decode(header)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(malformed)?;
        if header.alg != "HS256" {
            return Err(AttendanceError::Unauthorized(format!("unsupported algorithm {}", header.alg)));
        }

        let claims: TokenClaims = URL_SAFE_NO_PAD
            .decode(claims)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(malformed)?;

        if claims.exp <= now.timestamp() {
            return Err(AttendanceError::Unauthorized("token expired".to_string()));
        }
        Ok(claims)
    }

    fn mac(&self, input: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AttendanceError::Other(anyhow::anyhow!("HMAC key error: {}", e)))?;
        mac.update(input.as_bytes());
        Ok(mac)
    }
}
