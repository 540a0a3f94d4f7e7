//! Bearer tokens binding HTTP requests to a logged-in identity.
//!
//! A token reads `{identity}.{expires}.{signature}`: the identity id, the
//! expiry as a unix timestamp, and a hex HMAC-SHA256 over the first two
//! fields keyed with the board's signing secret.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use super::accounts::IdentityId;
use super::error::BoardError;

type HmacSha256 = Hmac<Sha256>;

/// Token handed out at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub identity: IdentityId,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks session tokens.
#[derive(Clone)]
pub struct SessionSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSigner")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionSigner {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into().into_bytes(),
            ttl,
        }
    }

    pub fn issue(&self, identity: IdentityId, now: DateTime<Utc>) -> Result<Session, BoardError> {
        let expires_at = now + self.ttl;
        let payload = format!("{}.{}", identity.0, expires_at.timestamp());
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(Session {
            token: format!("{payload}.{signature}"),
            identity,
            expires_at,
        })
    }

    /// The identity a token was issued to. Forged, altered and expired
    /// tokens are all `Unauthenticated`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityId, BoardError> {
        let (payload, signature) = token
            .trim()
            .rsplit_once('.')
            .ok_or(BoardError::Unauthenticated)?;
        let signature = hex::decode(signature).map_err(|_| BoardError::Unauthenticated)?;
        if self.mac(payload)?.verify_slice(&signature).is_err() {
            tracing::warn!("session token with a bad signature");
            return Err(BoardError::Unauthenticated);
        }

        let (identity, expires) = payload
            .split_once('.')
            .ok_or(BoardError::Unauthenticated)?;
        let identity = identity
            .parse::<u64>()
            .map_err(|_| BoardError::Unauthenticated)?;
        let expires = expires
            .parse::<i64>()
            .map_err(|_| BoardError::Unauthenticated)?;
        if expires <= now.timestamp() {
            tracing::debug!(identity, "session expired");
            return Err(BoardError::Unauthenticated);
        }
        Ok(IdentityId(identity))
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256, BoardError> {
        // HMAC keys may have any length, so this only fails on a broken build.
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| BoardError::Unauthenticated)?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}
