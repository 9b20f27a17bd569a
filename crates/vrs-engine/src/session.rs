//! # Session Tokens
//!
//! HMAC-SHA256 signed bearer tokens and the [`TokenResolver`] that turns
//! them into a [`CapabilityContext`].
//!
//! ## Token Format
//!
//! ```text
//! {role}.{user_id}.{expires_unix}.{hex(hmac_sha256(secret, "{role}.{user_id}.{expires_unix}"))}
//! ```
//!
//! `expires_unix` may be empty for non-expiring service tokens. A token is
//! rejected once `expires_unix <= now`.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use vrs_core::{Clock, Timestamp, UserId};
use vrs_state::Role;

use crate::capability::{CapabilityContext, IdentityResolver, ResourceId};
use crate::directory::VehicleDirectory;
use crate::error::BookingError;

type HmacSha256 = Hmac<Sha256>;

/// Why a token was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The token does not have four dot-separated fields.
    #[error("malformed token: {0}")]
    Malformed(String),
    /// The role field is not a known role.
    #[error("unknown role: {0}")]
    UnknownRole(String),
    /// The user field is not a valid identifier.
    #[error("invalid user id: {0}")]
    InvalidUser(String),
    /// The signature does not match.
    #[error("invalid token signature")]
    BadSignature,
    /// The token expired.
    #[error("token expired at {0}")]
    Expired(i64),
    /// The signing key was rejected by the MAC.
    #[error("invalid signing key")]
    Key,
}

/// The signed content of a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// The caller's role.
    pub role: Role,
    /// The caller.
    pub user_id: UserId,
    /// Expiry as Unix seconds. `None` never expires.
    pub expires_at: Option<i64>,
}

impl SessionClaims {
    fn payload(&self) -> String {
        let expires = self.expires_at.map(|e| e.to_string()).unwrap_or_default();
        format!("{}.{}.{}", self.role.as_str(), self.user_id, expires)
    }

    /// Whether the claims are expired at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at
            .is_some_and(|e| e <= now.as_datetime().timestamp())
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Split a token into its claims and signature without verifying it.
pub fn decode_unverified(token: &str) -> Result<(SessionClaims, String), SessionError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    let [role, user, expires, signature] = parts.as_slice() else {
        return Err(SessionError::Malformed(
            "expected {role}.{user_id}.{expires}.{signature}".into(),
        ));
    };
    let role = Role::parse(role).map_err(|_| SessionError::UnknownRole(role.to_string()))?;
    let user_id = user
        .parse::<UserId>()
        .map_err(|_| SessionError::InvalidUser(user.to_string()))?;
    let expires_at = if expires.is_empty() {
        None
    } else {
        Some(
            expires
                .parse::<i64>()
                .map_err(|_| SessionError::Malformed(format!("invalid expiry: {expires}")))?,
        )
    };
    Ok((
        SessionClaims {
            role,
            user_id,
            expires_at,
        },
        signature.to_string(),
    ))
}

/// Constant-time comparison of two signatures.
///
/// When lengths differ, performs a dummy comparison so timing does not
/// depend on where the mismatch is.
fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Issues and verifies session tokens with a shared secret.
///
/// Custom `Debug` redacts the secret.
#[derive(Clone)]
pub struct SessionSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl SessionSigner {
    /// Create a signer with the given secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn sign(&self, payload: &str) -> Result<String, SessionError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| SessionError::Key)?;
        mac.update(payload.as_bytes());
        Ok(to_hex(&mac.finalize().into_bytes()))
    }

    /// Mint a token for the given claims.
    pub fn issue(&self, claims: &SessionClaims) -> Result<String, SessionError> {
        let payload = claims.payload();
        let signature = self.sign(&payload)?;
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token's signature and expiry, returning its claims.
    pub fn verify(&self, token: &str, now: Timestamp) -> Result<SessionClaims, SessionError> {
        let (claims, signature) = decode_unverified(token)?;
        let expected = self.sign(&claims.payload())?;
        if !constant_time_eq(&signature, &expected) {
            return Err(SessionError::BadSignature);
        }
        if let Some(expires_at) = claims.expires_at.filter(|_| claims.is_expired(now)) {
            return Err(SessionError::Expired(expires_at));
        }
        Ok(claims)
    }
}

/// How the resolver treats signatures.
#[derive(Debug, Clone)]
pub enum SignatureCheck {
    /// Verify every token with this signer.
    Verify(SessionSigner),
    /// Accept any well-formed, unexpired token. Local development only.
    InsecureSkip,
}

/// [`IdentityResolver`] for signed session tokens.
///
/// Agents are granted every vehicle the directory lists under them at the
/// moment of resolution.
#[derive(Debug, Clone)]
pub struct TokenResolver {
    check: SignatureCheck,
    vehicles: Arc<dyn VehicleDirectory>,
    clock: Arc<dyn Clock>,
}

impl TokenResolver {
    /// Create a resolver.
    pub fn new(
        check: SignatureCheck,
        vehicles: Arc<dyn VehicleDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            check,
            vehicles,
            clock,
        }
    }

    fn claims(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let now = self.clock.now();
        match &self.check {
            SignatureCheck::Verify(signer) => signer.verify(token, now),
            SignatureCheck::InsecureSkip => {
                let (claims, _) = decode_unverified(token)?;
                match claims.expires_at {
                    Some(expires_at) if claims.is_expired(now) => {
                        Err(SessionError::Expired(expires_at))
                    }
                    _ => Ok(claims),
                }
            }
        }
    }
}

impl IdentityResolver for TokenResolver {
    fn resolve(&self, token: &str) -> Result<CapabilityContext, BookingError> {
        let claims = self
            .claims(token)
            .map_err(|e| BookingError::Unauthenticated(e.to_string()))?;

        // A directory fault is not the caller's fault: it stays `Storage`.
        let owned: Vec<ResourceId> = if claims.role == Role::Agent {
            self.vehicles
                .list_by_agent(claims.user_id)?
                .into_iter()
                .map(|v| ResourceId::Vehicle(v.id))
                .collect()
        } else {
            Vec::new()
        };

        Ok(CapabilityContext::new(claims.user_id, claims.role, owned))
    }
}
