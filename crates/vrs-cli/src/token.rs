//! # Token Subcommand
//!
//! Mint and inspect session tokens. The format and signature scheme are
//! those of `vrs_engine::session`, so tokens minted here are accepted by
//! any server sharing the secret.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;

use vrs_core::{Timestamp, UserId};
use vrs_engine::session::decode_unverified;
use vrs_engine::{SessionClaims, SessionSigner};
use vrs_state::Role;

/// Arguments for `vrs token`.
#[derive(Args, Debug)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands.
#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Mint a signed session token.
    Issue {
        /// Role the token grants: client, agent or admin.
        #[arg(long)]
        role: String,
        /// Account identifier (UUID).
        #[arg(long)]
        user: String,
        /// Lifetime in hours. Ignored with --no-expiry.
        #[arg(long, default_value_t = 24)]
        ttl_hours: u32,
        /// Mint a token that never expires (service accounts).
        #[arg(long)]
        no_expiry: bool,
        /// Environment variable holding the signing secret.
        #[arg(long, default_value = "AUTH_SECRET")]
        secret_env: String,
    },

    /// Decode a token and print its claims as JSON.
    Inspect {
        /// The token.
        #[arg(value_name = "TOKEN")]
        token: String,
        /// Also verify signature and expiry with the secret.
        #[arg(long)]
        verify: bool,
        /// Environment variable holding the signing secret.
        #[arg(long, default_value = "AUTH_SECRET")]
        secret_env: String,
    },
}

/// Claims as printed by `inspect`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ClaimsView {
    /// Role name.
    pub role: String,
    /// Account identifier.
    pub user_id: String,
    /// Expiry as Unix seconds, if any.
    pub expires_at: Option<i64>,
    /// Whether the token has expired.
    pub expired: bool,
    /// Whether the signature was checked and matched.
    pub verified: bool,
}

/// Execute the token subcommand.
pub fn run_token(args: &TokenArgs) -> Result<u8> {
    match &args.command {
        TokenCommand::Issue {
            role,
            user,
            ttl_hours,
            no_expiry,
            secret_env,
        } => {
            let secret = crate::secret_from_env(secret_env)?;
            let ttl = (!no_expiry).then_some(*ttl_hours);
            let token = issue(&secret, role, user, ttl)?;
            println!("{token}");
            Ok(0)
        }
        TokenCommand::Inspect {
            token,
            verify,
            secret_env,
        } => {
            let secret = if *verify {
                Some(crate::secret_from_env(secret_env)?)
            } else {
                None
            };
            let view = inspect(token, secret.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(0)
        }
    }
}

/// Mint a token for `role` and `user`, expiring after `ttl_hours` if given.
pub fn issue(secret: &str, role: &str, user: &str, ttl_hours: Option<u32>) -> Result<String> {
    let role = Role::parse(role)?;
    let user_id: UserId = user.parse()?;
    let expires_at =
        ttl_hours.map(|h| (Utc::now() + Duration::hours(i64::from(h))).timestamp());
    let claims = SessionClaims {
        role,
        user_id,
        expires_at,
    };
    tracing::info!(%role, %user_id, ?expires_at, "issuing session token");
    SessionSigner::new(secret)
        .issue(&claims)
        .context("failed to sign token")
}

/// Decode a token. With a secret, signature and expiry are enforced.
pub fn inspect(token: &str, secret: Option<&str>) -> Result<ClaimsView> {
    let now = Timestamp::now();
    let claims = match secret {
        Some(secret) => SessionSigner::new(secret)
            .verify(token, now)
            .context("token rejected")?,
        None => decode_unverified(token).context("token malformed")?.0,
    };
    Ok(ClaimsView {
        role: claims.role.as_str().to_string(),
        user_id: claims.user_id.to_string(),
        expires_at: claims.expires_at,
        expired: claims.is_expired(now),
        verified: secret.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let user = UserId::new();
        let token = issue("k", "agent", &user.to_string(), Some(2)).unwrap();
        let view = inspect(&token, Some("k")).unwrap();
        assert_eq!(view.role, "agent");
        assert_eq!(view.user_id, user.to_string());
        assert!(view.verified);
        assert!(!view.expired);
        assert!(view.expires_at.is_some());
    }

    #[test]
    fn no_expiry_token_has_empty_expiry() {
        let user = UserId::new();
        let token = issue("k", "admin", &user.to_string(), None).unwrap();
        assert!(token.starts_with(&format!("admin.{user}..")));
        assert_eq!(inspect(&token, None).unwrap().expires_at, None);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue("k", "client", &UserId::new().to_string(), None).unwrap();
        assert!(inspect(&token, Some("other")).is_err());
        let view = inspect(&token, None).unwrap();
        assert!(!view.verified);
    }

    #[test]
    fn bad_inputs_rejected() {
        assert!(issue("k", "owner", &UserId::new().to_string(), None).is_err());
        assert!(issue("k", "client", "not-a-uuid", None).is_err());
        assert!(inspect("garbage", None).is_err());
    }
}
