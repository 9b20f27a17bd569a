//! # vrs-cli: Operator Tooling for the Vehicle Reservation Stack
//!
//! ## Subcommands
//!
//! - `vrs token issue`: mint a signed session token.
//! - `vrs token inspect`: decode a token, optionally verifying it.
//! - `vrs availability`: check an interval against a JSON snapshot of
//!   reservations, without a running server.
//!
//! ```bash
//! AUTH_SECRET=... vrs token issue --role agent --user 5f0c...e1 --ttl-hours 8
//! vrs availability --snapshot backup.json --vehicle 9a1b...07 \
//!     --start 2026-07-01 --end 2026-07-05
//! ```

pub mod availability;
pub mod token;

use anyhow::{Context, Result};

/// Read the session signing secret from the named environment variable.
///
/// Secrets are never taken from the command line, where they would land
/// in shell history and process listings.
pub fn secret_from_env(var: &str) -> Result<String> {
    let secret = std::env::var(var)
        .with_context(|| format!("environment variable {var} is not set"))?;
    if secret.is_empty() {
        anyhow::bail!("environment variable {var} is empty");
    }
    Ok(secret)
}
