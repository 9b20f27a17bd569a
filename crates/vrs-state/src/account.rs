//! # Accounts and Roles

use serde::{Deserialize, Serialize};

use vrs_core::{OfficeId, Timestamp, UserId, ValidationError};

/// The role a caller acts under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Requests and manages their own reservations.
    Client,
    /// Manages an office's vehicles and decides their reservations.
    Agent,
    /// Full access.
    Admin,
}

impl Role {
    /// The canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Agent => "agent",
            Self::Admin => "admin",
        }
    }

    /// Parse a role name, case-insensitively.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        match name.to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "agent" => Ok(Self::Agent),
            "admin" => Ok(Self::Admin),
            _ => Err(ValidationError::UnknownName {
                kind: "role",
                value: name.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: UserId,
    /// Role the account acts under.
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Office an agent works for. `None` for clients and administrators.
    pub office_id: Option<OfficeId>,
    /// When the account was registered.
    pub created_at: Timestamp,
}

impl Account {
    /// Build an account, rejecting blank name or email.
    pub fn new(
        role: Role,
        name: impl Into<String>,
        email: impl Into<String>,
        office_id: Option<OfficeId>,
        at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let email = email.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if email.trim().is_empty() {
            return Err(ValidationError::EmptyField("email"));
        }
        Ok(Self {
            id: UserId::new(),
            role,
            name,
            email,
            office_id,
            created_at: at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("Agent").unwrap(), Role::Agent);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!(Role::parse("owner").is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Client).unwrap(), "\"client\"");
    }

    #[test]
    fn account_rejects_blank_fields() {
        let err = Account::new(Role::Client, " ", "a@b.c", None, Timestamp::now()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("name"));
        let err = Account::new(Role::Client, "Ana", "", None, Timestamp::now()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("email"));
    }
}
