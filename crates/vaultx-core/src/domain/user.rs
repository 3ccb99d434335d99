//! Local user accounts
//!
//! An account's [`UserId`] is its username, so the same string identifies the
//! user as file owner, grantee and audit actor. The password is only ever held
//! as a hash; hashing and verification live in `vaultx-crypto`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::file_record::now_millis;
use super::newtypes::UserId;

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(DomainError::InvalidRole(other.to_string())),
        }
    }
}

/// A registered local user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    id: UserId,
    password_hash: String,
    role: Role,
    created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Creates an account for `username` with an already computed hash
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidId`] for a blank username, or one with
    /// surrounding whitespace, and [`DomainError::ValidationFailed`] for an
    /// empty hash.
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Result<Self, DomainError> {
        let username = username.into();
        if username.trim() != username {
            return Err(DomainError::InvalidId(format!(
                "Username has surrounding whitespace: {username:?}"
            )));
        }
        let password_hash = password_hash.into();
        if password_hash.is_empty() {
            return Err(DomainError::ValidationFailed(
                "password hash cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id: UserId::new(username)?,
            password_hash,
            role,
            created_at: now_millis(),
        })
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn username(&self) -> &str {
        self.id.as_str()
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
