//! Permission grants
//!
//! A grant gives a user read or write access to a file owned by someone else.
//! Grants have set semantics: the same triple can exist at most once.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{FileId, UserId};

/// Access level granted on a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
}

impl Permission {
    /// Text form used in storage and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            other => Err(DomainError::InvalidPermission(other.to_string())),
        }
    }
}

/// A `(file, user, permission)` triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub file_id: FileId,
    pub user_id: UserId,
    pub permission: Permission,
}

impl PermissionGrant {
    pub fn new(file_id: FileId, user_id: UserId, permission: Permission) -> Self {
        Self {
            file_id,
            user_id,
            permission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_permission() {
        assert_eq!("read".parse::<Permission>().unwrap(), Permission::Read);
        assert_eq!("WRITE".parse::<Permission>().unwrap(), Permission::Write);
        assert!(matches!(
            "admin".parse::<Permission>(),
            Err(DomainError::InvalidPermission(_))
        ));
    }

    #[test]
    fn test_display_matches_storage_form() {
        assert_eq!(Permission::Read.to_string(), "read");
        assert_eq!(Permission::Write.to_string(), "write");
        assert_eq!(
            serde_json::to_string(&Permission::Write).unwrap(),
            "\"write\""
        );
    }
}
