use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown user role: {0}")]
pub struct RoleError(pub String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Normal,
    Admin,
}

impl UserRole {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "admin" => Ok(Self::Admin),
            other => Err(RoleError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("admin".parse(), Ok(UserRole::Admin));
        assert_eq!("normal".parse(), Ok(UserRole::Normal));
    }

    #[test]
    fn rejects_unknown_role() {
        assert_eq!(
            "root".parse::<UserRole>(),
            Err(RoleError("root".to_owned()))
        );
    }

    #[test]
    fn defaults_to_normal() {
        assert_eq!(UserRole::default(), UserRole::Normal);
    }
}
