use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::UserId;

/// Free-text display name supplied by an unauthenticated claimant.
///
/// Always trimmed and non-empty.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GuestName(String);

impl GuestName {
    /// Default upper bound on guest name length, in characters.
    pub const MAX_LEN: usize = 100;

    pub fn new(raw: &str) -> Result<Self, TypeError> {
        Self::with_limit(raw, Self::MAX_LEN)
    }

    /// Trim and validate against an explicit length limit.
    pub fn with_limit(raw: &str, max_len: usize) -> Result<Self, TypeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyName);
        }
        let len = trimmed.chars().count();
        if len > max_len {
            return Err(TypeError::NameTooLong {
                max: max_len,
                actual: len,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GuestName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<GuestName> for String {
    fn from(name: GuestName) -> Self {
        name.0
    }
}

impl fmt::Debug for GuestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuestName({:?})", self.0)
    }
}

impl fmt::Display for GuestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who placed a claim: a registered user or a named guest.
///
/// Being an enum, a claimant always carries exactly one of the two
/// identities; "both" and "neither" are unrepresentable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Claimant {
    User(UserId),
    Guest(GuestName),
}

impl Claimant {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }

    pub fn guest_name(&self) -> Option<&str> {
        match self {
            Self::User(_) => None,
            Self::Guest(name) => Some(name.as_str()),
        }
    }

    /// Name shown to non-owner viewers.
    pub fn display_name(&self) -> String {
        match self {
            Self::User(id) => id.display_label(),
            Self::Guest(name) => name.to_string(),
        }
    }
}
