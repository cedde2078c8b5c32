use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Public key of a wishlist and of its real-time room.
///
/// Generated slugs are 24 hex characters of randomness, so they are sparse
/// and not guessable from neighbouring wishlists.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WishlistSlug(String);

impl WishlistSlug {
    const RANDOM_BYTES: usize = 12;
    const MAX_LEN: usize = 64;

    /// Generate a fresh random slug.
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::RANDOM_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Validate a slug received from a client.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.is_empty() || s.len() > Self::MAX_LEN {
            return Err(TypeError::InvalidSlug(s.to_string()));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(TypeError::InvalidSlug(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for WishlistSlug {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WishlistSlug {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WishlistSlug> for String {
    fn from(slug: WishlistSlug) -> Self {
        slug.0
    }
}

impl AsRef<str> for WishlistSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WishlistSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WishlistSlug({})", self.0)
    }
}

impl fmt::Display for WishlistSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
