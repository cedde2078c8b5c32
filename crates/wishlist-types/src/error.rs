use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("amount {value} has more than {max_scale} fractional digits")]
    Precision { value: String, max_scale: u32 },

    #[error("amount {0} is out of range")]
    Overflow(String),

    #[error("guest name is empty")]
    EmptyName,

    #[error("guest name is too long: {actual} characters, at most {max} allowed")]
    NameTooLong { max: usize, actual: usize },

    #[error("invalid wishlist slug: {0}")]
    InvalidSlug(String),
}
