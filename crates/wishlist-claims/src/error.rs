use thiserror::Error;

use wishlist_ledger::LedgerError;
use wishlist_types::{Money, TypeError};

/// Errors produced by claim and catalog operations.
///
/// Everything except [`ClaimError::Ledger`] is a request-level failure that
/// leaves the ledger untouched.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidTarget(&'static str),

    #[error("guest name is required for unauthenticated reservations")]
    MissingClaimant,

    #[error("guest name is required for unauthenticated contributions")]
    MissingContributor,

    #[error("invalid guest name: {0}")]
    InvalidGuestName(TypeError),

    #[error("contribution amount must be greater than 0")]
    NonPositiveAmount,

    #[error("invalid amount: {0}")]
    InvalidPrecision(TypeError),

    #[error("Contribution amount exceeds remaining. Only {remaining} remaining.")]
    ExceedsRemaining { remaining: Money },

    #[error("item is already reserved")]
    AlreadyClaimed,

    #[error("not authorized to {0}")]
    Forbidden(&'static str),

    #[error("authentication required to {0}")]
    Unauthenticated(&'static str),

    #[error("cannot change the gift type of an item that already has reservations or contributions")]
    ClaimsExist,

    #[error("price {price} is below the {contributed} already contributed")]
    PriceBelowContributed { price: Money, contributed: Money },

    #[error("{0}")]
    InvalidInput(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Result alias for claim operations.
pub type ClaimResult<T> = Result<T, ClaimError>;
