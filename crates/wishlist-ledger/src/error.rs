use wishlist_types::{ItemId, WishlistId, WishlistSlug};

/// Errors produced by ledger store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("wishlist not found: {0}")]
    WishlistNotFound(WishlistId),

    #[error("wishlist slug already in use: {0}")]
    SlugTaken(WishlistSlug),

    #[error("item already exists: {0}")]
    DuplicateItem(ItemId),

    #[error("item {0} already has a reservation")]
    DuplicateReservation(ItemId),

    #[error("record belongs to item {expected}, not {actual}")]
    ItemMismatch { expected: ItemId, actual: ItemId },

    #[error("store lock poisoned: {0}")]
    Poisoned(&'static str),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result alias for ledger store operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
