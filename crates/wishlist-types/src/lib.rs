//! Foundation types for the wishlist service.
//!
//! Every other wishlist crate depends on `wishlist-types`.
//!
//! # Key Types
//!
//! - [`ItemId`], [`WishlistId`], [`ReservationId`], [`ContributionId`], [`UserId`], [`ConnectionId`] : UUID v7 identifiers
//! - [`Money`] : fixed-point amount with exactly two fractional digits
//! - [`Claimant`] : either a registered user or a named guest, never both
//! - [`WishlistSlug`] : public, non-guessable room key for a wishlist

pub mod claimant;
pub mod error;
pub mod ids;
pub mod money;
pub mod slug;

pub use claimant::{Claimant, GuestName};
pub use error::TypeError;
pub use ids::{ConnectionId, ContributionId, ItemId, ReservationId, UserId, WishlistId};
pub use money::Money;
pub use slug::WishlistSlug;
