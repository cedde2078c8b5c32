//! Claim engine for the wishlist service.
//!
//! Guarantees, for every item:
//! - a single-payer item carries at most one reservation;
//! - a group gift's contributions never sum past its price;
//! - every claim names exactly one claimant (user or guest).
//!
//! Each mutating operation runs inside one [`ItemTransaction`], so the
//! check and the write happen under the same per-item lock. After a commit
//! the wishlist's room is told that its state changed.
//!
//! [`ItemTransaction`]: wishlist_ledger::ItemTransaction

pub mod catalog;
pub mod consistency;
pub mod engine;
pub mod error;
pub mod notifier;
pub mod projector;

pub use catalog::{Catalog, ItemChanges, NewItem, WishlistChanges};
pub use consistency::Requester;
pub use engine::{ClaimConfig, ClaimEngine};
pub use error::{ClaimError, ClaimResult};
pub use notifier::{ChangeNotifier, NoopNotifier};
pub use projector::{
    ContributionInfo, FundingStatus, ItemClaimState, ItemStatus, ItemView, ViewProjector,
    WishlistView,
};
