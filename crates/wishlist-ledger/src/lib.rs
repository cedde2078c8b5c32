//! Ledger store for the wishlist service.
//!
//! This crate provides:
//! - Record types for wishlists, items, reservations, and contributions
//! - The `LedgerStore` / `ItemTransaction` trait boundary
//! - `InMemoryLedgerStore`, an embedded implementation for tests and
//!   single-process deployments
//!
//! # Locking Rules
//!
//! 1. Every read-modify-write on an item happens inside an `ItemTransaction`,
//!    which holds that item's exclusive lock from open until commit or drop.
//! 2. Locks are per item. Claims on different items never wait on each other.
//! 3. A transaction dropped without `commit` leaves no trace.
//! 4. At most one reservation exists per item; the store rejects a second one.

pub mod error;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::{LedgerError, LedgerResult};
pub use memory::InMemoryLedgerStore;
pub use records::{Contribution, Item, ItemSnapshot, Reservation, Wishlist};
pub use traits::{ItemTransaction, LedgerStore};
