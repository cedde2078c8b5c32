use async_trait::async_trait;
use wishlist_types::{ItemId, UserId, WishlistId, WishlistSlug};

use crate::error::LedgerResult;
use crate::records::{Contribution, Item, ItemSnapshot, Reservation, Wishlist};

/// Transactional persistence for wishlists, items, and their claims.
///
/// All implementations must satisfy these invariants:
/// - `lock_item` grants exclusive access to one item row until the returned
///   transaction is committed or dropped. Concurrent callers on the same item
///   wait in turn; callers on other items are unaffected.
/// - Reads (`snapshot`, `items`) observe committed state only, and each
///   item is read as one consistent unit.
/// - A failed or abandoned transaction has no visible effect.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new wishlist. Fails if its slug is taken.
    async fn insert_wishlist(&self, wishlist: Wishlist) -> LedgerResult<()>;

    async fn wishlist(&self, id: WishlistId) -> LedgerResult<Option<Wishlist>>;

    async fn wishlist_by_slug(&self, slug: &WishlistSlug) -> LedgerResult<Option<Wishlist>>;

    /// Every wishlist owned by `owner`, newest first.
    async fn wishlists_by_owner(&self, owner: UserId) -> LedgerResult<Vec<Wishlist>>;

    /// Replace a wishlist's title and description, stamping `updated_at`.
    ///
    /// The id, slug, and owner are kept from the stored row. Returns the
    /// stored wishlist after the change.
    async fn update_wishlist(&self, wishlist: Wishlist) -> LedgerResult<Wishlist>;

    /// Delete a wishlist together with its items and their claims.
    ///
    /// Returns the removed wishlist, or `None` if it did not exist.
    async fn delete_wishlist(&self, id: WishlistId) -> LedgerResult<Option<Wishlist>>;

    /// Insert a new item. Fails if the owning wishlist does not exist.
    async fn insert_item(&self, item: Item) -> LedgerResult<()>;

    /// Committed state of every item in a wishlist, newest first.
    async fn items(&self, wishlist: WishlistId) -> LedgerResult<Vec<ItemSnapshot>>;

    /// Committed state of one item, or `None` if it does not exist.
    async fn snapshot(&self, item: ItemId) -> LedgerResult<Option<ItemSnapshot>>;

    /// Acquire the exclusive lock on an item and open a transaction on it.
    ///
    /// Suspends while another transaction holds the same item. Returns
    /// `None` if the item does not exist (or was deleted while waiting).
    async fn lock_item(&self, item: ItemId) -> LedgerResult<Option<Box<dyn ItemTransaction>>>;
}

/// An open read-modify-write span on one locked item.
///
/// Writes are staged and become visible only on [`ItemTransaction::commit`].
/// Dropping the transaction rolls back and releases the lock.
#[async_trait]
pub trait ItemTransaction: Send {
    /// The item and its claims as seen by this transaction, staged writes included.
    fn current(&self) -> &ItemSnapshot;

    /// Stage a reservation. Fails if the item already has one.
    fn insert_reservation(&mut self, reservation: Reservation) -> LedgerResult<()>;

    /// Stage a contribution.
    fn insert_contribution(&mut self, contribution: Contribution) -> LedgerResult<()>;

    /// Stage new attribute values for the item. The id and wishlist must not change.
    fn update_item(&mut self, item: Item) -> LedgerResult<()>;

    /// Stage removal of the item and all of its claims.
    fn delete_item(&mut self);

    /// Apply every staged write atomically and release the lock.
    async fn commit(self: Box<Self>) -> LedgerResult<()>;
}
