use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use wishlist_types::{ItemId, UserId, WishlistId, WishlistSlug};

use crate::error::{LedgerError, LedgerResult};
use crate::records::{Contribution, Item, ItemSnapshot, Reservation, Wishlist};
use crate::traits::{ItemTransaction, LedgerStore};

/// One item row. `None` once the item has been deleted, so that callers
/// queued on the lock observe the deletion instead of a stale row.
type ItemRow = Arc<Mutex<Option<ItemSnapshot>>>;

/// Embedded ledger store for tests, demos, and single-process deployments.
///
/// The top-level maps sit behind a short-lived `RwLock` that is never held
/// across a suspension point. Each item row carries its own async mutex,
/// which is the per-item exclusive lock handed out by [`LedgerStore::lock_item`].
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    wishlists: HashMap<WishlistId, Wishlist>,
    slugs: HashMap<WishlistSlug, WishlistId>,
    items: HashMap<ItemId, ItemRow>,
    items_by_wishlist: HashMap<WishlistId, Vec<ItemId>>,
}

fn read_state(state: &RwLock<StoreState>) -> LedgerResult<RwLockReadGuard<'_, StoreState>> {
    state
        .read()
        .map_err(|_| LedgerError::Poisoned("ledger state read lock"))
}

fn write_state(state: &RwLock<StoreState>) -> LedgerResult<RwLockWriteGuard<'_, StoreState>> {
    state
        .write()
        .map_err(|_| LedgerError::Poisoned("ledger state write lock"))
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    /// Number of live items across all wishlists.
    pub fn item_count(&self) -> LedgerResult<usize> {
        Ok(read_state(&self.state)?.items.len())
    }

    fn row(&self, item: ItemId) -> LedgerResult<Option<ItemRow>> {
        Ok(read_state(&self.state)?.items.get(&item).cloned())
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (wishlists, items) = match self.state.read() {
            Ok(state) => (state.wishlists.len(), state.items.len()),
            Err(_) => (0, 0),
        };
        f.debug_struct("InMemoryLedgerStore")
            .field("wishlists", &wishlists)
            .field("items", &items)
            .finish()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_wishlist(&self, wishlist: Wishlist) -> LedgerResult<()> {
        let mut state = write_state(&self.state)?;
        if state.slugs.contains_key(&wishlist.slug) {
            return Err(LedgerError::SlugTaken(wishlist.slug));
        }
        state.slugs.insert(wishlist.slug.clone(), wishlist.id);
        state.items_by_wishlist.entry(wishlist.id).or_default();
        state.wishlists.insert(wishlist.id, wishlist);
        Ok(())
    }

    async fn wishlist(&self, id: WishlistId) -> LedgerResult<Option<Wishlist>> {
        Ok(read_state(&self.state)?.wishlists.get(&id).cloned())
    }

    async fn wishlist_by_slug(&self, slug: &WishlistSlug) -> LedgerResult<Option<Wishlist>> {
        let state = read_state(&self.state)?;
        Ok(state
            .slugs
            .get(slug)
            .and_then(|id| state.wishlists.get(id))
            .cloned())
    }

    async fn wishlists_by_owner(&self, owner: UserId) -> LedgerResult<Vec<Wishlist>> {
        let mut owned: Vec<Wishlist> = read_state(&self.state)?
            .wishlists
            .values()
            .filter(|w| w.owner == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(owned)
    }

    async fn update_wishlist(&self, wishlist: Wishlist) -> LedgerResult<Wishlist> {
        let mut state = write_state(&self.state)?;
        let stored = state
            .wishlists
            .get_mut(&wishlist.id)
            .ok_or(LedgerError::WishlistNotFound(wishlist.id))?;
        stored.title = wishlist.title;
        stored.description = wishlist.description;
        stored.updated_at = Some(Utc::now());
        debug!(wishlist = %stored.id, "wishlist updated");
        Ok(stored.clone())
    }

    async fn delete_wishlist(&self, id: WishlistId) -> LedgerResult<Option<Wishlist>> {
        let (wishlist, rows) = {
            let mut state = write_state(&self.state)?;
            let Some(wishlist) = state.wishlists.remove(&id) else {
                return Ok(None);
            };
            state.slugs.remove(&wishlist.slug);
            let item_ids = state.items_by_wishlist.remove(&id).unwrap_or_default();
            let rows: Vec<ItemRow> = item_ids
                .iter()
                .filter_map(|item| state.items.remove(item))
                .collect();
            (wishlist, rows)
        };

        // Tombstone each row under its lock so queued claims see the deletion.
        for row in rows {
            *row.lock().await = None;
        }

        debug!(wishlist = %wishlist.id, slug = %wishlist.slug, "wishlist deleted");
        Ok(Some(wishlist))
    }

    async fn insert_item(&self, item: Item) -> LedgerResult<()> {
        let mut state = write_state(&self.state)?;
        if !state.wishlists.contains_key(&item.wishlist_id) {
            return Err(LedgerError::WishlistNotFound(item.wishlist_id));
        }
        if state.items.contains_key(&item.id) {
            return Err(LedgerError::DuplicateItem(item.id));
        }
        state
            .items_by_wishlist
            .entry(item.wishlist_id)
            .or_default()
            .push(item.id);
        state
            .items
            .insert(item.id, Arc::new(Mutex::new(Some(ItemSnapshot::new(item)))));
        Ok(())
    }

    async fn items(&self, wishlist: WishlistId) -> LedgerResult<Vec<ItemSnapshot>> {
        let rows: Vec<ItemRow> = {
            let state = read_state(&self.state)?;
            state
                .items_by_wishlist
                .get(&wishlist)
                .map(|ids| ids.iter().filter_map(|id| state.items.get(id).cloned()).collect())
                .unwrap_or_default()
        };

        let mut snapshots = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(snapshot) = row.lock().await.clone() {
                snapshots.push(snapshot);
            }
        }
        snapshots.sort_by(|a, b| {
            b.item
                .created_at
                .cmp(&a.item.created_at)
                .then(b.item.id.cmp(&a.item.id))
        });
        Ok(snapshots)
    }

    async fn snapshot(&self, item: ItemId) -> LedgerResult<Option<ItemSnapshot>> {
        let Some(row) = self.row(item)? else {
            return Ok(None);
        };
        let snapshot = row.lock().await.clone();
        Ok(snapshot)
    }

    async fn lock_item(&self, item: ItemId) -> LedgerResult<Option<Box<dyn ItemTransaction>>> {
        let Some(row) = self.row(item)? else {
            return Ok(None);
        };
        let guard = row.lock_owned().await;
        let Some(staged) = guard.clone() else {
            return Ok(None);
        };
        Ok(Some(Box::new(InMemoryTransaction {
            guard,
            staged,
            deleted: false,
            state: Arc::clone(&self.state),
        })))
    }
}

/// Transaction over one locked item row.
struct InMemoryTransaction {
    guard: OwnedMutexGuard<Option<ItemSnapshot>>,
    staged: ItemSnapshot,
    deleted: bool,
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryTransaction {
    fn check_item(&self, actual: ItemId) -> LedgerResult<()> {
        let expected = self.staged.item.id;
        if expected != actual {
            return Err(LedgerError::ItemMismatch { expected, actual });
        }
        Ok(())
    }
}

#[async_trait]
impl ItemTransaction for InMemoryTransaction {
    fn current(&self) -> &ItemSnapshot {
        &self.staged
    }

    fn insert_reservation(&mut self, reservation: Reservation) -> LedgerResult<()> {
        self.check_item(reservation.item_id)?;
        if self.staged.reservation.is_some() {
            return Err(LedgerError::DuplicateReservation(reservation.item_id));
        }
        self.staged.reservation = Some(reservation);
        Ok(())
    }

    fn insert_contribution(&mut self, contribution: Contribution) -> LedgerResult<()> {
        self.check_item(contribution.item_id)?;
        self.staged.contributions.push(contribution);
        Ok(())
    }

    fn update_item(&mut self, mut item: Item) -> LedgerResult<()> {
        self.check_item(item.id)?;
        if item.wishlist_id != self.staged.item.wishlist_id {
            return Err(LedgerError::Backend(
                "an item cannot move between wishlists".into(),
            ));
        }
        item.updated_at = Some(Utc::now());
        self.staged.item = item;
        Ok(())
    }

    fn delete_item(&mut self) {
        self.deleted = true;
    }

    async fn commit(self: Box<Self>) -> LedgerResult<()> {
        let InMemoryTransaction {
            mut guard,
            staged,
            deleted,
            state,
        } = *self;

        let item = staged.item.id;
        if deleted {
            {
                let mut state = write_state(&state)?;
                state.items.remove(&item);
                if let Some(ids) = state.items_by_wishlist.get_mut(&staged.item.wishlist_id) {
                    ids.retain(|id| *id != item);
                }
            }
            *guard = None;
            debug!(%item, "item deleted");
        } else {
            *guard = Some(staged);
            debug!(%item, "item transaction committed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wishlist_types::{Claimant, GuestName, Money, UserId};

    fn guest(name: &str) -> Claimant {
        Claimant::Guest(GuestName::new(name).unwrap())
    }

    async fn store_with_item(is_group_gift: bool) -> (Arc<InMemoryLedgerStore>, Wishlist, ItemId) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let wishlist = Wishlist::new(UserId::new(), "Birthday", None);
        store.insert_wishlist(wishlist.clone()).await.unwrap();
        let item = Item::new(wishlist.id, "Lamp", Money::from_cents(10_000), is_group_gift);
        let id = item.id;
        store.insert_item(item).await.unwrap();
        (store, wishlist, id)
    }

    #[tokio::test]
    async fn wishlist_lookup_by_slug() {
        let store = InMemoryLedgerStore::new();
        let wishlist = Wishlist::new(UserId::new(), "Wedding", Some("June".into()));
        store.insert_wishlist(wishlist.clone()).await.unwrap();
        let found = store.wishlist_by_slug(&wishlist.slug).await.unwrap();
        assert_eq!(found, Some(wishlist.clone()));
        assert_eq!(store.wishlist(wishlist.id).await.unwrap(), Some(wishlist));
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected() {
        let store = InMemoryLedgerStore::new();
        let first = Wishlist::new(UserId::new(), "A", None);
        let mut second = Wishlist::new(UserId::new(), "B", None);
        second.slug = first.slug.clone();
        store.insert_wishlist(first).await.unwrap();
        let err = store.insert_wishlist(second).await.unwrap_err();
        assert!(matches!(err, LedgerError::SlugTaken(_)));
    }

    #[tokio::test]
    async fn item_requires_existing_wishlist() {
        let store = InMemoryLedgerStore::new();
        let item = Item::new(WishlistId::new(), "Orphan", Money::from_cents(100), false);
        let err = store.insert_item(item).await.unwrap_err();
        assert!(matches!(err, LedgerError::WishlistNotFound(_)));
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let (store, _, id) = store_with_item(false).await;
        let mut tx = store.lock_item(id).await.unwrap().unwrap();
        tx.insert_reservation(Reservation::new(id, guest("Alice"))).unwrap();
        tx.commit().await.unwrap();

        let snap = store.snapshot(id).await.unwrap().unwrap();
        let reservation = snap.reservation.unwrap();
        assert_eq!(reservation.claimant.guest_name(), Some("Alice"));
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let (store, _, id) = store_with_item(true).await;
        {
            let mut tx = store.lock_item(id).await.unwrap().unwrap();
            tx.insert_contribution(Contribution::new(id, guest("Ann"), Money::from_cents(500)))
                .unwrap();
            assert_eq!(tx.current().contributions.len(), 1);
        }
        let snap = store.snapshot(id).await.unwrap().unwrap();
        assert!(snap.contributions.is_empty());
    }

    #[tokio::test]
    async fn second_reservation_is_rejected() {
        let (store, _, id) = store_with_item(false).await;
        let mut tx = store.lock_item(id).await.unwrap().unwrap();
        tx.insert_reservation(Reservation::new(id, guest("Alice"))).unwrap();
        let err = tx
            .insert_reservation(Reservation::new(id, guest("Bob")))
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateReservation(id));
    }

    #[tokio::test]
    async fn claims_for_another_item_are_rejected() {
        let (store, _, id) = store_with_item(false).await;
        let mut tx = store.lock_item(id).await.unwrap().unwrap();
        let other = ItemId::new();
        let err = tx
            .insert_reservation(Reservation::new(other, guest("Eve")))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ItemMismatch { .. }));
    }

    #[tokio::test]
    async fn missing_item_yields_none() {
        let store = InMemoryLedgerStore::new();
        assert!(store.lock_item(ItemId::new()).await.unwrap().is_none());
        assert!(store.snapshot(ItemId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn same_item_lock_is_exclusive() {
        let (store, _, id) = store_with_item(false).await;
        let held = store.lock_item(id).await.unwrap().unwrap();

        let waiting = tokio::time::timeout(Duration::from_millis(50), store.lock_item(id)).await;
        assert!(waiting.is_err(), "second lock on the same item must wait");

        drop(held);
        let acquired = tokio::time::timeout(Duration::from_secs(1), store.lock_item(id)).await;
        assert!(matches!(acquired, Ok(Ok(Some(_)))));
    }

    #[tokio::test]
    async fn different_items_do_not_block_each_other() {
        let (store, wishlist, a) = store_with_item(false).await;
        let other = Item::new(wishlist.id, "Rug", Money::from_cents(2500), false);
        let b = other.id;
        store.insert_item(other).await.unwrap();

        let _held = store.lock_item(a).await.unwrap().unwrap();
        let acquired = tokio::time::timeout(Duration::from_millis(200), store.lock_item(b)).await;
        assert!(matches!(acquired, Ok(Ok(Some(_)))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_commit_once() {
        let (store, _, id) = store_with_item(false).await;
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut tx = store.lock_item(id).await.unwrap().unwrap();
                if tx.current().reservation.is_some() {
                    return false;
                }
                tx.insert_reservation(Reservation::new(id, guest(&format!("guest-{i}"))))
                    .unwrap();
                tx.commit().await.unwrap();
                true
            }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn deleted_item_disappears() {
        let (store, wishlist, id) = store_with_item(false).await;
        let mut tx = store.lock_item(id).await.unwrap().unwrap();
        tx.delete_item();
        tx.commit().await.unwrap();

        assert!(store.snapshot(id).await.unwrap().is_none());
        assert!(store.items(wishlist.id).await.unwrap().is_empty());
        assert_eq!(store.item_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn waiter_observes_deletion() {
        let (store, _, id) = store_with_item(false).await;
        let mut tx = store.lock_item(id).await.unwrap().unwrap();

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.lock_item(id).await.unwrap().is_none() })
        };
        tokio::task::yield_now().await;

        tx.delete_item();
        tx.commit().await.unwrap();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn deleting_wishlist_cascades() {
        let (store, wishlist, id) = store_with_item(true).await;
        let removed = store.delete_wishlist(wishlist.id).await.unwrap();
        assert_eq!(removed.map(|w| w.id), Some(wishlist.id));
        assert!(store.snapshot(id).await.unwrap().is_none());
        assert!(store.wishlist_by_slug(&wishlist.slug).await.unwrap().is_none());
        assert!(store.delete_wishlist(wishlist.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn items_are_listed_newest_first() {
        let (store, wishlist, first) = store_with_item(false).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = Item::new(wishlist.id, "Later", Money::from_cents(100), false);
        let second_id = second.id;
        store.insert_item(second).await.unwrap();

        let ids: Vec<ItemId> = store
            .items(wishlist.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.item.id)
            .collect();
        assert_eq!(ids, vec![second_id, first]);
    }

    #[tokio::test]
    async fn update_stamps_updated_at() {
        let (store, _, id) = store_with_item(false).await;
        let mut tx = store.lock_item(id).await.unwrap().unwrap();
        let mut item = tx.current().item.clone();
        item.title = "Desk lamp".into();
        tx.update_item(item).unwrap();
        tx.commit().await.unwrap();

        let snap = store.snapshot(id).await.unwrap().unwrap();
        assert_eq!(snap.item.title, "Desk lamp");
        assert!(snap.item.updated_at.is_some());
    }

    #[tokio::test]
    async fn wishlists_by_owner_lists_newest_first() {
        let store = InMemoryLedgerStore::new();
        let owner = UserId::new();
        let older = Wishlist::new(owner, "Older", None);
        tokio::time::sleep(Duration::from_millis(2)).await;
        let newer = Wishlist::new(owner, "Newer", None);
        let foreign = Wishlist::new(UserId::new(), "Someone else's", None);
        for w in [older.clone(), foreign, newer.clone()] {
            store.insert_wishlist(w).await.unwrap();
        }

        let ids: Vec<WishlistId> = store
            .wishlists_by_owner(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert!(store.wishlists_by_owner(UserId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wishlist_update_keeps_identity() {
        let store = InMemoryLedgerStore::new();
        let original = Wishlist::new(UserId::new(), "Birthday", None);
        store.insert_wishlist(original.clone()).await.unwrap();

        let mut changed = original.clone();
        changed.title = "30th birthday".into();
        changed.description = Some("No socks".into());
        changed.owner = UserId::new();
        let updated = store.update_wishlist(changed).await.unwrap();

        assert_eq!(updated.title, "30th birthday");
        assert_eq!(updated.description.as_deref(), Some("No socks"));
        assert_eq!(updated.owner, original.owner);
        assert!(updated.updated_at.is_some());
        let stored = store.wishlist_by_slug(&original.slug).await.unwrap();
        assert_eq!(stored, Some(updated));
    }

    #[tokio::test]
    async fn updating_missing_wishlist_fails() {
        let store = InMemoryLedgerStore::new();
        let err = store
            .update_wishlist(Wishlist::new(UserId::new(), "Ghost", None))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::WishlistNotFound(_)));
    }
}
