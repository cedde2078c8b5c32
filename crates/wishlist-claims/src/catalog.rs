use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use wishlist_ledger::{Item, LedgerStore, Wishlist};
use wishlist_types::{ItemId, UserId, WishlistId, WishlistSlug};

use crate::consistency::{notify_wishlist, parse_price, require_title};
use crate::error::{ClaimError, ClaimResult};
use crate::notifier::ChangeNotifier;
use crate::projector::{ViewProjector, WishlistView};

/// Attributes of a new item.
#[derive(Clone, Debug, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub url: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_group_gift: bool,
}

/// Partial update of an item; `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ItemChanges {
    pub title: Option<String>,
    pub url: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub is_group_gift: Option<bool>,
}

/// Partial update of a wishlist; `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WishlistChanges {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Owner-side maintenance of wishlists and items.
///
/// Item updates and deletions run under the same per-item lock as claims,
/// so they can never interleave with a reservation or contribution.
pub struct Catalog {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl Catalog {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { store, notifier }
    }

    // ---- Wishlists ----

    pub async fn create_wishlist(
        &self,
        owner: UserId,
        title: &str,
        description: Option<String>,
    ) -> ClaimResult<Wishlist> {
        let wishlist = Wishlist::new(owner, require_title(title)?, description);
        self.store.insert_wishlist(wishlist.clone()).await?;
        info!(wishlist = %wishlist.id, slug = %wishlist.slug, "wishlist created");
        Ok(wishlist)
    }

    /// Every wishlist owned by `owner`, newest first, in the owner projection.
    pub async fn list_wishlists(&self, owner: UserId) -> ClaimResult<Vec<WishlistView>> {
        let wishlists = self.store.wishlists_by_owner(owner).await?;
        let mut views = Vec::with_capacity(wishlists.len());
        for wishlist in wishlists {
            let items = self.store.items(wishlist.id).await?;
            views.push(ViewProjector::wishlist(&wishlist, &items, true));
        }
        Ok(views)
    }

    /// The wishlist rendered for `viewer`: full status for its owner, names for everyone else.
    pub async fn wishlist_view(
        &self,
        slug: &WishlistSlug,
        viewer: Option<UserId>,
    ) -> ClaimResult<WishlistView> {
        let wishlist = self.find_wishlist(slug).await?;
        let items = self.store.items(wishlist.id).await?;
        Ok(ViewProjector::wishlist(
            &wishlist,
            &items,
            wishlist.is_owned_by(viewer),
        ))
    }

    /// Change the title or description of a wishlist owned by `user`.
    ///
    /// Returns the owner view after the change.
    pub async fn update_wishlist(
        &self,
        slug: &WishlistSlug,
        user: UserId,
        changes: WishlistChanges,
    ) -> ClaimResult<WishlistView> {
        let mut wishlist = self.find_wishlist(slug).await?;
        if !wishlist.is_owned_by(Some(user)) {
            return Err(ClaimError::Forbidden("update this wishlist"));
        }
        if let Some(title) = changes.title {
            wishlist.title = require_title(&title)?;
        }
        if let Some(description) = changes.description {
            wishlist.description = Some(description);
        }

        let wishlist = self.store.update_wishlist(wishlist).await?;
        info!(wishlist = %wishlist.id, "wishlist updated");
        self.notifier.wishlist_changed(&wishlist.slug);

        let items = self.store.items(wishlist.id).await?;
        Ok(ViewProjector::wishlist(&wishlist, &items, true))
    }

    pub async fn delete_wishlist(&self, slug: &WishlistSlug, user: UserId) -> ClaimResult<()> {
        let wishlist = self.find_wishlist(slug).await?;
        if !wishlist.is_owned_by(Some(user)) {
            return Err(ClaimError::Forbidden("delete this wishlist"));
        }
        if self.store.delete_wishlist(wishlist.id).await?.is_some() {
            info!(wishlist = %wishlist.id, "wishlist deleted");
            self.notifier.wishlist_changed(&wishlist.slug);
        }
        Ok(())
    }

    // ---- Items ----

    pub async fn add_item(
        &self,
        slug: &WishlistSlug,
        user: UserId,
        new_item: NewItem,
    ) -> ClaimResult<Item> {
        let wishlist = self.find_wishlist(slug).await?;
        if !wishlist.is_owned_by(Some(user)) {
            return Err(ClaimError::Forbidden("add items to this wishlist"));
        }
        let mut item = Item::new(
            wishlist.id,
            require_title(&new_item.title)?,
            parse_price(new_item.price)?,
            new_item.is_group_gift,
        );
        item.url = new_item.url;
        item.image_url = new_item.image_url;
        item.created_by = Some(user);

        self.store.insert_item(item.clone()).await?;
        info!(item = %item.id, wishlist = %wishlist.id, "item created");
        self.notifier.wishlist_changed(&wishlist.slug);
        Ok(item)
    }

    /// Plain item records of a wishlist, newest first, without claim state.
    pub async fn list_items(&self, slug: &WishlistSlug) -> ClaimResult<Vec<Item>> {
        let wishlist = self.find_wishlist(slug).await?;
        let items = self.store.items(wishlist.id).await?;
        Ok(items.into_iter().map(|snapshot| snapshot.item).collect())
    }

    /// Apply `changes` to an item owned by `user`.
    ///
    /// The gift type may only change while the item has no claims, and a
    /// group gift's price may not drop below what has been contributed.
    pub async fn update_item(
        &self,
        item_id: ItemId,
        user: UserId,
        changes: ItemChanges,
    ) -> ClaimResult<Item> {
        let mut tx = self
            .store
            .lock_item(item_id)
            .await?
            .ok_or(ClaimError::NotFound("item"))?;
        let wishlist_id = tx.current().item.wishlist_id;
        self.ensure_owner(wishlist_id, user, "update this item").await?;

        let current = tx.current();
        let mut item = current.item.clone();
        if let Some(title) = changes.title {
            item.title = require_title(&title)?;
        }
        if let Some(url) = changes.url {
            item.url = Some(url);
        }
        if let Some(image_url) = changes.image_url {
            item.image_url = Some(image_url);
        }
        if let Some(price) = changes.price {
            item.price = parse_price(price)?;
        }
        if let Some(is_group_gift) = changes.is_group_gift {
            if is_group_gift != item.is_group_gift && current.has_claims() {
                return Err(ClaimError::ClaimsExist);
            }
            item.is_group_gift = is_group_gift;
        }
        let contributed = current.contributed_total();
        if item.is_group_gift && item.price < contributed {
            return Err(ClaimError::PriceBelowContributed {
                price: item.price,
                contributed,
            });
        }

        tx.update_item(item)?;
        let updated = tx.current().item.clone();
        tx.commit().await?;

        info!(item = %item_id, "item updated");
        notify_wishlist(self.store.as_ref(), self.notifier.as_ref(), wishlist_id).await;
        Ok(updated)
    }

    /// Delete an item together with its reservation or contributions.
    pub async fn delete_item(&self, item_id: ItemId, user: UserId) -> ClaimResult<()> {
        let mut tx = self
            .store
            .lock_item(item_id)
            .await?
            .ok_or(ClaimError::NotFound("item"))?;
        let wishlist_id = tx.current().item.wishlist_id;
        self.ensure_owner(wishlist_id, user, "delete this item").await?;

        tx.delete_item();
        tx.commit().await?;

        info!(item = %item_id, "item deleted");
        notify_wishlist(self.store.as_ref(), self.notifier.as_ref(), wishlist_id).await;
        Ok(())
    }

    /// The stored wishlist behind `slug`.
    pub async fn find_wishlist(&self, slug: &WishlistSlug) -> ClaimResult<Wishlist> {
        self.store
            .wishlist_by_slug(slug)
            .await?
            .ok_or(ClaimError::NotFound("wishlist"))
    }

    async fn ensure_owner(
        &self,
        wishlist: WishlistId,
        user: UserId,
        action: &'static str,
    ) -> ClaimResult<()> {
        let owned = self
            .store
            .wishlist(wishlist)
            .await?
            .is_some_and(|w| w.is_owned_by(Some(user)));
        if owned {
            Ok(())
        } else {
            Err(ClaimError::Forbidden(action))
        }
    }
}
