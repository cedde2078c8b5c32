use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wishlist_types::{
    Claimant, ContributionId, ItemId, Money, ReservationId, UserId, WishlistId, WishlistSlug,
};

/// A shareable list of desired items, addressed publicly by its slug.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wishlist {
    pub id: WishlistId,
    pub slug: WishlistSlug,
    pub owner: UserId,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Wishlist {
    pub fn new(owner: UserId, title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: WishlistId::new(),
            slug: WishlistSlug::generate(),
            owner,
            title: title.into(),
            description,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn is_owned_by(&self, user: Option<UserId>) -> bool {
        user == Some(self.owner)
    }
}

/// A desired good belonging to one wishlist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub wishlist_id: WishlistId,
    pub title: String,
    pub url: Option<String>,
    pub price: Money,
    pub image_url: Option<String>,
    /// Group gifts are funded by contributions; single-payer items are reserved.
    pub is_group_gift: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn new(
        wishlist_id: WishlistId,
        title: impl Into<String>,
        price: Money,
        is_group_gift: bool,
    ) -> Self {
        Self {
            id: ItemId::new(),
            wishlist_id,
            title: title.into(),
            url: None,
            price,
            image_url: None,
            is_group_gift,
            created_by: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// The single claim on a single-payer item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub item_id: ItemId,
    pub claimant: Claimant,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(item_id: ItemId, claimant: Claimant) -> Self {
        Self {
            id: ReservationId::new(),
            item_id,
            claimant,
            created_at: Utc::now(),
        }
    }
}

/// An append-only partial payment toward a group gift.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub item_id: ItemId,
    pub contributor: Claimant,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

impl Contribution {
    pub fn new(item_id: ItemId, contributor: Claimant, amount: Money) -> Self {
        Self {
            id: ContributionId::new(),
            item_id,
            contributor,
            amount,
            created_at: Utc::now(),
        }
    }
}

/// An item together with every claim against it, read under one lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemSnapshot {
    pub item: Item,
    pub reservation: Option<Reservation>,
    /// Ordered by creation time.
    pub contributions: Vec<Contribution>,
}

impl ItemSnapshot {
    pub fn new(item: Item) -> Self {
        Self {
            item,
            reservation: None,
            contributions: Vec::new(),
        }
    }

    /// Sum of all contribution amounts.
    pub fn contributed_total(&self) -> Money {
        self.contributions.iter().map(|c| &c.amount).sum()
    }

    /// Whether any reservation or contribution references the item.
    pub fn has_claims(&self) -> bool {
        self.reservation.is_some() || !self.contributions.is_empty()
    }
}
