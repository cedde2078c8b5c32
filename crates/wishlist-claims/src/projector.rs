//! Viewer-dependent rendering of items and wishlists.
//!
//! The owner of a wishlist sees only aggregate status for each gift, never
//! who reserved it or who chipped in. Everyone else sees names.

use chrono::{DateTime, Utc};
use serde::Serialize;

use wishlist_ledger::{ItemSnapshot, Wishlist};
use wishlist_types::{ItemId, Money, WishlistId, WishlistSlug};

/// Funding progress of a group gift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FundingStatus {
    Collecting,
    Collected,
}

/// Claim state of one item, read from a single consistent snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemClaimState {
    Single {
        is_reserved: bool,
        /// Always `None` for the owner.
        reserved_by: Option<String>,
    },
    Group {
        total_contributed: Money,
        status: FundingStatus,
    },
}

impl ItemClaimState {
    pub fn from_snapshot(snapshot: &ItemSnapshot, viewer_is_owner: bool) -> Self {
        if snapshot.item.is_group_gift {
            let total = snapshot.contributed_total();
            let status = if total >= snapshot.item.price {
                FundingStatus::Collected
            } else {
                FundingStatus::Collecting
            };
            Self::Group {
                total_contributed: total,
                status,
            }
        } else {
            let reserved_by = if viewer_is_owner {
                None
            } else {
                snapshot
                    .reservation
                    .as_ref()
                    .map(|r| r.claimant.display_name())
            };
            Self::Single {
                is_reserved: snapshot.reservation.is_some(),
                reserved_by,
            }
        }
    }
}

/// Status label shown to the owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ItemStatus {
    Reserved,
    Collecting,
    Collected,
}

/// One contributor line in the public view of a group gift.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContributionInfo {
    pub name: String,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub wishlist_id: WishlistId,
    pub title: String,
    pub url: Option<String>,
    pub price: Money,
    pub image_url: Option<String>,
    pub is_group_gift: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,

    // Owner view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reserved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,

    // Public view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_contributions: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributions: Option<Vec<ContributionInfo>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WishlistView {
    pub id: WishlistId,
    pub slug: WishlistSlug,
    pub title: String,
    pub description: Option<String>,
    /// Present only in the owner's view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<wishlist_types::UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<ItemView>,
}

pub struct ViewProjector;

impl ViewProjector {
    pub fn item(snapshot: &ItemSnapshot, viewer_is_owner: bool) -> ItemView {
        let item = &snapshot.item;
        let mut view = ItemView {
            id: item.id,
            wishlist_id: item.wishlist_id,
            title: item.title.clone(),
            url: item.url.clone(),
            price: item.price,
            image_url: item.image_url.clone(),
            is_group_gift: item.is_group_gift,
            created_at: item.created_at,
            updated_at: item.updated_at,
            is_reserved: None,
            status: None,
            reserved_by: None,
            total_contributions: None,
            contributions: None,
        };

        match ItemClaimState::from_snapshot(snapshot, viewer_is_owner) {
            ItemClaimState::Group { status, .. } if viewer_is_owner => {
                view.is_reserved = Some(false);
                view.status = Some(match status {
                    FundingStatus::Collecting => ItemStatus::Collecting,
                    FundingStatus::Collected => ItemStatus::Collected,
                });
            }
            ItemClaimState::Single { is_reserved, .. } if viewer_is_owner => {
                view.is_reserved = Some(is_reserved);
                view.status = is_reserved.then_some(ItemStatus::Reserved);
            }
            ItemClaimState::Group {
                total_contributed, ..
            } => {
                view.total_contributions = Some(total_contributed);
                view.contributions = Some(
                    snapshot
                        .contributions
                        .iter()
                        .map(|c| ContributionInfo {
                            name: c.contributor.display_name(),
                            amount: c.amount,
                        })
                        .collect(),
                );
            }
            ItemClaimState::Single { reserved_by, .. } => {
                view.reserved_by = reserved_by;
            }
        }
        view
    }

    pub fn wishlist(wishlist: &Wishlist, items: &[ItemSnapshot], viewer_is_owner: bool) -> WishlistView {
        WishlistView {
            id: wishlist.id,
            slug: wishlist.slug.clone(),
            title: wishlist.title.clone(),
            description: wishlist.description.clone(),
            owner_id: viewer_is_owner.then_some(wishlist.owner),
            created_at: wishlist.created_at,
            updated_at: wishlist.updated_at,
            items: items
                .iter()
                .map(|snapshot| Self::item(snapshot, viewer_is_owner))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wishlist_ledger::{Contribution, Item, Reservation};
    use wishlist_types::{Claimant, GuestName, UserId};

    fn guest(name: &str) -> Claimant {
        Claimant::Guest(GuestName::new(name).unwrap())
    }

    fn reserved_single() -> ItemSnapshot {
        let item = Item::new(WishlistId::new(), "Watch", Money::from_cents(25_000), false);
        let id = item.id;
        let mut snap = ItemSnapshot::new(item);
        snap.reservation = Some(Reservation::new(id, guest("Alice")));
        snap
    }

    fn funded_group(contributions: &[(&str, i64)]) -> ItemSnapshot {
        let item = Item::new(WishlistId::new(), "Sofa", Money::from_cents(10_000), true);
        let id = item.id;
        let mut snap = ItemSnapshot::new(item);
        for (name, cents) in contributions {
            snap.contributions
                .push(Contribution::new(id, guest(name), Money::from_cents(*cents)));
        }
        snap
    }

    #[test]
    fn owner_never_sees_reserver() {
        let state = ItemClaimState::from_snapshot(&reserved_single(), true);
        assert_eq!(
            state,
            ItemClaimState::Single {
                is_reserved: true,
                reserved_by: None
            }
        );
    }

    #[test]
    fn public_sees_reserver_name() {
        let state = ItemClaimState::from_snapshot(&reserved_single(), false);
        assert_eq!(
            state,
            ItemClaimState::Single {
                is_reserved: true,
                reserved_by: Some("Alice".into())
            }
        );
    }

    #[test]
    fn registered_reserver_shows_derived_label() {
        let user = UserId::new();
        let mut snap = reserved_single();
        snap.reservation = Some(Reservation::new(snap.item.id, Claimant::User(user)));
        match ItemClaimState::from_snapshot(&snap, false) {
            ItemClaimState::Single { reserved_by, .. } => {
                assert_eq!(reserved_by, Some(user.display_label()))
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn group_status_flips_when_fully_funded() {
        let partial = ItemClaimState::from_snapshot(&funded_group(&[("A", 4000)]), true);
        assert!(matches!(
            partial,
            ItemClaimState::Group { status: FundingStatus::Collecting, .. }
        ));
        let full = ItemClaimState::from_snapshot(&funded_group(&[("A", 4000), ("B", 6000)]), true);
        assert_eq!(
            full,
            ItemClaimState::Group {
                total_contributed: Money::from_cents(10_000),
                status: FundingStatus::Collected
            }
        );
    }

    #[test]
    fn owner_item_view_hides_names_and_amounts() {
        let view = ViewProjector::item(&funded_group(&[("Ann", 1500), ("Ben", 2500)]), true);
        assert_eq!(view.status, Some(ItemStatus::Collecting));
        assert_eq!(view.is_reserved, Some(false));
        assert!(view.contributions.is_none());
        assert!(view.total_contributions.is_none());
        assert!(view.reserved_by.is_none());

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("Ann"));
        assert!(!json.contains("Ben"));
    }

    #[test]
    fn public_item_view_lists_contributors_in_order() {
        let view = ViewProjector::item(&funded_group(&[("Ann", 1500), ("Ben", 2500)]), false);
        assert_eq!(view.total_contributions, Some(Money::from_cents(4000)));
        let names: Vec<_> = view
            .contributions
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Ann", "Ben"]);
        assert!(view.status.is_none());
    }

    #[test]
    fn unreserved_single_has_no_owner_status() {
        let item = Item::new(WishlistId::new(), "Book", Money::from_cents(1500), false);
        let view = ViewProjector::item(&ItemSnapshot::new(item), true);
        assert_eq!(view.is_reserved, Some(false));
        assert_eq!(view.status, None);
    }

    #[test]
    fn owner_id_only_in_owner_view() {
        let wishlist = Wishlist::new(UserId::new(), "Holidays", None);
        let items = vec![reserved_single()];
        assert!(ViewProjector::wishlist(&wishlist, &items, true).owner_id.is_some());
        let public = ViewProjector::wishlist(&wishlist, &items, false);
        assert!(public.owner_id.is_none());
        assert_eq!(public.items[0].reserved_by.as_deref(), Some("Alice"));
    }
}
