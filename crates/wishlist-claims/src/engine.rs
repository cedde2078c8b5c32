use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use wishlist_ledger::{Contribution, LedgerError, LedgerStore, Reservation};
use wishlist_types::{GuestName, ItemId, UserId};

use crate::consistency::{
    check_contribution, notify_wishlist, parse_amount, resolve_claimant, ClaimKind, Requester,
};
use crate::error::{ClaimError, ClaimResult};
use crate::notifier::ChangeNotifier;
use crate::projector::ItemClaimState;

/// Tunables for claim validation.
#[derive(Clone, Debug)]
pub struct ClaimConfig {
    /// Longest accepted guest name, in characters.
    pub max_guest_name_len: usize,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            max_guest_name_len: GuestName::MAX_LEN,
        }
    }
}

/// Enforces the single-payer and group-gift invariants.
///
/// Each mutating call locks the target item for the whole
/// read-validate-write span. Calls on different items proceed in parallel.
pub struct ClaimEngine {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn ChangeNotifier>,
    config: ClaimConfig,
}

impl ClaimEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        notifier: Arc<dyn ChangeNotifier>,
        config: ClaimConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ClaimConfig {
        &self.config
    }

    /// Reserve a single-payer item.
    ///
    /// Under N simultaneous attempts exactly one succeeds; the rest fail
    /// with [`ClaimError::AlreadyClaimed`].
    pub async fn reserve_item(
        &self,
        item_id: ItemId,
        requester: &Requester,
    ) -> ClaimResult<Reservation> {
        let mut tx = self
            .store
            .lock_item(item_id)
            .await?
            .ok_or(ClaimError::NotFound("item"))?;

        let current = tx.current();
        if current.item.is_group_gift {
            return Err(ClaimError::InvalidTarget("cannot reserve a group gift item"));
        }
        let wishlist = current.item.wishlist_id;
        let claimant = resolve_claimant(
            requester,
            ClaimKind::Reservation,
            self.config.max_guest_name_len,
        )?;
        if current.reservation.is_some() {
            debug!(item = %item_id, "reservation lost the race");
            return Err(ClaimError::AlreadyClaimed);
        }

        let reservation = Reservation::new(item_id, claimant);
        tx.insert_reservation(reservation.clone())
            .map_err(|e| match e {
                LedgerError::DuplicateReservation(_) => ClaimError::AlreadyClaimed,
                other => ClaimError::Ledger(other),
            })?;
        tx.commit().await?;

        info!(item = %item_id, reservation = %reservation.id, "item reserved");
        notify_wishlist(self.store.as_ref(), self.notifier.as_ref(), wishlist).await;
        Ok(reservation)
    }

    /// Contribute toward a group gift.
    ///
    /// The sum, the comparison against the price, and the insert all happen
    /// under the item lock, so concurrent contributions can never jointly
    /// overshoot the price.
    pub async fn contribute_to_item(
        &self,
        item_id: ItemId,
        requester: &Requester,
        amount: Decimal,
    ) -> ClaimResult<Contribution> {
        let mut tx = self
            .store
            .lock_item(item_id)
            .await?
            .ok_or(ClaimError::NotFound("item"))?;

        let current = tx.current();
        if !current.item.is_group_gift {
            return Err(ClaimError::InvalidTarget(
                "cannot contribute to a non-group gift item",
            ));
        }
        let wishlist = current.item.wishlist_id;
        let contributor = resolve_claimant(
            requester,
            ClaimKind::Contribution,
            self.config.max_guest_name_len,
        )?;
        let amount = parse_amount(amount)?;
        check_contribution(current, amount)?;

        let contribution = Contribution::new(item_id, contributor, amount);
        tx.insert_contribution(contribution.clone())?;
        tx.commit().await?;

        info!(
            item = %item_id,
            contribution = %contribution.id,
            amount = %contribution.amount,
            "contribution recorded"
        );
        notify_wishlist(self.store.as_ref(), self.notifier.as_ref(), wishlist).await;
        Ok(contribution)
    }

    /// Claim state of an item as seen by `viewer`.
    ///
    /// Whether the viewer owns the item is decided from the owning wishlist.
    pub async fn item_claim_state(
        &self,
        item_id: ItemId,
        viewer: Option<UserId>,
    ) -> ClaimResult<ItemClaimState> {
        let snapshot = self
            .store
            .snapshot(item_id)
            .await?
            .ok_or(ClaimError::NotFound("item"))?;
        let viewer_is_owner = match viewer {
            Some(_) => self
                .store
                .wishlist(snapshot.item.wishlist_id)
                .await?
                .is_some_and(|w| w.is_owned_by(viewer)),
            None => false,
        };
        Ok(ItemClaimState::from_snapshot(&snapshot, viewer_is_owner))
    }

    /// Every contribution toward an item, oldest first.
    pub async fn contributions(&self, item_id: ItemId) -> ClaimResult<Vec<Contribution>> {
        let snapshot = self
            .store
            .snapshot(item_id)
            .await?
            .ok_or(ClaimError::NotFound("item"))?;
        Ok(snapshot.contributions)
    }
}
