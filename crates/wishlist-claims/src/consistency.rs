//! Ledger-consistency checks shared by the claim engine and the catalog.
//!
//! Every check here is evaluated against an [`ItemSnapshot`] taken inside
//! the caller's item transaction, never against a separately fetched value.

use rust_decimal::Decimal;
use tracing::warn;

use wishlist_ledger::{ItemSnapshot, LedgerStore};
use wishlist_types::{Claimant, GuestName, Money, TypeError, UserId, WishlistId};

use crate::error::{ClaimError, ClaimResult};
use crate::notifier::ChangeNotifier;

/// Identity of the caller behind a request.
///
/// An authenticated caller always claims as themselves; a supplied guest
/// name is only consulted for anonymous callers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Requester {
    pub user: Option<UserId>,
    pub guest_name: Option<String>,
}

impl Requester {
    pub fn user(id: UserId) -> Self {
        Self {
            user: Some(id),
            guest_name: None,
        }
    }

    pub fn guest(name: impl Into<String>) -> Self {
        Self {
            user: None,
            guest_name: Some(name.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ClaimKind {
    Reservation,
    Contribution,
}

impl ClaimKind {
    fn missing_identity(self) -> ClaimError {
        match self {
            Self::Reservation => ClaimError::MissingClaimant,
            Self::Contribution => ClaimError::MissingContributor,
        }
    }
}

/// Turn a requester into exactly one claimant identity.
pub(crate) fn resolve_claimant(
    requester: &Requester,
    kind: ClaimKind,
    max_guest_name_len: usize,
) -> ClaimResult<Claimant> {
    if let Some(user) = requester.user {
        return Ok(Claimant::User(user));
    }
    let Some(raw) = requester.guest_name.as_deref() else {
        return Err(kind.missing_identity());
    };
    match GuestName::with_limit(raw, max_guest_name_len) {
        Ok(name) => Ok(Claimant::Guest(name)),
        Err(TypeError::EmptyName) => Err(kind.missing_identity()),
        Err(e) => Err(ClaimError::InvalidGuestName(e)),
    }
}

/// Validate a requested contribution amount: cents precision, strictly positive.
pub(crate) fn parse_amount(raw: Decimal) -> ClaimResult<Money> {
    let amount = Money::new(raw).map_err(ClaimError::InvalidPrecision)?;
    if !amount.is_positive() {
        return Err(ClaimError::NonPositiveAmount);
    }
    Ok(amount)
}

/// Validate an item price: cents precision, strictly positive.
pub(crate) fn parse_price(raw: Decimal) -> ClaimResult<Money> {
    let price = Money::new(raw).map_err(ClaimError::InvalidPrecision)?;
    if !price.is_positive() {
        return Err(ClaimError::InvalidInput(
            "price must be greater than 0".into(),
        ));
    }
    Ok(price)
}

/// Price minus everything contributed so far.
pub(crate) fn remaining_capacity(snapshot: &ItemSnapshot) -> ClaimResult<Money> {
    snapshot
        .item
        .price
        .checked_sub(snapshot.contributed_total())
        .map_err(|e| ClaimError::InvalidInput(e.to_string()))
}

/// Reject an amount that would push the funded total past the price.
pub(crate) fn check_contribution(snapshot: &ItemSnapshot, amount: Money) -> ClaimResult<()> {
    let remaining = remaining_capacity(snapshot)?;
    if amount > remaining {
        return Err(ClaimError::ExceedsRemaining { remaining });
    }
    Ok(())
}

pub(crate) fn require_title(title: &str) -> ClaimResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ClaimError::InvalidInput("title must not be empty".into()));
    }
    Ok(title.to_string())
}

/// Signal the wishlist's room after a commit.
///
/// Failures are logged and absorbed; the commit already happened.
pub(crate) async fn notify_wishlist(
    store: &dyn LedgerStore,
    notifier: &dyn ChangeNotifier,
    wishlist: WishlistId,
) {
    match store.wishlist(wishlist).await {
        Ok(Some(wishlist)) => notifier.wishlist_changed(&wishlist.slug),
        Ok(None) => {}
        Err(e) => warn!(%wishlist, error = %e, "could not resolve wishlist slug for broadcast"),
    }
}
