use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use wishlist_claims::{
    Catalog, ClaimEngine, ClaimError, ItemChanges, ItemClaimState, NewItem, Requester,
    WishlistChanges, WishlistView,
};
use wishlist_ledger::{Contribution, Item, Reservation, Wishlist};
use wishlist_rooms::RoomRegistry;
use wishlist_types::{
    Claimant, ContributionId, ItemId, Money, ReservationId, UserId, WishlistSlug,
};

use crate::auth::{AuthProvider, Credentials, Identity};
use crate::error::{ServerError, ServerResult};

/// Shared services handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ClaimEngine>,
    pub catalog: Arc<Catalog>,
    pub rooms: Arc<RoomRegistry>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    async fn identify(&self, headers: &HeaderMap) -> ServerResult<Identity> {
        self.auth
            .authenticate(&Credentials::from_headers(headers))
            .await
    }

    async fn require_user(&self, headers: &HeaderMap, action: &'static str) -> ServerResult<UserId> {
        self.identify(headers)
            .await?
            .user
            .ok_or_else(|| ClaimError::Unauthenticated(action).into())
    }
}

pub(crate) fn parse_slug(raw: &str) -> ServerResult<WishlistSlug> {
    WishlistSlug::parse(raw).map_err(|_| ClaimError::NotFound("wishlist").into())
}

/// Decode a JSON body the client may omit entirely.
///
/// An empty (or blank) body is `None`; anything else must be valid JSON for `T`.
fn optional_json<T: DeserializeOwned>(body: &[u8]) -> ServerResult<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ServerError::InvalidBody(e.to_string()))
}

// ---- Wire records ----

#[derive(Debug, Deserialize)]
pub struct CreateWishlistRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub guest_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContributeRequest {
    pub guest_name: Option<String>,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ReservationRecord {
    pub id: ReservationId,
    pub item_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationRecord {
    fn from(r: Reservation) -> Self {
        let (user_id, guest_name) = split_claimant(&r.claimant);
        Self {
            id: r.id,
            item_id: r.item_id,
            user_id,
            guest_name,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContributionRecord {
    pub id: ContributionId,
    pub item_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

impl From<Contribution> for ContributionRecord {
    fn from(c: Contribution) -> Self {
        let (user_id, guest_name) = split_claimant(&c.contributor);
        Self {
            id: c.id,
            item_id: c.item_id,
            user_id,
            guest_name,
            amount: c.amount,
            created_at: c.created_at,
        }
    }
}

fn split_claimant(claimant: &Claimant) -> (Option<UserId>, Option<String>) {
    (
        claimant.user_id(),
        claimant.guest_name().map(str::to_string),
    )
}

// ---- Service ----

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "wishlist-server",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": state.rooms.room_count(),
    }))
}

// ---- Wishlists ----

/// The caller's own wishlists, newest first.
pub async fn list_wishlists(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<WishlistView>>> {
    let owner = state.require_user(&headers, "list wishlists").await?;
    Ok(Json(state.catalog.list_wishlists(owner).await?))
}

pub async fn create_wishlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateWishlistRequest>,
) -> ServerResult<(StatusCode, Json<Wishlist>)> {
    let owner = state.require_user(&headers, "create a wishlist").await?;
    let wishlist = state
        .catalog
        .create_wishlist(owner, &body.title, body.description)
        .await?;
    Ok((StatusCode::CREATED, Json(wishlist)))
}

pub async fn get_wishlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> ServerResult<Json<WishlistView>> {
    let viewer = state.identify(&headers).await?;
    let view = state
        .catalog
        .wishlist_view(&parse_slug(&slug)?, viewer.user)
        .await?;
    Ok(Json(view))
}

pub async fn update_wishlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Json(body): Json<WishlistChanges>,
) -> ServerResult<Json<WishlistView>> {
    let user = state.require_user(&headers, "update a wishlist").await?;
    let view = state
        .catalog
        .update_wishlist(&parse_slug(&slug)?, user, body)
        .await?;
    Ok(Json(view))
}

pub async fn delete_wishlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> ServerResult<StatusCode> {
    let user = state.require_user(&headers, "delete a wishlist").await?;
    state
        .catalog
        .delete_wishlist(&parse_slug(&slug)?, user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Items ----

pub async fn list_items(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ServerResult<Json<Vec<Item>>> {
    let items = state.catalog.list_items(&parse_slug(&slug)?).await?;
    Ok(Json(items))
}

pub async fn add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Json(body): Json<NewItem>,
) -> ServerResult<(StatusCode, Json<Item>)> {
    let user = state.require_user(&headers, "add items").await?;
    let item = state
        .catalog
        .add_item(&parse_slug(&slug)?, user, body)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<ItemChanges>,
) -> ServerResult<Json<Item>> {
    let user = state.require_user(&headers, "update items").await?;
    let item = state
        .catalog
        .update_item(ItemId::from_uuid(id), user, body)
        .await?;
    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ServerResult<StatusCode> {
    let user = state.require_user(&headers, "delete items").await?;
    state
        .catalog
        .delete_item(ItemId::from_uuid(id), user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Claims ----

pub async fn item_state(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ServerResult<Json<ItemClaimState>> {
    let viewer = state.identify(&headers).await?;
    let claim_state = state
        .engine
        .item_claim_state(ItemId::from_uuid(id), viewer.user)
        .await?;
    Ok(Json(claim_state))
}

/// The body is optional: authenticated callers reserve as themselves.
pub async fn reserve_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<ReservationRecord>)> {
    let identity = state.identify(&headers).await?;
    let body: Option<ReserveRequest> = optional_json(&body)?;
    let requester = Requester {
        user: identity.user,
        guest_name: body.and_then(|b| b.guest_name),
    };
    let reservation = state
        .engine
        .reserve_item(ItemId::from_uuid(id), &requester)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation.into())))
}

pub async fn list_contributions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServerResult<Json<Vec<ContributionRecord>>> {
    let contributions = state
        .engine
        .contributions(ItemId::from_uuid(id))
        .await?;
    Ok(Json(contributions.into_iter().map(Into::into).collect()))
}

pub async fn contribute(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<ContributeRequest>,
) -> ServerResult<(StatusCode, Json<ContributionRecord>)> {
    let identity = state.identify(&headers).await?;
    let requester = Requester {
        user: identity.user,
        guest_name: body.guest_name,
    };
    let contribution = state
        .engine
        .contribute_to_item(ItemId::from_uuid(id), &requester, body.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(contribution.into())))
}
