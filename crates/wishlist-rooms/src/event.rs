use serde::{Deserialize, Serialize};

use wishlist_types::WishlistSlug;

use crate::error::RoomResult;

/// Server-to-client message on a room connection.
///
/// The only event is an invalidation: it says the wishlist changed, never
/// what changed. Receivers re-fetch the wishlist to see the new state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    WishlistUpdated { slug: WishlistSlug },
}

impl RoomEvent {
    pub fn wishlist_updated(slug: WishlistSlug) -> Self {
        Self::WishlistUpdated { slug }
    }

    pub fn slug(&self) -> &WishlistSlug {
        match self {
            Self::WishlistUpdated { slug } => slug,
        }
    }

    /// Encode as the JSON text frame sent to clients.
    pub fn to_json(&self) -> RoomResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
