//! Real-time rooms for the wishlist service.
//!
//! A room is the set of live connections viewing one wishlist, keyed by
//! the wishlist's public slug. The [`UpdateBroadcaster`] pushes a
//! `wishlist_updated` invalidation into the room after every committed
//! change; receivers re-fetch the wishlist to see what changed.
//!
//! # Connection lifecycle
//!
//! `Connecting -> Joined -> (Leaving | Dropped) -> Removed`. A connection
//! that cannot be delivered to is dropped during the broadcast that found
//! it closed. Empty rooms are deleted immediately.

pub mod broadcaster;
pub mod connection;
pub mod error;
pub mod event;
pub mod registry;

pub use broadcaster::UpdateBroadcaster;
pub use connection::{Connection, ConnectionHandle, ConnectionState};
pub use error::{RoomError, RoomResult};
pub use event::RoomEvent;
pub use registry::{RoomConfig, RoomRegistry};
