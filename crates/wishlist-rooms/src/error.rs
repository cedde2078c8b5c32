use wishlist_types::ConnectionId;

use crate::connection::ConnectionState;

/// Errors produced by the room registry.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A connection tried to move to a state its lifecycle does not allow.
    #[error("connection {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: ConnectionId,
        from: ConnectionState,
        to: ConnectionState,
    },

    /// The connection is already registered in a room.
    #[error("connection {0} already joined")]
    AlreadyJoined(ConnectionId),

    /// An event could not be encoded for the wire.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the rooms crate.
pub type RoomResult<T> = std::result::Result<T, RoomError>;
