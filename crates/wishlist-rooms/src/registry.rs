use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use wishlist_types::{ConnectionId, WishlistSlug};

use crate::connection::{Connection, ConnectionHandle, ConnectionState};
use crate::error::{RoomError, RoomResult};
use crate::event::RoomEvent;

/// Configuration for the [`RoomRegistry`].
#[derive(Clone, Debug)]
pub struct RoomConfig {
    /// Capacity of each connection's event queue.
    pub channel_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 16,
        }
    }
}

/// Live connections viewing one wishlist.
#[derive(Default)]
struct Room {
    members: HashMap<ConnectionId, ConnectionHandle>,
}

/// Slug-keyed fan-out of room events to live connections.
///
/// One lock guards the whole map. Every operation is O(room size) and
/// never awaits while holding it.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<WishlistSlug, Room>>,
    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Open a connection for `slug` sized by this registry's config.
    pub fn connect(&self, slug: WishlistSlug) -> (Connection, ConnectionHandle) {
        Connection::open(slug, self.config.channel_capacity)
    }

    /// Register a connection in its room, creating the room if needed.
    pub fn join(&self, handle: ConnectionHandle) -> RoomResult<()> {
        let mut rooms = self.rooms.write().expect("room registry lock poisoned");
        let already = rooms
            .get(&handle.slug)
            .is_some_and(|room| room.members.contains_key(&handle.id));
        if already {
            return Err(RoomError::AlreadyJoined(handle.id));
        }
        handle.state.transition(ConnectionState::Joined)?;
        debug!(slug = %handle.slug, connection = %handle.id, "joined room");
        rooms
            .entry(handle.slug.clone())
            .or_default()
            .members
            .insert(handle.id, handle);
        Ok(())
    }

    /// Remove a connection. Deletes the room once it is empty.
    ///
    /// A connection still marked `Joined` is treated as leaving. Returns
    /// `false` if the connection was not in the room.
    pub fn leave(&self, slug: &WishlistSlug, id: ConnectionId) -> bool {
        let mut rooms = self.rooms.write().expect("room registry lock poisoned");
        let Some(room) = rooms.get_mut(slug) else {
            return false;
        };
        let Some(handle) = room.members.remove(&id) else {
            return false;
        };
        if handle.state.get() == ConnectionState::Joined {
            let _ = handle.state.transition(ConnectionState::Leaving);
        }
        let _ = handle.state.transition(ConnectionState::Removed);
        if room.members.is_empty() {
            rooms.remove(slug);
            debug!(%slug, "room closed");
        }
        debug!(%slug, connection = %id, "left room");
        true
    }

    /// Deliver `event` to every connection in the room.
    ///
    /// Delivery is best-effort per connection. A closed connection is
    /// marked `Dropped`, removed, and skipped without affecting the rest.
    /// A full queue already holds an undelivered invalidation, so the
    /// event is skipped for that connection. Broadcasting to a room that
    /// does not exist does nothing.
    ///
    /// Returns the number of connections the event was queued for.
    pub fn broadcast(&self, slug: &WishlistSlug, event: &RoomEvent) -> usize {
        let mut rooms = self.rooms.write().expect("room registry lock poisoned");
        let Some(room) = rooms.get_mut(slug) else {
            return 0;
        };

        let mut delivered = 0;
        room.members.retain(|id, handle| match handle.sender.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(%slug, connection = %id, "event queue full, invalidation pending");
                true
            }
            Err(TrySendError::Closed(_)) => {
                let _ = handle.state.transition(ConnectionState::Dropped);
                let _ = handle.state.transition(ConnectionState::Removed);
                warn!(%slug, connection = %id, "dropped closed connection");
                false
            }
        });

        if room.members.is_empty() {
            rooms.remove(slug);
            debug!(%slug, "room closed");
        }
        debug!(%slug, delivered, "broadcast");
        delivered
    }

    /// Number of rooms with at least one connection.
    pub fn room_count(&self) -> usize {
        self.rooms.read().expect("room registry lock poisoned").len()
    }

    /// Number of connections in one room.
    pub fn connection_count(&self, slug: &WishlistSlug) -> usize {
        self.rooms
            .read()
            .expect("room registry lock poisoned")
            .get(slug)
            .map_or(0, |room| room.members.len())
    }

    pub fn contains_room(&self, slug: &WishlistSlug) -> bool {
        self.rooms
            .read()
            .expect("room registry lock poisoned")
            .contains_key(slug)
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug() -> WishlistSlug {
        WishlistSlug::generate()
    }

    fn joined(registry: &RoomRegistry, slug: &WishlistSlug) -> Connection {
        let (conn, handle) = registry.connect(slug.clone());
        registry.join(handle).unwrap();
        conn
    }

    #[test]
    fn join_creates_room() {
        let registry = RoomRegistry::default();
        let s = slug();
        let conn = joined(&registry, &s);
        assert!(registry.contains_room(&s));
        assert_eq!(registry.connection_count(&s), 1);
        assert_eq!(conn.state(), ConnectionState::Joined);
    }

    #[test]
    fn last_leave_removes_room() {
        let registry = RoomRegistry::default();
        let s = slug();
        let a = joined(&registry, &s);
        let b = joined(&registry, &s);

        a.begin_leave().unwrap();
        assert!(registry.leave(&s, a.id()));
        assert_eq!(a.state(), ConnectionState::Removed);
        assert!(registry.contains_room(&s));

        assert!(registry.leave(&s, b.id()));
        assert_eq!(b.state(), ConnectionState::Removed);
        assert!(!registry.contains_room(&s));
        assert_eq!(registry.room_count(), 0);

        assert!(!registry.leave(&s, b.id()));
    }

    #[tokio::test]
    async fn broadcast_reaches_every_member() {
        let registry = RoomRegistry::default();
        let s = slug();
        let other = slug();
        let mut a = joined(&registry, &s);
        let mut b = joined(&registry, &s);
        let mut c = joined(&registry, &other);

        let event = RoomEvent::wishlist_updated(s.clone());
        assert_eq!(registry.broadcast(&s, &event), 2);
        assert_eq!(a.recv().await, Some(event.clone()));
        assert_eq!(b.recv().await, Some(event));
        assert_eq!(c.try_recv(), None);
    }

    #[tokio::test]
    async fn closed_connection_is_dropped_without_blocking_others() {
        let registry = RoomRegistry::default();
        let s = slug();
        let gone = joined(&registry, &s);
        let mut alive = joined(&registry, &s);

        let (gone_id, gone_state) = (gone.id(), gone.state.clone());
        drop(gone);

        let event = RoomEvent::wishlist_updated(s.clone());
        assert_eq!(registry.broadcast(&s, &event), 1);
        assert_eq!(alive.recv().await, Some(event));
        assert_eq!(registry.connection_count(&s), 1);
        assert_eq!(gone_state.get(), ConnectionState::Removed);
        assert!(!registry.leave(&s, gone_id));
    }

    #[test]
    fn room_vanishes_when_every_member_drops() {
        let registry = RoomRegistry::default();
        let s = slug();
        drop(joined(&registry, &s));
        drop(joined(&registry, &s));

        assert_eq!(registry.broadcast(&s, &RoomEvent::wishlist_updated(s.clone())), 0);
        assert!(!registry.contains_room(&s));
    }

    #[test]
    fn broadcast_to_missing_room_is_noop() {
        let registry = RoomRegistry::default();
        let s = slug();
        assert_eq!(registry.broadcast(&s, &RoomEvent::wishlist_updated(s.clone())), 0);
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn full_queue_keeps_connection() {
        let registry = RoomRegistry::new(RoomConfig {
            channel_capacity: 1,
        });
        let s = slug();
        let mut conn = joined(&registry, &s);
        let event = RoomEvent::wishlist_updated(s.clone());

        assert_eq!(registry.broadcast(&s, &event), 1);
        assert_eq!(registry.broadcast(&s, &event), 0);
        assert_eq!(registry.connection_count(&s), 1);
        assert_eq!(conn.recv().await, Some(event));
        assert_eq!(conn.state(), ConnectionState::Joined);
    }

    #[test]
    fn rejoin_after_leave_is_rejected() {
        let registry = RoomRegistry::default();
        let s = slug();
        let (conn, handle) = registry.connect(s.clone());
        conn.begin_leave().unwrap();
        let err = registry.join(handle).unwrap_err();
        assert!(matches!(err, RoomError::InvalidTransition { .. }));
        assert!(!registry.contains_room(&s));
    }

    #[test]
    fn dropped_connection_leaves_as_removed() {
        let registry = RoomRegistry::default();
        let s = slug();
        let conn = joined(&registry, &s);
        conn.mark_dropped().unwrap();
        assert!(registry.leave(&s, conn.id()));
        assert_eq!(conn.state(), ConnectionState::Removed);
        assert!(!registry.contains_room(&s));
    }

    #[test]
    fn leave_without_begin_leave_still_removes() {
        let registry = RoomRegistry::default();
        let s = slug();
        let conn = joined(&registry, &s);
        assert!(registry.leave(&s, conn.id()));
        assert_eq!(conn.state(), ConnectionState::Removed);
    }
}
