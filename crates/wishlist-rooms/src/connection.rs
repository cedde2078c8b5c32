use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use wishlist_types::{ConnectionId, WishlistSlug};

use crate::error::{RoomError, RoomResult};
use crate::event::RoomEvent;

/// Lifecycle of one live connection.
///
/// `Connecting -> Joined -> (Leaving | Dropped) -> Removed`. `Leaving` is
/// an explicit disconnect; `Dropped` is a delivery failure seen during a
/// broadcast. Both end in `Removed` once the registry forgets the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Joined,
    Leaving,
    Dropped,
    Removed,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Joined)
                | (Connecting, Leaving)
                | (Joined, Leaving)
                | (Joined, Dropped)
                | (Leaving, Removed)
                | (Dropped, Removed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Removed
    }
}

/// State shared between a connection and its registry entry.
#[derive(Debug)]
pub(crate) struct StateCell {
    id: ConnectionId,
    state: Mutex<ConnectionState>,
}

impl StateCell {
    fn new(id: ConnectionId) -> Self {
        Self {
            id,
            state: Mutex::new(ConnectionState::Connecting),
        }
    }

    pub(crate) fn get(&self) -> ConnectionState {
        *self.state.lock().expect("connection state lock poisoned")
    }

    pub(crate) fn transition(&self, next: ConnectionState) -> RoomResult<()> {
        let mut state = self.state.lock().expect("connection state lock poisoned");
        if !state.can_transition_to(next) {
            return Err(RoomError::InvalidTransition {
                id: self.id,
                from: *state,
                to: next,
            });
        }
        *state = next;
        Ok(())
    }
}

/// The registry's side of a connection: where to deliver events.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub(crate) id: ConnectionId,
    pub(crate) slug: WishlistSlug,
    pub(crate) sender: mpsc::Sender<RoomEvent>,
    pub(crate) state: Arc<StateCell>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn slug(&self) -> &WishlistSlug {
        &self.slug
    }
}

/// The transport's side of a connection: where events arrive.
///
/// Dropping it closes the channel; the next broadcast to its room then
/// marks it `Dropped` and removes it.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    slug: WishlistSlug,
    events: mpsc::Receiver<RoomEvent>,
    pub(crate) state: Arc<StateCell>,
}

impl Connection {
    /// Open a connection for `slug` in the `Connecting` state.
    ///
    /// `capacity` bounds the number of undelivered events; since every event
    /// is an invalidation, a full queue already guarantees a re-fetch.
    pub fn open(slug: WishlistSlug, capacity: usize) -> (Connection, ConnectionHandle) {
        let id = ConnectionId::new();
        let (sender, events) = mpsc::channel(capacity.max(1));
        let state = Arc::new(StateCell::new(id));
        let handle = ConnectionHandle {
            id,
            slug: slug.clone(),
            sender,
            state: state.clone(),
        };
        let connection = Connection {
            id,
            slug,
            events,
            state,
        };
        (connection, handle)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn slug(&self) -> &WishlistSlug {
        &self.slug
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Wait for the next event. Returns `None` once the registry has
    /// forgotten this connection.
    pub async fn recv(&mut self) -> Option<RoomEvent> {
        self.events.recv().await
    }

    /// Take an already queued event without waiting.
    pub fn try_recv(&mut self) -> Option<RoomEvent> {
        self.events.try_recv().ok()
    }

    /// Mark an explicit disconnect. Call [`crate::RoomRegistry::leave`] next.
    pub fn begin_leave(&self) -> RoomResult<()> {
        self.state.transition(ConnectionState::Leaving)
    }

    /// Mark a transport failure. Call [`crate::RoomRegistry::leave`] next.
    pub fn mark_dropped(&self) -> RoomResult<()> {
        self.state.transition(ConnectionState::Dropped)
    }
}
