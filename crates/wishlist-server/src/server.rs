use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use wishlist_claims::{Catalog, ClaimConfig, ClaimEngine};
use wishlist_ledger::{InMemoryLedgerStore, LedgerStore};
use wishlist_rooms::{RoomConfig, RoomRegistry, UpdateBroadcaster};

use crate::auth::{AuthProvider, StaticTokenAuth};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Wishlist HTTP and WebSocket server.
///
/// Owns the process-wide services: one ledger store, one room registry,
/// and the broadcaster that connects them.
pub struct WishlistServer {
    config: ServerConfig,
    state: AppState,
}

impl WishlistServer {
    /// Build a server backed by an in-memory ledger and the configured token table.
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let auth = Arc::new(StaticTokenAuth::new(&config.tokens));
        Self::with_parts(config, store, auth)
    }

    pub fn with_parts(
        config: ServerConfig,
        store: Arc<dyn LedgerStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let rooms = Arc::new(RoomRegistry::new(RoomConfig {
            channel_capacity: config.room_channel_capacity,
        }));
        let broadcaster = Arc::new(UpdateBroadcaster::new(rooms));
        let engine = ClaimEngine::new(
            store.clone(),
            broadcaster.clone(),
            ClaimConfig {
                max_guest_name_len: config.max_guest_name_len,
            },
        );
        let rooms = broadcaster.registry().clone();
        let catalog = Catalog::new(store, broadcaster);
        let state = AppState {
            engine: Arc::new(engine),
            catalog: Arc::new(catalog),
            rooms,
            auth,
        };
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), &self.config.allowed_origins)
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "wishlist server listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
