//! HTTP and WebSocket server for the wishlist service.
//!
//! Exposes the claim engine and wishlist maintenance over a JSON API, and
//! a per-wishlist WebSocket room that receives `wishlist_updated` events
//! after every committed change.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod ws;

pub use auth::{AuthProvider, Credentials, Identity, StaticTokenAuth};
pub use config::{ServerConfig, TokenEntry};
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::WishlistServer;
