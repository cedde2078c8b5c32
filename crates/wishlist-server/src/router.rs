use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handler::{self, AppState};
use crate::ws;

/// Build the axum router with every wishlist endpoint.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/info", get(handler::info_handler))
        .route(
            "/wishlists",
            get(handler::list_wishlists).post(handler::create_wishlist),
        )
        .route(
            "/wishlists/:slug",
            get(handler::get_wishlist)
                .put(handler::update_wishlist)
                .delete(handler::delete_wishlist),
        )
        .route(
            "/wishlists/:slug/items",
            get(handler::list_items).post(handler::add_item),
        )
        .route(
            "/items/:id",
            put(handler::update_item).delete(handler::delete_item),
        )
        .route("/items/:id/state", get(handler::item_state))
        .route("/items/:id/reserve", post(handler::reserve_item))
        .route("/items/:id/contributions", get(handler::list_contributions))
        .route("/items/:id/contribute", post(handler::contribute))
        .route("/ws/:slug", get(ws::ws_handler))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
