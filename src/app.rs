// region:    --- Imports
use crate::auth::IdentityProvider;
use crate::event_store::EventStore;
use crate::handlers;
use crate::render::Renderer;
use crate::store::AuctionStore;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
// endregion: --- Imports

/// 핸들러 공유 상태
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuctionStore>,
    pub event_store: Arc<dyn EventStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub renderer: Arc<dyn Renderer>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AuctionStore>,
        event_store: Arc<dyn EventStore>,
        identity: Arc<dyn IdentityProvider>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            store,
            event_store,
            identity,
            renderer,
        }
    }
}

/// 라우터 생성
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::handle_index))
        .route("/health", get(handlers::handle_health))
        .route("/search", get(handlers::handle_search))
        .route("/register", post(handlers::handle_register))
        .route("/login", post(handlers::handle_login))
        .route("/logout", post(handlers::handle_logout))
        .route("/listings", post(handlers::handle_create_listing))
        .route("/listings/:id", get(handlers::handle_listing_detail))
        .route("/listings/:id/bids", post(handlers::handle_bid))
        .route(
            "/listings/:id/watchlist",
            post(handlers::handle_toggle_watchlist),
        )
        .route("/listings/:id/comments", post(handlers::handle_comment))
        .route("/listings/:id/buy-now", post(handlers::handle_buy_now))
        .route("/listings/:id/close", post(handlers::handle_close_auction))
        .route("/watchlist", get(handlers::handle_watchlist))
        .route(
            "/categories",
            get(handlers::handle_categories).post(handlers::handle_create_category),
        )
        .route(
            "/categories/:id",
            get(handlers::handle_category_items).delete(handlers::handle_delete_category),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}
