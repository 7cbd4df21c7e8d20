pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        .route("/api", get(handlers::root::api_info))

        // Authenticated API routes
        .nest("/api", api_routes())

        // Public routes (slot lookup for booking pages)
        .nest("/public", public_routes())

        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/bookings", booking_routes())
        .nest("/providers/:provider_id", provider_routes())
        .route_layer(axum::middleware::from_fn(middleware::auth::require_auth))
}

fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::bookings::list).post(handlers::bookings::create))
        .route("/:id", get(handlers::bookings::get))
        .route("/:id/status", post(handlers::bookings::transition))
        .route("/:id/history", get(handlers::bookings::history))
}

fn provider_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/availability",
            get(handlers::availability::list_windows).post(handlers::availability::create_window),
        )
        .route(
            "/availability/:window_id",
            put(handlers::availability::update_window).delete(handlers::availability::delete_window),
        )
        .route(
            "/blocked-dates",
            get(handlers::availability::list_blocked_dates).post(handlers::availability::block_date),
        )
        .route(
            "/blocked-dates/:date",
            axum::routing::delete(handlers::availability::unblock_date),
        )
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/providers/:provider_id/slots", get(handlers::slots::available_slots))
}
