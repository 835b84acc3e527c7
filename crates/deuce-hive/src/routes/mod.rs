pub mod live;
pub mod matches;
pub mod scoring;
pub mod system;


use crate::auth;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn system_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
}

pub fn match_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/matches", post(matches::create))
        .route("/matches/{id}", get(matches::get))
        .route("/matches/{id}/history", get(matches::history))
        .route("/matches/{id}/live", get(live::live))
        .route("/matches/{id}/start", post(scoring::start))
        .route("/matches/{id}/points", post(scoring::award_point))
        .route("/matches/{id}/undo", post(scoring::undo))
}

pub fn umpire_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/matches/{id}/force-complete", post(scoring::force_complete))
        .route("/matches/{id}/cancel", post(scoring::cancel))
        .route_layer(middleware::from_fn_with_state(state, auth::require_umpire))
}

pub fn build_app(state: Arc<AppState>) -> Router {
    system_routes()
        .merge(match_routes())
        .merge(umpire_routes(state.clone()))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
