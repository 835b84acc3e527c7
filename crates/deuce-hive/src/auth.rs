use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

pub const UMPIRE_HEADER: &str = "X-Deuce-Umpire";

/// Gates umpire-only routes (force-complete, cancel).
///
/// With no secret configured the guard is open; identity is then left to
/// whatever sits in front of the hive.
pub async fn require_umpire(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(secret) = &state.umpire_secret else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get(UMPIRE_HEADER)
        .and_then(|h| h.to_str().ok());

    match provided {
        Some(val) if val == secret => Ok(next.run(req).await),
        Some(_) => {
            warn!("⛔ Umpire check failed: wrong secret for {}", req.uri());
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            warn!("⛔ Umpire check failed: missing header for {}", req.uri());
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
