use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use deuce_core::protocol::{AwardPointRequest, ForceCompleteRequest, ScoreUpdate, UndoRequest};
use deuce_core::types::MatchId;
use deuce_core::Command;
use std::sync::Arc;

async fn submit(
    state: &AppState,
    id: &MatchId,
    command: Command,
    expected_version: Option<u64>,
) -> AppResult<Json<ScoreUpdate>> {
    let update = state.matches.submit(id, command, expected_version).await?;
    Ok(Json(update))
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MatchId>,
) -> AppResult<Json<ScoreUpdate>> {
    submit(&state, &id, Command::Start, None).await
}

pub async fn award_point(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MatchId>,
    Json(req): Json<AwardPointRequest>,
) -> AppResult<Json<ScoreUpdate>> {
    let command = Command::AwardPoint {
        winning_player_id: req.winning_player_id,
        point_type: req.point_type,
    };
    submit(&state, &id, command, req.expected_version).await
}

pub async fn undo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MatchId>,
    body: Bytes,
) -> AppResult<Json<ScoreUpdate>> {
    // The body is optional for undo.
    let req: UndoRequest = if body.is_empty() {
        UndoRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(e.to_string()))?
    };
    submit(&state, &id, Command::Undo, req.expected_version).await
}

pub async fn force_complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MatchId>,
    Json(req): Json<ForceCompleteRequest>,
) -> AppResult<Json<ScoreUpdate>> {
    let command = Command::ForceComplete {
        winner_id: req.winner_id,
    };
    submit(&state, &id, command, req.expected_version).await
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MatchId>,
) -> AppResult<Json<ScoreUpdate>> {
    submit(&state, &id, Command::Cancel, None).await
}
