use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use deuce_core::history::{HistoryEntry, PointTally};
use deuce_core::protocol::{CreateMatchRequest, CreateMatchResponse, MatchView};
use deuce_core::types::{MatchId, Players};
use deuce_core::{MatchLog, MatchSetup};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Full server-side history of a match plus the per-player point-type tally.
#[derive(Serialize, Deserialize)]
pub struct HistoryView {
    pub match_id: MatchId,
    pub version: u64,
    pub entries: Vec<HistoryEntry>,
    pub tally: PointTally,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMatchRequest>,
) -> AppResult<(StatusCode, Json<CreateMatchResponse>)> {
    if req.player1_id.as_str().trim().is_empty() || req.player2_id.as_str().trim().is_empty() {
        return Err(AppError::Validation("player ids must not be empty".into()));
    }

    let setup = MatchSetup {
        id: MatchId::new(Uuid::new_v4().to_string()),
        players: Players::new(req.player1_id, req.player2_id),
        format: req.format.unwrap_or(state.default_format),
        first_server: req.first_server,
    };
    let record = setup.create()?;
    let match_id = record.id.clone();
    info!(
        "🆕 {} vs {} (best of {})",
        record.players.player1,
        record.players.player2,
        record.format.best_of()
    );

    state.matches.create(MatchLog::new(record)).await?;
    Ok((StatusCode::CREATED, Json(CreateMatchResponse { match_id })))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MatchId>,
) -> AppResult<Json<MatchView>> {
    let log = state.matches.snapshot(&id).await?;
    Ok(Json(log.record.view()))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MatchId>,
) -> AppResult<Json<HistoryView>> {
    let log = state.matches.snapshot(&id).await?;
    let tally = log.history.tally(&log.record.players);
    Ok(Json(HistoryView {
        match_id: log.record.id,
        version: log.record.version,
        entries: log.history.entries().to_vec(),
        tally,
    }))
}
