use crate::config::MatchFormat;
use crate::score::ScoreState;
use crate::types::{MatchId, MatchStatus, PlayerId, PointType};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateMatchRequest {
    pub player1_id: PlayerId,
    pub player2_id: PlayerId,
    #[serde(default)]
    pub format: Option<MatchFormat>,
    /// Defaults to player1.
    #[serde(default)]
    pub first_server: Option<PlayerId>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateMatchResponse {
    pub match_id: MatchId,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AwardPointRequest {
    pub winning_player_id: PlayerId,
    #[serde(default)]
    pub point_type: PointType,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UndoRequest {
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ForceCompleteRequest {
    pub winner_id: PlayerId,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Current state of one match as served by `GET /matches/{id}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MatchView {
    pub match_id: MatchId,
    pub player1_id: PlayerId,
    pub player2_id: PlayerId,
    pub status: MatchStatus,
    pub winner_id: Option<PlayerId>,
    pub format: MatchFormat,
    pub version: u64,
    pub score: ScoreState,
}

/// Published to subscribers and returned to the submitter after every
/// successful command. Always carries the whole score, never a diff.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScoreUpdate {
    pub match_id: MatchId,
    pub version: u64,
    pub status: MatchStatus,
    pub winner_id: Option<PlayerId>,
    pub action: String,
    pub score: ScoreState,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub retryable: bool,
}
