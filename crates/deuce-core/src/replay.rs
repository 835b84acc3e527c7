use crate::config::MatchFormat;
use crate::engine::{apply, Command};
use crate::error::{EngineError, ScoringError};
use crate::model::{MatchLog, MatchSetup};
use crate::types::{PlayerId, PointType, Players};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayPoint {
    pub winner: PlayerId,
    #[serde(default)]
    pub point_type: PointType,
}

/// A recorded match on disk: who played, under which format, and every point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayScript {
    pub player1_id: PlayerId,
    pub player2_id: PlayerId,
    #[serde(default)]
    pub first_server: Option<PlayerId>,
    #[serde(default)]
    pub format: Option<MatchFormat>,
    pub points: Vec<ReplayPoint>,
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Setup rejected: {0}")]
    Setup(#[from] ScoringError),

    #[error("Point #{step} rejected: {source}")]
    Step {
        step: usize,
        #[source]
        source: EngineError,
    },
}

impl ReplayScript {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn players(&self) -> Players {
        Players::new(self.player1_id.clone(), self.player2_id.clone())
    }

    /// Replays the script from a freshly started match, stamping every
    /// history entry with `at`.
    pub fn run(
        &self,
        default_format: MatchFormat,
        at: DateTime<Utc>,
    ) -> Result<MatchLog, ReplayError> {
        let setup = MatchSetup {
            id: "replay".into(),
            players: self.players(),
            format: self.format.unwrap_or(default_format),
            first_server: self.first_server.clone(),
        };
        replay(setup, &self.points, at)
    }
}

/// Folds `points` through the reducer from a new, started match.
///
/// Stops at the first rejected point; `step` in the error is 1-based.
pub fn replay(
    setup: MatchSetup,
    points: &[ReplayPoint],
    at: DateTime<Utc>,
) -> Result<MatchLog, ReplayError> {
    let record = setup.create()?;
    let mut log = apply(&MatchLog::new(record), &Command::Start, at)
        .map_err(|source| ReplayError::Step { step: 0, source })?
        .log;

    for (i, point) in points.iter().enumerate() {
        let command = Command::AwardPoint {
            winning_player_id: point.winner.clone(),
            point_type: point.point_type,
        };
        log = apply(&log, &command, at)
            .map_err(|source| ReplayError::Step { step: i + 1, source })?
            .log;
    }
    Ok(log)
}
