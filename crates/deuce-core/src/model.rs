use crate::config::MatchFormat;
use crate::error::ScoringError;
use crate::history::History;
use crate::processor::PointProcessor;
use crate::protocol::MatchView;
use crate::score::ScoreState;
use crate::types::{MatchId, MatchStatus, PlayerId, Players};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// The match row owned by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub players: Players,
    pub format: MatchFormat,
    pub status: MatchStatus,
    pub winner_id: Option<PlayerId>,
    pub score: ScoreState,
    /// Bumped on every successful command; the optimistic-concurrency token.
    pub version: u64,
}

impl Match {
    pub fn processor(&self) -> PointProcessor {
        PointProcessor::new(self.players.clone(), self.format)
    }

    pub fn view(&self) -> MatchView {
        MatchView {
            match_id: self.id.clone(),
            player1_id: self.players.player1.clone(),
            player2_id: self.players.player2.clone(),
            status: self.status,
            winner_id: self.winner_id.clone(),
            format: self.format,
            version: self.version,
            score: self.score.clone(),
        }
    }
}

/// A match together with its authoritative history. This is the aggregate a
/// coordinator owns and the reducer transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLog {
    pub record: Match,
    pub history: History,
}

impl MatchLog {
    pub fn new(record: Match) -> Self {
        Self {
            record,
            history: History::new(),
        }
    }
}

#[derive(TypedBuilder)]
pub struct MatchSetup {
    #[builder(setter(into))]
    pub id: MatchId,
    pub players: Players,
    #[builder(default)]
    pub format: MatchFormat,
    #[builder(default, setter(strip_option))]
    pub first_server: Option<PlayerId>,
}

impl MatchSetup {
    /// Builds a `pending` match with the zero score.
    pub fn create(self) -> Result<Match, ScoringError> {
        if self.players.player1 == self.players.player2 {
            return Err(ScoringError::DuplicatePlayer(self.players.player1));
        }
        self.format
            .validate()
            .map_err(|e| ScoringError::InvalidFormat(e.to_string()))?;

        let server = match self.first_server {
            Some(id) if self.players.side_of(&id).is_some() => id,
            Some(id) => return Err(ScoringError::InvalidPlayer(id)),
            None => self.players.player1.clone(),
        };

        Ok(Match {
            id: self.id,
            players: self.players,
            format: self.format,
            status: MatchStatus::Pending,
            winner_id: None,
            score: ScoreState::new(server),
            version: 0,
        })
    }
}
