use crate::types::{PlayerId, Side};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Position on the standard point ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointLabel {
    Love,
    Fifteen,
    Thirty,
    Forty,
    Advantage,
}

impl PointLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Love => "0",
            Self::Fifteen => "15",
            Self::Thirty => "30",
            Self::Forty => "40",
            Self::Advantage => "AD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "0" => Some(Self::Love),
            "15" => Some(Self::Fifteen),
            "30" => Some(Self::Thirty),
            "40" => Some(Self::Forty),
            "AD" | "A" | "ad" => Some(Self::Advantage),
            _ => None,
        }
    }
}

impl fmt::Display for PointLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score of the game in progress. Standard games walk the label ladder;
/// tiebreaks count raw points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameScore {
    Standard {
        player1: PointLabel,
        player2: PointLabel,
    },
    Tiebreak {
        player1: u16,
        player2: u16,
    },
}

impl GameScore {
    pub const LOVE_ALL: GameScore = GameScore::Standard {
        player1: PointLabel::Love,
        player2: PointLabel::Love,
    };

    pub const TIEBREAK_START: GameScore = GameScore::Tiebreak {
        player1: 0,
        player2: 0,
    };

    pub fn is_tiebreak(&self) -> bool {
        matches!(self, Self::Tiebreak { .. })
    }

    pub fn label(&self, side: Side) -> PointLabel {
        match (self, side) {
            (Self::Standard { player1, .. }, Side::Player1) => *player1,
            (Self::Standard { player2, .. }, Side::Player2) => *player2,
            (Self::Tiebreak { .. }, _) => PointLabel::Love,
        }
    }

    pub fn tiebreak_points(&self, side: Side) -> u16 {
        match (self, side) {
            (Self::Tiebreak { player1, .. }, Side::Player1) => *player1,
            (Self::Tiebreak { player2, .. }, Side::Player2) => *player2,
            (Self::Standard { .. }, _) => 0,
        }
    }

    /// Display strings for both players: ladder labels, or point counts in a tiebreak.
    pub fn display_pair(&self) -> (String, String) {
        match self {
            Self::Standard { player1, player2 } => {
                (player1.as_str().to_string(), player2.as_str().to_string())
            }
            Self::Tiebreak { player1, player2 } => (player1.to_string(), player2.to_string()),
        }
    }
}

impl Default for GameScore {
    fn default() -> Self {
        Self::LOVE_ALL
    }
}

/// A finished game, kept for playback. Not used for rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameRecord {
    /// Score line when the deciding point was played.
    pub player1_points: String,
    pub player2_points: String,
    pub server_id: PlayerId,
    pub winner_id: PlayerId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SetRecord {
    pub player1_games: u8,
    pub player2_games: u8,
    #[serde(default)]
    pub games: Vec<GameRecord>,
}

impl SetRecord {
    pub fn games_for(&self, side: Side) -> u8 {
        match side {
            Side::Player1 => self.player1_games,
            Side::Player2 => self.player2_games,
        }
    }

    pub fn games_mut(&mut self, side: Side) -> &mut u8 {
        match side {
            Side::Player1 => &mut self.player1_games,
            Side::Player2 => &mut self.player2_games,
        }
    }

    pub fn total_games(&self) -> u16 {
        u16::from(self.player1_games) + u16::from(self.player2_games)
    }
}

/// Full score of a match at one instant.
///
/// `sets` is chronological and its last element is the set being played
/// (or, once the match is decided, the deciding set). `is_tiebreak` always
/// agrees with the shape of `current_game`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "WireScore", try_from = "WireScore")]
pub struct ScoreState {
    pub sets: Vec<SetRecord>,
    pub current_game: GameScore,
    pub server_id: PlayerId,
    pub is_tiebreak: bool,
}

impl ScoreState {
    /// Zero state: one empty set, love-all, `server` to serve.
    pub fn new(server: PlayerId) -> Self {
        Self {
            sets: vec![SetRecord::default()],
            current_game: GameScore::LOVE_ALL,
            server_id: server,
            is_tiebreak: false,
        }
    }

    pub fn current_set(&self) -> Option<&SetRecord> {
        self.sets.last()
    }

    pub fn games_for(&self, side: Side) -> u8 {
        self.current_set().map_or(0, |s| s.games_for(side))
    }

    /// Deterministic SHA-256 over the canonical JSON form.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("score must contain at least one set")]
    NoSets,

    #[error("unrecognised point label '{0}'")]
    BadLabel(String),

    #[error("unrecognised tiebreak count '{0}'")]
    BadCount(String),
}

#[derive(Serialize, Deserialize)]
struct WireGame {
    player1: String,
    player2: String,
}

/// JSON shape shared with persistence and subscribers.
#[derive(Serialize, Deserialize)]
struct WireScore {
    sets: Vec<SetRecord>,
    current_game: WireGame,
    server_id: PlayerId,
    is_tiebreak: bool,
}

impl From<ScoreState> for WireScore {
    fn from(s: ScoreState) -> Self {
        let (player1, player2) = s.current_game.display_pair();
        Self {
            sets: s.sets,
            current_game: WireGame { player1, player2 },
            server_id: s.server_id,
            is_tiebreak: s.current_game.is_tiebreak(),
        }
    }
}

impl TryFrom<WireScore> for ScoreState {
    type Error = WireError;

    fn try_from(w: WireScore) -> Result<Self, Self::Error> {
        if w.sets.is_empty() {
            return Err(WireError::NoSets);
        }

        let current_game = if w.is_tiebreak {
            let count = |s: &str| {
                s.trim()
                    .parse::<u16>()
                    .map_err(|_| WireError::BadCount(s.to_string()))
            };
            GameScore::Tiebreak {
                player1: count(&w.current_game.player1)?,
                player2: count(&w.current_game.player2)?,
            }
        } else {
            let label =
                |s: &str| PointLabel::parse(s).ok_or_else(|| WireError::BadLabel(s.to_string()));
            GameScore::Standard {
                player1: label(&w.current_game.player1)?,
                player2: label(&w.current_game.player2)?,
            }
        };

        Ok(Self {
            sets: w.sets,
            current_game,
            server_id: w.server_id,
            is_tiebreak: w.is_tiebreak,
        })
    }
}
