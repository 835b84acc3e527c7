//! Point-by-point tennis rules.
//!
//! [`PointProcessor::apply_point`] is a pure function from one [`ScoreState`]
//! to the next. It never touches persistence or subscribers and never looks at
//! the [`PointType`] tag beyond logging it.

use crate::completion;
use crate::config::MatchFormat;
use crate::error::ScoringError;
use crate::score::{GameRecord, GameScore, PointLabel, ScoreState, SetRecord};
use crate::types::{MatchStatus, PlayerId, PointType, Players, Side};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointProcessor {
    pub players: Players,
    pub format: MatchFormat,
}

enum Ladder {
    Advance(PointLabel, PointLabel),
    Game,
}

impl PointProcessor {
    pub fn new(players: Players, format: MatchFormat) -> Self {
        Self { players, format }
    }

    /// Awards one point to `winner` and returns the resulting score.
    ///
    /// # Errors
    /// * [`ScoringError::MatchNotStarted`] if `status` is `Pending`.
    /// * [`ScoringError::MatchAlreadyComplete`] if `status` is terminal.
    /// * [`ScoringError::InvalidPlayer`] if `winner` is not in this match.
    pub fn apply_point(
        &self,
        state: &ScoreState,
        status: MatchStatus,
        winner: &PlayerId,
        point_type: PointType,
    ) -> Result<ScoreState, ScoringError> {
        match status {
            MatchStatus::InProgress => {}
            MatchStatus::Pending => return Err(ScoringError::MatchNotStarted),
            other => return Err(ScoringError::MatchAlreadyComplete(other)),
        }

        let side = self
            .players
            .side_of(winner)
            .ok_or_else(|| ScoringError::InvalidPlayer(winner.clone()))?;

        let mut next = state.clone();
        if next.sets.is_empty() {
            next.sets.push(SetRecord::default());
        }

        match next.current_game {
            GameScore::Tiebreak { player1, player2 } => {
                self.tiebreak_point(&mut next, side, [player1, player2])
            }
            GameScore::Standard { player1, player2 } => {
                self.standard_point(&mut next, side, [player1, player2])
            }
        }

        debug!(
            winner = %winner,
            point_type = %point_type,
            game = ?next.current_game,
            server = %next.server_id,
            "point applied"
        );
        Ok(next)
    }

    fn standard_point(&self, state: &mut ScoreState, side: Side, labels: [PointLabel; 2]) {
        let mine = labels[side.index()];
        let theirs = labels[side.opponent().index()];

        let step = match (mine, theirs) {
            (PointLabel::Advantage, _) => Ladder::Game,
            // Deuce: the opponent loses their advantage.
            (PointLabel::Forty, PointLabel::Advantage) => {
                Ladder::Advance(PointLabel::Forty, PointLabel::Forty)
            }
            (PointLabel::Forty, PointLabel::Forty) => {
                Ladder::Advance(PointLabel::Advantage, PointLabel::Forty)
            }
            (PointLabel::Forty, _) => Ladder::Game,
            (PointLabel::Love, t) => Ladder::Advance(PointLabel::Fifteen, t),
            (PointLabel::Fifteen, t) => Ladder::Advance(PointLabel::Thirty, t),
            (PointLabel::Thirty, t) => Ladder::Advance(PointLabel::Forty, t),
        };

        match step {
            Ladder::Game => self.close_game(state, side),
            Ladder::Advance(mine, theirs) => {
                state.current_game = match side {
                    Side::Player1 => GameScore::Standard {
                        player1: mine,
                        player2: theirs,
                    },
                    Side::Player2 => GameScore::Standard {
                        player1: theirs,
                        player2: mine,
                    },
                };
            }
        }
    }

    fn tiebreak_point(&self, state: &mut ScoreState, side: Side, mut points: [u16; 2]) {
        let served_before = points[0] + points[1];
        points[side.index()] += 1;

        let mine = points[side.index()];
        let theirs = points[side.opponent().index()];

        if mine >= self.format.tiebreak_points && mine >= theirs + 2 {
            let first_server = self.tiebreak_first_server(&state.server_id, served_before);
            self.record_game(state, side, first_server.clone());
            if let Some(set) = state.sets.last_mut() {
                *set.games_mut(side) += 1;
            }
            state.is_tiebreak = false;
            state.current_game = GameScore::LOVE_ALL;
            // The player who received first in the tiebreak opens the next set.
            state.server_id = self.players.opponent_of(&first_server).clone();
            self.close_set(state);
            return;
        }

        state.current_game = GameScore::Tiebreak {
            player1: points[0],
            player2: points[1],
        };
        // One point for the opening server, then two each.
        if (served_before + 1) % 2 == 1 {
            state.server_id = self.players.opponent_of(&state.server_id).clone();
        }
    }

    /// Who served point 0 of the tiebreak, given who serves point `index`.
    fn tiebreak_first_server(&self, current: &PlayerId, index: u16) -> PlayerId {
        if index.div_ceil(2) % 2 == 0 {
            current.clone()
        } else {
            self.players.opponent_of(current).clone()
        }
    }

    fn record_game(&self, state: &mut ScoreState, side: Side, server: PlayerId) {
        let (player1_points, player2_points) = state.current_game.display_pair();
        let winner_id = self.players.id(side).clone();
        if let Some(set) = state.sets.last_mut() {
            set.games.push(GameRecord {
                player1_points,
                player2_points,
                server_id: server,
                winner_id,
            });
        }
    }

    fn close_game(&self, state: &mut ScoreState, side: Side) {
        let server = state.server_id.clone();
        self.record_game(state, side, server);
        state.current_game = GameScore::LOVE_ALL;
        state.server_id = self.players.opponent_of(&state.server_id).clone();

        let Some(set) = state.sets.last_mut() else {
            return;
        };
        *set.games_mut(side) += 1;

        let threshold = self.format.games_per_set;
        if set.player1_games == threshold && set.player2_games == threshold {
            state.is_tiebreak = true;
            state.current_game = GameScore::TIEBREAK_START;
        } else if completion::set_winner(set, &self.format).is_some() {
            self.close_set(state);
        }
    }

    /// Opens the next set unless the match has just been decided.
    fn close_set(&self, state: &mut ScoreState) {
        if completion::detect_side(&state.sets, &self.format).is_none() {
            state.sets.push(SetRecord::default());
        }
    }
}
