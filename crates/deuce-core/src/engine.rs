//! The match reducer: `(MatchLog, Command) -> Result<Transition, EngineError>`.
//!
//! This is the only place the point processor, the completion detector and
//! the history are composed. It is pure; ordering, persistence and
//! broadcasting belong to whoever owns the log.

use crate::completion;
use crate::error::{EngineError, ScoringError};
use crate::history::{self, HistoryEntry, PointTag};
use crate::model::MatchLog;
use crate::protocol::ScoreUpdate;
use crate::types::{MatchStatus, PlayerId, PointType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Start,
    AwardPoint {
        winning_player_id: PlayerId,
        #[serde(default)]
        point_type: PointType,
    },
    Undo,
    ForceComplete {
        winner_id: PlayerId,
    },
    Cancel,
}

impl Command {
    pub fn label(&self) -> String {
        match self {
            Self::Start => "start".to_string(),
            Self::AwardPoint {
                winning_player_id,
                point_type,
            } => format!("point {} ({})", winning_player_id, point_type),
            Self::Undo => "undo".to_string(),
            Self::ForceComplete { winner_id } => format!("force_complete {}", winner_id),
            Self::Cancel => "cancel".to_string(),
        }
    }
}

/// How the history changed, so a store can persist it incrementally.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryChange {
    Append(HistoryEntry),
    Pop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub log: MatchLog,
    pub change: HistoryChange,
    pub action: String,
}

impl Transition {
    pub fn update(&self) -> ScoreUpdate {
        let record = &self.log.record;
        ScoreUpdate {
            match_id: record.id.clone(),
            version: record.version,
            status: record.status,
            winner_id: record.winner_id.clone(),
            action: self.action.clone(),
            score: record.score.clone(),
        }
    }

    /// True when this transition is the one that decided the match.
    pub fn completed_match(&self) -> bool {
        self.log.record.status == MatchStatus::Completed
            && matches!(self.change, HistoryChange::Append(_))
    }
}

/// Applies one command. On error the input log is untouched.
pub fn apply(
    log: &MatchLog,
    command: &Command,
    at: DateTime<Utc>,
) -> Result<Transition, EngineError> {
    let action = command.label();
    let mut next = log.clone();
    let status = log.record.status;

    let change = match command {
        Command::Start => {
            if status != MatchStatus::Pending {
                return Err(ScoringError::InvalidTransition {
                    action: "start",
                    status,
                }
                .into());
            }
            next.record.status = MatchStatus::InProgress;
            append(&mut next, &action, at, None)
        }

        Command::AwardPoint {
            winning_player_id,
            point_type,
        } => {
            let record = &log.record;
            let score = record.processor().apply_point(
                &record.score,
                status,
                winning_player_id,
                *point_type,
            )?;

            let closed_before = completion::completed_sets(&record.score.sets, &record.format);
            let closed_after = completion::completed_sets(&score.sets, &record.format);
            if closed_after > closed_before {
                if let Some(winner) =
                    completion::detect(&score.sets, &record.format, &record.players)
                {
                    info!(match_id = %record.id, winner = %winner, "match completed");
                    next.record.status = MatchStatus::Completed;
                    next.record.winner_id = Some(winner);
                }
            }

            next.record.score = score;
            let tag = PointTag {
                winner_id: winning_player_id.clone(),
                point_type: *point_type,
            };
            append(&mut next, &action, at, Some(tag))
        }

        Command::Undo => {
            match status {
                MatchStatus::InProgress => {}
                MatchStatus::Pending => return Err(ScoringError::MatchNotStarted.into()),
                other => return Err(ScoringError::MatchAlreadyComplete(other).into()),
            }
            let (score, history) = history::undo(log.history.clone())?;
            if let Some(top) = history.top() {
                next.record.status = top.status;
                next.record.winner_id = top.winner_id.clone();
            }
            next.record.score = score;
            next.history = history;
            HistoryChange::Pop
        }

        Command::ForceComplete { winner_id } => {
            if status.is_terminal() {
                return Err(ScoringError::MatchAlreadyComplete(status).into());
            }
            if log.record.players.side_of(winner_id).is_none() {
                return Err(ScoringError::InvalidPlayer(winner_id.clone()).into());
            }
            info!(match_id = %log.record.id, winner = %winner_id, "match force-completed");
            next.record.status = MatchStatus::Completed;
            next.record.winner_id = Some(winner_id.clone());
            append(&mut next, &action, at, None)
        }

        Command::Cancel => {
            if status.is_terminal() {
                return Err(ScoringError::MatchAlreadyComplete(status).into());
            }
            info!(match_id = %log.record.id, "match cancelled");
            next.record.status = MatchStatus::Cancelled;
            next.record.winner_id = None;
            append(&mut next, &action, at, None)
        }
    };

    next.record.version = log.record.version + 1;
    debug!(
        match_id = %next.record.id,
        version = next.record.version,
        history = next.history.len(),
        %action,
        "command applied"
    );

    Ok(Transition {
        log: next,
        change,
        action,
    })
}

fn append(
    log: &mut MatchLog,
    action: &str,
    at: DateTime<Utc>,
    point: Option<PointTag>,
) -> HistoryChange {
    let entry = HistoryEntry {
        score: log.record.score.clone(),
        timestamp: at,
        action_label: action.to_string(),
        status: log.record.status,
        winner_id: log.record.winner_id.clone(),
        point,
    };
    log.history = history::record(std::mem::take(&mut log.history), entry.clone());
    HistoryChange::Append(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UndoError;
    use crate::model::MatchSetup;
    use crate::types::Players;

    fn started() -> MatchLog {
        let record = MatchSetup::builder()
            .id("m")
            .players(Players::new("a", "b"))
            .build()
            .create()
            .unwrap();
        apply(&MatchLog::new(record), &Command::Start, Utc::now())
            .unwrap()
            .log
    }

    fn point(who: &str) -> Command {
        Command::AwardPoint {
            winning_player_id: who.into(),
            point_type: PointType::Normal,
        }
    }

    #[test]
    fn start_records_initial_snapshot() {
        let log = started();
        assert_eq!(log.record.status, MatchStatus::InProgress);
        assert_eq!(log.record.version, 1);
        assert_eq!(log.history.len(), 1);
        assert_eq!(
            apply(&log, &Command::Start, Utc::now()),
            Err(EngineError::Validation(ScoringError::InvalidTransition {
                action: "start",
                status: MatchStatus::InProgress
            }))
        );
    }

    #[test]
    fn undo_restores_previous_score_and_bumps_version() {
        let log = started();
        let after = apply(&log, &point("a"), Utc::now()).unwrap().log;
        let undone = apply(&after, &Command::Undo, Utc::now()).unwrap();
        assert_eq!(undone.change, HistoryChange::Pop);
        assert_eq!(undone.log.record.score, log.record.score);
        assert_eq!(undone.log.history, log.history);
        assert_eq!(undone.log.record.version, 3);
        assert_eq!(
            apply(&undone.log, &Command::Undo, Utc::now()),
            Err(EngineError::Undo(UndoError::NothingToUndo))
        );
    }

    #[test]
    fn force_complete_freezes_the_match() {
        let log = started();
        let t = apply(
            &log,
            &Command::ForceComplete {
                winner_id: "b".into(),
            },
            Utc::now(),
        )
        .unwrap();
        assert!(t.completed_match());
        assert_eq!(t.log.record.winner_id, Some("b".into()));
        assert_eq!(t.log.history.len(), 2);

        for cmd in [point("a"), Command::Undo, Command::Cancel] {
            assert_eq!(
                apply(&t.log, &cmd, Utc::now()),
                Err(EngineError::Validation(ScoringError::MatchAlreadyComplete(
                    MatchStatus::Completed
                )))
            );
        }
    }

    #[test]
    fn force_complete_rejects_strangers() {
        let log = started();
        let err = apply(
            &log,
            &Command::ForceComplete {
                winner_id: "z".into(),
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, EngineError::from(ScoringError::InvalidPlayer("z".into())));
    }

    #[test]
    fn pending_match_can_be_cancelled_but_not_scored() {
        let record = MatchSetup::builder()
            .id("m")
            .players(Players::new("a", "b"))
            .build()
            .create()
            .unwrap();
        let log = MatchLog::new(record);
        assert_eq!(
            apply(&log, &point("a"), Utc::now()),
            Err(EngineError::from(ScoringError::MatchNotStarted))
        );
        let t = apply(&log, &Command::Cancel, Utc::now()).unwrap();
        assert_eq!(t.log.record.status, MatchStatus::Cancelled);
    }

    #[test]
    fn command_json_is_tagged() {
        let cmd: Command = serde_json::from_str(
            r#"{ "type": "award_point", "winning_player_id": "a", "point_type": "ace" }"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::AwardPoint {
                winning_player_id: "a".into(),
                point_type: PointType::Ace
            }
        );
    }
}
