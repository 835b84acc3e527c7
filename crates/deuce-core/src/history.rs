//! Server-authoritative score history.
//!
//! Every successful command appends one snapshot. Undo is "pop and restore":
//! it drops the newest entry and the entry below it becomes current. The
//! first entry (the snapshot taken when the match started) is never removed.

use crate::error::UndoError;
use crate::score::ScoreState;
use crate::types::{MatchStatus, PlayerId, PointType, Players};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// Which player won a recorded point and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointTag {
    pub winner_id: PlayerId,
    pub point_type: PointType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub score: ScoreState,
    pub timestamp: DateTime<Utc>,
    pub action_label: String,
    pub status: MatchStatus,
    #[serde(default)]
    pub winner_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<PointTag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Point-type counts per player over the points still in the log.
    pub fn tally(&self, players: &Players) -> PointTally {
        let mut tally = PointTally::new(players);
        for tag in self.entries.iter().filter_map(|e| e.point.as_ref()) {
            tally.count(tag);
        }
        tally
    }
}

/// Appends a snapshot. Never fails.
pub fn record(mut history: History, entry: HistoryEntry) -> History {
    history.entries.push(entry);
    history
}

/// Removes the newest entry and returns the score now on top.
///
/// # Errors
/// [`UndoError::NothingToUndo`] when only the initial snapshot (or nothing) is left.
pub fn undo(mut history: History) -> Result<(ScoreState, History), UndoError> {
    if history.len() <= 1 {
        return Err(UndoError::NothingToUndo);
    }
    history.entries.pop();
    let restored = history
        .top()
        .map(|e| e.score.clone())
        .ok_or(UndoError::NothingToUndo)?;
    Ok((restored, history))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointTally {
    pub points: BTreeMap<PlayerId, BTreeMap<PointType, u32>>,
}

impl PointTally {
    fn new(players: &Players) -> Self {
        let zeroed: BTreeMap<PointType, u32> = PointType::iter().map(|pt| (pt, 0)).collect();
        let mut points = BTreeMap::new();
        points.insert(players.player1.clone(), zeroed.clone());
        points.insert(players.player2.clone(), zeroed);
        Self { points }
    }

    fn count(&mut self, tag: &PointTag) {
        *self
            .points
            .entry(tag.winner_id.clone())
            .or_default()
            .entry(tag.point_type)
            .or_default() += 1;
    }

    pub fn get(&self, player: &PlayerId, point_type: PointType) -> u32 {
        self.points
            .get(player)
            .and_then(|m| m.get(&point_type))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self, player: &PlayerId) -> u32 {
        self.points.get(player).map_or(0, |m| m.values().sum())
    }
}
