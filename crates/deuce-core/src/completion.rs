use crate::config::MatchFormat;
use crate::score::SetRecord;
use crate::types::{PlayerId, Players, Side};

/// Winner of a single set, if its game count closes it.
///
/// A set closes at `games_per_set` with a two-game margin (6-0 .. 6-4, 7-5)
/// or at `games_per_set + 1` against `games_per_set` after a tiebreak (7-6).
pub fn set_winner(set: &SetRecord, format: &MatchFormat) -> Option<Side> {
    let target = format.games_per_set;
    [Side::Player1, Side::Player2].into_iter().find(|&side| {
        let mine = set.games_for(side);
        let theirs = set.games_for(side.opponent());
        (mine >= target && mine >= theirs.saturating_add(2))
            || (mine == target.saturating_add(1) && theirs == target)
    })
}

/// Sets won per seat, indexed by `Side::index`.
pub fn sets_won(sets: &[SetRecord], format: &MatchFormat) -> [u8; 2] {
    let mut won = [0u8; 2];
    for set in sets {
        if let Some(side) = set_winner(set, format) {
            won[side.index()] += 1;
        }
    }
    won
}

pub fn completed_sets(sets: &[SetRecord], format: &MatchFormat) -> usize {
    sets.iter()
        .filter(|s| set_winner(s, format).is_some())
        .count()
}

/// Seat that has reached the required number of sets, if any.
pub fn detect_side(sets: &[SetRecord], format: &MatchFormat) -> Option<Side> {
    let won = sets_won(sets, format);
    [Side::Player1, Side::Player2]
        .into_iter()
        .find(|side| won[side.index()] >= format.sets_to_win)
}

pub fn detect(sets: &[SetRecord], format: &MatchFormat, players: &Players) -> Option<PlayerId> {
    detect_side(sets, format).map(|side| players.id(side).clone())
}
