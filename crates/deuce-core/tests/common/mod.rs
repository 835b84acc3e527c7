#![allow(dead_code)]

use chrono::{DateTime, Utc};
use deuce_core::config::MatchFormat;
use deuce_core::types::{MatchStatus, PlayerId, PointType, Players};
use deuce_core::{apply, Command, MatchLog, MatchSetup};

pub const P1: &str = "p1";
pub const P2: &str = "p2";

pub fn at() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

pub fn players() -> Players {
    Players::new(P1, P2)
}

/// A started match with `p1` serving first.
pub fn started(format: MatchFormat) -> MatchLog {
    let record = MatchSetup::builder()
        .id("test-match")
        .players(players())
        .format(format)
        .build()
        .create()
        .unwrap();
    let log = apply(&MatchLog::new(record), &Command::Start, at())
        .unwrap()
        .log;
    assert_eq!(log.record.status, MatchStatus::InProgress);
    log
}

pub fn point(who: &str) -> Command {
    Command::AwardPoint {
        winning_player_id: PlayerId::new(who),
        point_type: PointType::Normal,
    }
}

pub fn award(log: &MatchLog, who: &str) -> MatchLog {
    apply(log, &point(who), at()).unwrap().log
}

pub fn award_n(mut log: MatchLog, who: &str, n: usize) -> MatchLog {
    for _ in 0..n {
        log = award(&log, who);
    }
    log
}

/// Four unanswered points.
pub fn win_game(log: MatchLog, who: &str) -> MatchLog {
    award_n(log, who, 4)
}

pub fn win_games(mut log: MatchLog, who: &str, n: usize) -> MatchLog {
    for _ in 0..n {
        log = win_game(log, who);
    }
    log
}

/// Alternates holds from 0-0 until both players have `games` games.
pub fn to_games_all(mut log: MatchLog, games: usize) -> MatchLog {
    for _ in 0..games {
        log = win_game(log, P1);
        log = win_game(log, P2);
    }
    log
}
