mod common;

use common::*;
use deuce_core::config::MatchFormat;
use deuce_core::replay::{replay, ReplayPoint};
use deuce_core::types::{MatchStatus, PointType};
use deuce_core::MatchSetup;
use std::thread;

/// A long, uneven rally pattern: deuce games, breaks and tiebreaks.
fn script() -> Vec<ReplayPoint> {
    let pattern = "1121221211122212112212121211121122";
    pattern
        .chars()
        .cycle()
        .take(600)
        .enumerate()
        .map(|(i, c)| ReplayPoint {
            winner: if c == '1' { P1.into() } else { P2.into() },
            point_type: if i % 7 == 0 {
                PointType::Ace
            } else {
                PointType::Normal
            },
        })
        .collect()
}

fn run(points: &[ReplayPoint]) -> String {
    let setup = MatchSetup::builder()
        .id("det")
        .players(players())
        .format(MatchFormat::default())
        .build();
    let mut log = started(MatchFormat::default());
    let mut used = 0;
    for p in points {
        if log.record.status != MatchStatus::InProgress {
            break;
        }
        log = award(&log, p.winner.as_str());
        used += 1;
    }
    let replayed = replay(setup, &points[..used], at()).unwrap();
    assert_eq!(replayed.record.score, log.record.score);
    replayed.record.score.fingerprint().unwrap()
}

#[test]
fn test_fingerprint_identical_across_threads() {
    let points = script();
    let expected = run(&points);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let points = points.clone();
            thread::spawn(move || run(&points))
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap(), expected);
    }
}

#[test]
fn test_fingerprint_changes_with_a_single_point() {
    let points = script();
    let a = run(&points[..40]);
    let b = run(&points[..41]);
    assert_ne!(a, b);
}
