use assert_cmd::Command;
use regex::Regex;
use serde_json::{json, Value};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

struct TestContext {
    _dir: TempDir,
    script_path: PathBuf,
}

impl TestContext {
    /// Writes a script in which `p1` wins the first `p1_points` points and
    /// `p2` wins the next `p2_points`.
    fn new(p1_points: usize, p2_points: usize, format: Option<Value>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let script_path = dir.path().join("match.json");

        let mut points: Vec<Value> = Vec::new();
        points.extend((0..p1_points).map(|i| {
            let point_type = if i % 4 == 0 { "ace" } else { "winner" };
            json!({ "winner": "p1", "point_type": point_type })
        }));
        points.extend((0..p2_points).map(|_| json!({ "winner": "p2" })));

        let mut script = json!({
            "player1_id": "p1",
            "player2_id": "p2",
            "points": points,
        });
        if let Some(f) = format {
            script["format"] = f;
        }

        let mut file = File::create(&script_path).unwrap();
        write!(file, "{}", script).unwrap();

        Self {
            _dir: dir,
            script_path,
        }
    }

    fn replay(&self, extra: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("deuce").unwrap();
        cmd.arg("replay")
            .arg("--file")
            .arg(&self.script_path)
            .args(extra);
        cmd
    }
}

fn fingerprint(stdout: &str) -> String {
    let re = Regex::new(r"Fingerprint: ([0-9a-f]{64})").unwrap();
    re.captures(stdout)
        .unwrap_or_else(|| panic!("no fingerprint in output:\n{}", stdout))[1]
        .to_string()
}

#[test]
fn test_replay_prints_scoreboard_and_fingerprint() {
    let ctx = TestContext::new(5, 0, None);
    let out = ctx.replay(&[]).output().unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Set 1"), "missing scoreboard:\n{}", stdout);
    assert!(stdout.contains("p2 *"), "p2 should serve game two:\n{}", stdout);
    assert!(stdout.contains("Status: in_progress"));
    assert!(stdout.contains("ace"));
    fingerprint(&stdout);
}

#[test]
fn test_replay_fingerprint_is_reproducible() {
    let ctx = TestContext::new(13, 6, None);
    let first = ctx.replay(&[]).output().unwrap();
    let second = ctx.replay(&[]).output().unwrap();

    let a = fingerprint(&String::from_utf8_lossy(&first.stdout));
    let b = fingerprint(&String::from_utf8_lossy(&second.stdout));
    assert_eq!(a, b);

    let other = TestContext::new(13, 7, None);
    let out = other.replay(&[]).output().unwrap();
    assert_ne!(a, fingerprint(&String::from_utf8_lossy(&out.stdout)));
}

#[test]
fn test_replay_json_reports_completed_match() {
    let ctx = TestContext::new(48, 0, None);
    let out = ctx.replay(&["--json"]).output().unwrap();
    assert!(out.status.success());

    let body: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(body["view"]["status"], "completed");
    assert_eq!(body["view"]["winner_id"], "p1");
    assert_eq!(body["view"]["score"]["sets"].as_array().unwrap().len(), 2);
    assert_eq!(body["fingerprint"].as_str().unwrap().len(), 64);
}

#[test]
fn test_format_flags_apply_when_script_has_none() {
    let ctx = TestContext::new(24, 0, None);
    let out = ctx
        .replay(&["--json", "--sets-to-win", "1"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let body: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(body["view"]["status"], "completed");
    assert_eq!(body["view"]["format"]["sets_to_win"], 1);
}

#[test]
fn test_script_format_wins_over_flags() {
    let ctx = TestContext::new(24, 0, Some(json!({ "sets_to_win": 2 })));
    let out = ctx
        .replay(&["--json", "--sets-to-win", "1"])
        .output()
        .unwrap();
    let body: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(body["view"]["status"], "in_progress");
    assert_eq!(body["view"]["format"]["sets_to_win"], 2);
}

#[test]
fn test_point_after_match_end_fails() {
    let ctx = TestContext::new(49, 0, None);
    let out = ctx.replay(&[]).output().unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Point #49 rejected"), "stderr:\n{}", stderr);
}

#[test]
fn test_missing_script_fails() {
    Command::cargo_bin("deuce")
        .unwrap()
        .args(["replay", "--file", "/nonexistent/deuce/match.json"])
        .assert()
        .failure();
}

#[test]
fn test_unreachable_hive_fails() {
    let out = Command::cargo_bin("deuce")
        .unwrap()
        .args(["--hive", "http://127.0.0.1:9", "show", "m1"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Hive unreachable"), "stderr:\n{}", stderr);
}
