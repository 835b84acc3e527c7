use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid match format: {0}")]
    Invalid(String),
}

/// Best of 9 is the longest match the format accepts.
pub const MAX_SETS_TO_WIN: u8 = 5;

/// Rule parameters of a match. Defaults are best-of-3 sets, six-game sets
/// with a tiebreak at 6-6, and a first-to-7 tiebreak.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchFormat {
    /// Sets a player must win to take the match (2 = best of 3, 3 = best of 5)
    #[arg(long, default_value_t = 2)]
    pub sets_to_win: u8,

    /// Games needed to win a set; a tiebreak is played when both reach it
    #[arg(long, default_value_t = 6)]
    pub games_per_set: u8,

    /// Points needed to win a tiebreak (with a margin of two)
    #[arg(long, default_value_t = 7)]
    pub tiebreak_points: u16,
}

impl Default for MatchFormat {
    fn default() -> Self {
        Self {
            sets_to_win: 2,
            games_per_set: 6,
            tiebreak_points: 7,
        }
    }
}

impl MatchFormat {
    pub fn best_of(&self) -> u16 {
        (u16::from(self.sets_to_win) * 2).saturating_sub(1)
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        if self.sets_to_win == 0 {
            return Err(FormatError::Invalid("sets_to_win must be at least 1".into()));
        }
        if self.sets_to_win > MAX_SETS_TO_WIN {
            return Err(FormatError::Invalid(format!(
                "sets_to_win must be at most {}",
                MAX_SETS_TO_WIN
            )));
        }
        if self.games_per_set == 0 {
            return Err(FormatError::Invalid(
                "games_per_set must be at least 1".into(),
            ));
        }
        if self.tiebreak_points < 2 {
            return Err(FormatError::Invalid(
                "tiebreak_points must be at least 2".into(),
            ));
        }
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        let content = fs::read_to_string(path)?;
        let format: MatchFormat = serde_json::from_str(&content)?;
        format.validate()?;
        Ok(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_best_of_three() {
        let f = MatchFormat::default();
        assert_eq!(f.best_of(), 3);
        assert!(f.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let f: MatchFormat = serde_json::from_str(r#"{ "sets_to_win": 3 }"#).unwrap();
        assert_eq!(f.best_of(), 5);
        assert_eq!(f.games_per_set, 6);
        assert_eq!(f.tiebreak_points, 7);
    }

    #[test]
    fn rejects_degenerate_formats() {
        let f = MatchFormat {
            tiebreak_points: 1,
            ..Default::default()
        };
        assert!(matches!(f.validate(), Err(FormatError::Invalid(_))));

        let f: MatchFormat = serde_json::from_str(r#"{ "sets_to_win": 200 }"#).unwrap();
        assert!(matches!(f.validate(), Err(FormatError::Invalid(_))));
        assert_eq!(f.best_of(), 399);

        let f = MatchFormat {
            sets_to_win: MAX_SETS_TO_WIN,
            ..Default::default()
        };
        assert!(f.validate().is_ok());
        assert_eq!(f.best_of(), 9);
    }
}
