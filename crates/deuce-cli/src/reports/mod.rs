pub mod scoreboard;

pub use scoreboard::{scoreboard, summary_line, tally};
