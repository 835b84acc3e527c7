//! Shared data model for the deuce scoring engine: identifiers, match
//! format, the score value and its wire form, and the HTTP bodies spoken
//! between the hive and its clients.

pub mod config;
pub mod protocol;
pub mod score;
pub mod types;
