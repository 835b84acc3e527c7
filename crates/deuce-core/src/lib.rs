// Re-export types from the protocol crate so they are accessible via deuce_core::*
pub use deuce_protocol::config;
pub use deuce_protocol::protocol;
pub use deuce_protocol::score;
pub use deuce_protocol::types;

// Internal Modules
pub mod completion;
pub mod engine;
pub mod error;
pub mod history;
pub mod model;
pub mod processor;
pub mod replay;

pub use self::engine::{apply, Command, HistoryChange, Transition};
pub use self::error::{EngineError, EngineResult, ScoringError, UndoError};
pub use self::model::{Match, MatchLog, MatchSetup};
pub use self::processor::PointProcessor;
