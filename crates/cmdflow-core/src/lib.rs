pub mod config;
pub mod error;
pub mod insights;
pub mod paths;
pub mod pattern;
pub mod recognizer;
pub mod sequence;
pub mod session;
pub mod store;
pub mod types;
pub mod window;

pub use error::{CmdflowError, Result};
pub use recognizer::{PatternMatch, PatternRecognizer, Suggestion, SuggestionContext};
pub use store::{ExecutionStore, FrequentPattern, MemoryStore, RedbStore};
