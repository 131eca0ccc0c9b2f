//! Weighted keyword scoring for content items.
//!
//! Patterns are regexes grouped by semantic category. A title match weighs
//! 2.0, a body match 1.0, and items filed under a priority category get the
//! summed score multiplied by 1.5 once.

pub mod engine;
pub mod error;

pub use engine::{KeywordPattern, PatternSet, ScoringEngine, DEFAULT_THRESHOLD, PRIORITY_CATEGORIES};
pub use error::ScoringError;
