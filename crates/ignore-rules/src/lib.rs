#![doc = include_str!("../README.md")]

pub mod engine;
pub mod pattern;
pub mod rule;

// --- 주요 타입 re-export ---

pub use engine::{PartitionedResults, matches_any, partition};
pub use pattern::{MAX_PATTERN_LENGTH, Pattern, validate_pattern};
pub use rule::{CompiledRule, IgnoreRule};
