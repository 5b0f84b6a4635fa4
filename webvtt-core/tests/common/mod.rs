//! Test infrastructure for the WebVTT parser
//!
//! Provides fixture loading, chunked feeding, and seeded document generation.

#![allow(dead_code)]

mod generators;
mod harness;
mod loader;

pub use generators::{Gen, GeneratedCue};
pub use harness::{
    format_cue, format_diagnostic, init_tracing, parse_bytewise, parse_chunked, parse_split_at, parse_whole,
    run_test, run_with_variations, Outcome, TestResult,
};
pub use loader::{load_all_fixtures, load_fixtures_by_name, ExpectedCue, ExpectedError, TestCase};
