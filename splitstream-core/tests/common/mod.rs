//! Test infrastructure for the splitter
//!
//! Provides fixture loading, stochastic chunking and document generators,
//! and a harness that runs the splitter over arbitrary chunkings.

#![allow(dead_code)]

mod generators;
mod harness;

pub use generators::Gen;
pub use harness::{
    describe, run_chunked, run_test, run_whole, run_with_variations, split_chunked, split_whole,
    Outcome, Run,
};
pub use loader::{load_fixtures_by_name, TestCase};
