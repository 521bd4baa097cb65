//! Test utilities for propflat
//!
//! Fixtures are written as JavaScript source. [`parse`] turns them into a
//! tree, [`FixtureCollector`] builds the name forest the way an upstream
//! global namespace analysis would for straight-line code, and
//! [`run_collapse`] runs the pass and hands back everything a test checks.

pub mod collector;
pub mod fixture;
pub mod harness;

pub use collector::FixtureCollector;
pub use fixture::{parse, try_parse};
pub use harness::{
    init_tracing, run_collapse, run_collapse_with, try_run_collapse_with, CollapseRun,
};
