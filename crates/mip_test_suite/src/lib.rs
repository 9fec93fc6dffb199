//! MIP Scenario Suite
//!
//! Scripted scroll, insert and remove sequences replayed against a headless
//! page on a manual clock. Every scenario gets a fresh [`ScenarioHarness`];
//! failures are reported through `anyhow` with the step that broke.
//!
//! # Suites
//!
//! - **registration**: first-wins definitions, stylesheet order, upgrades
//! - **lifecycle**: callback order, build-once, first-in-view, detach
//! - **scheduling**: viewport classification, throttling, isolation, removal
//!   during a pass
//! - **viewport**: settle detection timing

pub mod harness;
pub mod runner;
pub mod tests;

pub use harness::{row, Callback, ScenarioHarness, TestResult, TraceEntry};
pub use runner::{RunResult, TestRunner, TestSuite};
