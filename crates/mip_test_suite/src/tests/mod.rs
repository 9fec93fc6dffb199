//! Scenarios organized by runtime component

pub mod lifecycle;
pub mod registration;
pub mod scheduling;

use crate::runner::TestSuite;

/// Create all scenario suites
pub fn all_suites() -> Vec<TestSuite> {
    vec![
        registration::suite(),
        lifecycle::suite(),
        scheduling::suite(),
        viewport::suite(),
    ]
}
