//! Test runner for executing scenario suites
//!
//! Manages scenario execution, result collection, and reporting.

use crate::harness::{ScenarioHarness, TestResult};
use anyhow::Result;
use mip_runtime::MipConfig;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Scenario body
pub type ScenarioFn = Box<dyn FnOnce(&mut ScenarioHarness) -> Result<()>>;

/// A single scenario
pub struct TestCase {
    /// Scenario name
    pub name: String,
    /// Suite the scenario belongs to
    pub category: String,
    /// Scenario function
    pub test_fn: ScenarioFn,
}

impl TestCase {
    pub fn new<F>(name: &str, category: &str, test_fn: F) -> Self
    where
        F: FnOnce(&mut ScenarioHarness) -> Result<()> + 'static,
    {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            test_fn: Box::new(test_fn),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}::{}", self.category, self.name)
    }
}

/// Result of running a scenario
pub struct TestRun {
    pub name: String,
    pub category: String,
    pub result: TestResult,
    /// Wall time taken
    pub duration: Duration,
}

impl TestRun {
    pub fn is_passed(&self) -> bool {
        self.result.is_passed()
    }
}

/// Named group of scenarios
pub struct TestSuite {
    pub name: String,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cases: Vec::new(),
        }
    }

    pub fn add<F>(&mut self, name: &str, test_fn: F) -> &mut Self
    where
        F: FnOnce(&mut ScenarioHarness) -> Result<()> + 'static,
    {
        self.cases.push(TestCase::new(name, &self.name, test_fn));
        self
    }
}

/// Runs suites, each scenario on a fresh harness
pub struct TestRunner {
    config: MipConfig,
    suites: Vec<TestSuite>,
    /// Filter pattern (None = run all)
    filter: Option<String>,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    pub fn new() -> Self {
        Self::with_config(MipConfig::default())
    }

    /// Runner whose harnesses use `config`
    pub fn with_config(config: MipConfig) -> Self {
        Self {
            config,
            suites: Vec::new(),
            filter: None,
        }
    }

    pub fn add_suite(&mut self, suite: TestSuite) -> &mut Self {
        self.suites.push(suite);
        self
    }

    /// Only run scenarios whose name or suite contains `pattern`
    pub fn filter(&mut self, pattern: &str) -> &mut Self {
        self.filter = Some(pattern.to_string());
        self
    }

    fn selected(&self, case: &TestCase) -> bool {
        match &self.filter {
            Some(pattern) => case.name.contains(pattern) || case.category.contains(pattern),
            None => true,
        }
    }

    /// Run every selected scenario
    pub fn run(&mut self) -> RunResult {
        let start = Instant::now();
        let mut results = Vec::new();
        let suites = std::mem::take(&mut self.suites);

        for suite in suites {
            tracing::info!("Running suite: {}", suite.name);

            for case in suite.cases {
                if !self.selected(&case) {
                    continue;
                }

                let full_name = case.full_name();
                tracing::debug!("Running scenario: {}", full_name);
                let test_start = Instant::now();

                let result = match self.run_case(&full_name, case.test_fn) {
                    Ok(()) => TestResult::Passed,
                    Err(err) => {
                        tracing::error!("Scenario {} failed: {:#}", full_name, err);
                        TestResult::Failed {
                            reason: format!("{err:#}"),
                        }
                    }
                };

                let duration = test_start.elapsed();
                if result.is_passed() {
                    tracing::info!("  ✓ {} ({:?})", case.name, duration);
                } else {
                    tracing::error!("  ✗ {} ({:?})", case.name, duration);
                }

                results.push(TestRun {
                    name: case.name,
                    category: case.category,
                    result,
                    duration,
                });
            }
        }

        RunResult::new(results, start.elapsed())
    }

    fn run_case(&self, full_name: &str, test_fn: ScenarioFn) -> Result<()> {
        let mut harness = ScenarioHarness::with_config(full_name, self.config.clone())?;
        test_fn(&mut harness)
    }
}

/// Results from running scenarios
pub struct RunResult {
    pub results: Vec<TestRun>,
    /// Total wall time
    pub duration: Duration,
}

impl RunResult {
    pub fn new(results: Vec<TestRun>, duration: Duration) -> Self {
        Self { results, duration }
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.is_passed()).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.is_passed())
    }

    /// Results grouped by suite
    pub fn by_category(&self) -> BTreeMap<String, Vec<&TestRun>> {
        let mut map: BTreeMap<String, Vec<&TestRun>> = BTreeMap::new();
        for result in &self.results {
            map.entry(result.category.clone()).or_default().push(result);
        }
        map
    }

    /// One-line count of passed, failed and total scenarios
    pub fn summary_line(&self) -> String {
        format!(
            "{} passed, {} failed, {} total in {:.2?}",
            self.passed(),
            self.failed(),
            self.total(),
            self.duration
        )
    }

    pub fn print_summary(&self) {
        println!("\n{}", self.summary_line());

        if self.failed() > 0 {
            println!("\nFailed scenarios:");
            for run in &self.results {
                if let TestResult::Failed { reason } = &run.result {
                    println!("  ✗ {}::{}: {}", run.category, run.name, reason);
                }
            }
        }
    }
}
