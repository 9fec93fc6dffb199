//! Scenario runner
//!
//! Command-line tool for replaying the MIP runtime scenarios.
//!
//! Usage:
//!   mip-scenarios                       # Run all scenarios
//!   mip-scenarios --filter scheduling   # Run scenarios matching "scheduling"
//!   mip-scenarios --list                # List all scenarios
//!   mip-scenarios --config timing.toml  # Run with a custom runtime config

use anyhow::{Context, Result};
use clap::Parser;
use mip_runtime::MipConfig;
use mip_test_suite::{runner::TestRunner, tests};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mip-scenarios")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replay MIP element runtime scenarios", long_about = None)]
struct Cli {
    /// List all scenarios and exit
    #[arg(long)]
    list: bool,

    /// Only run scenarios whose name or suite contains this pattern
    #[arg(short, long)]
    filter: Option<String>,

    /// Runtime configuration (TOML) used for every scenario
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if cli.list {
        println!("Available scenario suites:");
        for suite in tests::all_suites() {
            println!("\n  {}:", suite.name);
            for case in &suite.cases {
                println!("    - {}", case.name);
            }
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            MipConfig::from_toml_str(&text)
                .with_context(|| format!("loading {}", path.display()))?
        }
        None => MipConfig::default(),
    };

    println!("MIP runtime scenarios\n");

    let mut runner = TestRunner::with_config(config);
    for suite in tests::all_suites() {
        runner.add_suite(suite);
    }

    if let Some(ref pattern) = cli.filter {
        println!("Running scenarios matching: {}\n", pattern);
        runner.filter(pattern);
    }

    let result = runner.run();
    result.print_summary();

    if result.all_passed() {
        println!("\nAll scenarios passed!");
        Ok(())
    } else {
        std::process::exit(1);
    }
}
