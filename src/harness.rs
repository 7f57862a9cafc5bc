//! Entry point for test binaries built with `harness = false`.
use crate::{
    cli::Opts,
    config::Config,
    executor::{ConsoleListener, ParallelScheduler, SelectiveRunner},
    model::{RunNotifier, TestCatalog},
    picker::{SuiteLoader, TestPlan},
};
use anyhow::Context as _;
use std::sync::Arc;
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Parse the command line, run the suite against `catalog` and exit with the
/// number of failing tests.
pub fn main(name: &str, catalog: TestCatalog) -> ! {
    let opts = Opts::from_args();
    std::process::exit(match run(name, &catalog, &opts) {
        Err(err) => {
            println!("error: {:#}", err);
            1
        }
        Ok(failed_tests) => failed_tests,
    })
}

/// Install a stderr logger filtered by `RUST_LOG`. Does nothing when a
/// subscriber is already installed.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "xsuite=debug" } else { "xsuite=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn dry_run(plan: &TestPlan) {
    use colored::*;
    for entry in plan.entries() {
        for method in &entry.methods {
            println!(
                "{}{}{}",
                entry.class.name().blue(),
                ":".blue(),
                method.blue()
            );
        }
    }
}

/// Run the suite selected by `opts`. Returns the number of failing tests.
pub fn run(
    name: &str,
    catalog: &TestCatalog,
    opts: &Opts,
) -> anyhow::Result<i32> {
    init_logging(opts.verbose);

    let mut config = Config::from_env();
    if let Some(tests_xml) = &opts.tests_xml {
        config = config.with_tests_xml(tests_xml.as_str());
    }
    if let Some(dir) = &opts.suites_dir {
        config = config.with_suites_dir(dir.as_path());
    }

    let plan = SuiteLoader::new(config, catalog)
        .load()
        .context("unable to load the suite")?;

    // Print out the selected tests in dry run mode.
    if opts.dry_run {
        dry_run(&plan);
        return Ok(0);
    }

    let runner = SelectiveRunner::with_plan(name, Arc::new(plan));
    if let Some(jobs) = opts.jobs.filter(|jobs| *jobs > 1) {
        runner.set_scheduler(Arc::new(ParallelScheduler::new(jobs)?));
    }

    let notifier = Arc::new(RunNotifier::new());
    let console = Arc::new(ConsoleListener::new(opts.clone()));
    notifier.add_listener(console.clone());

    info!(suite = name, tests = runner.describe().test_count(), "running");
    runner.run(&notifier)?;

    let summary = console.summary();
    println!("{}", summary.report_str());
    Ok(summary.failing as i32)
}
