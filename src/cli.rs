use std::path::PathBuf;
use structopt::StructOpt;

/// Options for the CLI.
#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "xsuite",
    about = "Run the tests selected by an XML suite file."
)]
pub struct Opts {
    /// Suite file to run, relative to the suites directory. Takes precedence
    /// over the `testsXml` environment variable.
    #[structopt(short = "x", long)]
    pub tests_xml: Option<String>,

    /// Directory containing the suite files.
    #[structopt(long, parse(from_os_str))]
    pub suites_dir: Option<PathBuf>,

    /// Maximum number of tests of a class run at the same time.
    #[structopt(short, long)]
    pub jobs: Option<usize>,

    /// Print every test, including the passing ones.
    #[structopt(short, long)]
    pub verbose: bool,

    /// Only display tests with a specific outcome.
    #[structopt(short, long)]
    pub only: Option<OnlyOpt>,

    /// Print the selected tests without running them.
    #[structopt(short = "n", long)]
    pub dry_run: bool,
}

/// Possible values for the --only flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OnlyOpt {
    /// Failing tests.
    Fail,
    /// Passing tests.
    Pass,
    /// Ignored tests and tests whose assumptions did not hold.
    Ignored,
}

impl std::str::FromStr for OnlyOpt {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(OnlyOpt::Fail),
            "pass" => Ok(OnlyOpt::Pass),
            "ignored" => Ok(OnlyOpt::Ignored),
            _ => anyhow::bail!("Must be one of fail, pass, ignored."),
        }
    }
}
