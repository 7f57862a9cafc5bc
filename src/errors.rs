use std::{any::Any, path::PathBuf, time::Duration};
use thiserror::Error;

/// An error raised while loading a suite file into a test plan.
/// Every variant is fatal: no runner is built from a suite that failed to load.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SuiteError {
    /// The suite file is not configured, cannot be read, or is not valid XML.
    #[error("Unable to read xml file with tests {}: {reason}", .path.display())]
    XmlWithTestsNotFound { path: PathBuf, reason: String },

    /// The suite file does not contain a single class element.
    #[error("Test class not found in xml by using {0} locator.")]
    XmlTestClassesNotFound(String),

    /// A class named in the suite file is not registered in the catalog.
    #[error("Unable to find test class {0}.")]
    ClassWithTestsNotFound(String),

    /// The suite file names methods that are not tests of their class.
    #[error(
        "Invalid test(s) was/were specified in xml file: {}.",
        .0.join(", ")
    )]
    NonExistentTestsDetected(Vec<String>),
}

/// The outcome of evaluating a statement.
pub type TestResult = Result<(), TestError>;

/// An error raised while evaluating a test, a lifecycle method or a rule.
#[derive(Debug, Error)]
pub enum TestError {
    /// An assumption did not hold. Reported, but does not fail the test.
    #[error("{0}")]
    AssumptionViolated(String),

    /// The run was stopped through [crate::model::RunNotifier::please_stop].
    #[error("The test run was stopped by the user.")]
    StoppedByUser,

    /// The test did not complete within its time limit.
    #[error("test timed out after {} milliseconds", .0.as_millis())]
    Timeout(Duration),

    /// A test declaring an expected error completed normally.
    #[error("Expected exception: {0}")]
    MissingExpected(&'static str),

    /// A test declaring an expected error raised a different one.
    #[error("Unexpected exception, expected<{expected}> but was<{actual}>")]
    UnexpectedException {
        expected: &'static str,
        actual: Box<TestError>,
    },

    /// User code panicked. Holds the panic message.
    #[error("{0}")]
    Panic(String),

    /// Several errors collected by an after-runner.
    #[error("{}", multiple_message(.0))]
    Multiple(Vec<TestError>),

    /// Any error returned from user code.
    #[error(transparent)]
    Error(#[from] anyhow::Error),
}

fn multiple_message(errors: &[TestError]) -> String {
    let mut buf = format!("There were {} errors:", errors.len());
    for err in errors {
        buf.push_str(&format!("\n  {}", err));
    }
    buf
}

impl TestError {
    /// Construct an assumption violation.
    pub fn assumption<S: Into<String>>(msg: S) -> Self {
        TestError::AssumptionViolated(msg.into())
    }

    /// Convert the payload of a caught panic.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "test panicked".to_string()
        };
        TestError::Panic(msg)
    }

    pub fn is_assumption(&self) -> bool {
        matches!(self, TestError::AssumptionViolated(_))
    }

    /// True if a stop request is among the errors, however deeply nested.
    pub fn is_stop(&self) -> bool {
        match self {
            TestError::StoppedByUser => true,
            TestError::Multiple(errors) => errors.iter().any(TestError::is_stop),
            _ => false,
        }
    }

    /// Collapse errors collected while running several methods.
    pub fn collapse(mut errors: Vec<TestError>) -> TestResult {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(TestError::Multiple(errors)),
        }
    }

    /// Flatten nested [TestError::Multiple] values into individual errors.
    pub fn into_flat(self) -> Vec<TestError> {
        match self {
            TestError::Multiple(errors) => errors
                .into_iter()
                .flat_map(TestError::into_flat)
                .collect(),
            err => vec![err],
        }
    }
}

/// Abort a test with an assumption violation when `cond` does not hold.
pub fn assume<S: Into<String>>(cond: bool, msg: S) -> TestResult {
    if cond {
        Ok(())
    } else {
        Err(TestError::assumption(msg))
    }
}
