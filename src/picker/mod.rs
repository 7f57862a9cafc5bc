//! Pickers gather the tests to run. The XML picker reads a suite file and
//! validates it against a [crate::model::TestCatalog].
pub mod loader;
pub mod xml;

pub use loader::{get_tests, PlanEntry, SuiteLoader, TestPlan};
