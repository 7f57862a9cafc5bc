use crate::errors::SuiteError;
use std::{env, path::PathBuf};

/// Directory suite files are resolved against.
pub const SUITES_FOLDER: &str = "./src/test/resources/suites/";

/// Environment variable naming the suite file.
pub const TESTS_XML_VAR: &str = "testsXml";

/// Where to find the suite file for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory containing suite files.
    pub suites_dir: PathBuf,
    /// Name of the suite file inside `suites_dir`.
    pub tests_xml: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            suites_dir: PathBuf::from(SUITES_FOLDER),
            tests_xml: None,
        }
    }
}

impl Config {
    /// Read the suite file name from the `testsXml` environment variable.
    pub fn from_env() -> Self {
        Config {
            tests_xml: env::var(TESTS_XML_VAR).ok(),
            ..Config::default()
        }
    }

    /// Use the suite file `name`.
    pub fn with_tests_xml<S: Into<String>>(mut self, name: S) -> Self {
        self.tests_xml = Some(name.into());
        self
    }

    /// Resolve suite files against `dir`.
    pub fn with_suites_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.suites_dir = dir.into();
        self
    }

    /// Full path of the suite file.
    pub fn suite_path(&self) -> Result<PathBuf, SuiteError> {
        match &self.tests_xml {
            Some(name) => Ok(self.suites_dir.join(name)),
            None => Err(SuiteError::XmlWithTestsNotFound {
                path: self.suites_dir.clone(),
                reason: format!("the `{}` variable is not set", TESTS_XML_VAR),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_against_suites_dir() {
        let conf = Config::default().with_tests_xml("smoke.xml");
        assert_eq!(
            conf.suite_path().unwrap(),
            PathBuf::from("./src/test/resources/suites/smoke.xml")
        );
        let conf = conf.with_suites_dir("/tmp/suites");
        assert_eq!(
            conf.suite_path().unwrap(),
            PathBuf::from("/tmp/suites/smoke.xml")
        );
    }

    #[test]
    fn missing_name_is_an_error() {
        assert!(matches!(
            Config::default().suite_path(),
            Err(SuiteError::XmlWithTestsNotFound { .. })
        ));
    }
}
