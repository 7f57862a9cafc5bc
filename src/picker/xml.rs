//! Reader for XML suite files.
//!
//! Only `<suite>` elements are interpreted, wherever they sit in the
//! document, and within them only the `<test>/<classes>/<class>` path and the
//! `<methods>/<include>` children of a class. Everything else is ignored.
use quick_xml::{events::Event, Reader};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::errors::SuiteError;

/// Locator of the class elements of a suite, as reported in errors.
pub const CLASS_XPATH: &str = "//suite/test/classes/class";

#[derive(Debug, Deserialize)]
struct SuiteDoc {
    #[serde(rename = "test", default)]
    tests: Vec<TestDoc>,
}

#[derive(Debug, Deserialize)]
struct TestDoc {
    #[serde(rename = "classes", default)]
    classes: Vec<ClassesDoc>,
}

#[derive(Debug, Deserialize)]
struct ClassesDoc {
    #[serde(rename = "class", default)]
    classes: Vec<ClassDoc>,
}

#[derive(Debug, Deserialize)]
struct ClassDoc {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "methods", default)]
    methods: Vec<MethodsDoc>,
}

#[derive(Debug, Deserialize)]
struct MethodsDoc {
    #[serde(rename = "include", default)]
    includes: Vec<IncludeDoc>,
}

#[derive(Debug, Deserialize)]
struct IncludeDoc {
    #[serde(rename = "@name")]
    name: String,
}

/// A `<class>` element of a suite file.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    /// Fully qualified class name.
    pub name: String,
    /// Names from `methods/include/@name`, in document order. Empty means
    /// every test of the class.
    pub methods: Vec<String>,
}

/// The class entries of a suite file in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteFile {
    pub path: PathBuf,
    pub classes: Vec<ClassEntry>,
}

impl SuiteFile {
    /// Read and parse the suite file at `path`.
    pub fn from_path(path: &Path) -> Result<Self, SuiteError> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            SuiteError::XmlWithTestsNotFound {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        })?;
        Self::parse(path, &contents)
    }

    /// Parse `contents`, using `path` for error reporting.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, SuiteError> {
        let not_found = |reason: String| SuiteError::XmlWithTestsNotFound {
            path: path.to_path_buf(),
            reason,
        };

        let mut classes = Vec::new();
        for suite in suite_elements(contents).map_err(not_found)? {
            let doc: SuiteDoc = quick_xml::de::from_str(suite)
                .map_err(|err| not_found(err.to_string()))?;
            classes.extend(
                doc.tests
                    .into_iter()
                    .flat_map(|test| test.classes)
                    .flat_map(|classes| classes.classes)
                    .map(|class| ClassEntry {
                        name: class.name,
                        methods: class
                            .methods
                            .into_iter()
                            .flat_map(|methods| methods.includes)
                            .map(|include| include.name)
                            .collect(),
                    }),
            );
        }

        if classes.is_empty() {
            return Err(SuiteError::XmlTestClassesNotFound(
                CLASS_XPATH.to_string(),
            ));
        }

        Ok(SuiteFile {
            path: path.to_path_buf(),
            classes,
        })
    }
}

/// Source text of every outermost `suite` element, at any depth, in
/// document order. The whole document must be well formed.
fn suite_elements(contents: &str) -> Result<Vec<&str>, String> {
    let mut reader = Reader::from_str(contents);
    let mut suites = Vec::new();
    let mut seen_element = false;
    loop {
        let start = reader.buffer_position();
        match reader.read_event().map_err(|err| err.to_string())? {
            Event::Start(e) => {
                seen_element = true;
                if e.name().as_ref() == b"suite" {
                    reader
                        .read_to_end(e.name())
                        .map_err(|err| err.to_string())?;
                    suites.push(&contents[start..reader.buffer_position()]);
                }
            }
            Event::Empty(e) => {
                seen_element = true;
                if e.name().as_ref() == b"suite" {
                    suites.push(&contents[start..reader.buffer_position()]);
                }
            }
            Event::Eof if !seen_element => {
                return Err("document has no root element".to_string())
            }
            Event::Eof => return Ok(suites),
            _ => {}
        }
    }
}
