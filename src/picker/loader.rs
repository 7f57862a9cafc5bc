//! Turns a suite file into a validated [TestPlan].
use super::xml::{ClassEntry, SuiteFile};
use crate::{
    config::Config,
    errors::SuiteError,
    model::{TestCatalog, TestClass},
};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};

/// A class of the plan and the names of the tests to run from it.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub class: Arc<TestClass>,
    pub methods: Vec<String>,
}

/// The validated selection of a suite file: classes in document order, each
/// with the test names to run.
#[derive(Debug, Default, Clone)]
pub struct TestPlan {
    entries: Vec<PlanEntry>,
}

impl TestPlan {
    /// Add `class` to the plan. A class that is already planned keeps its
    /// position and takes the new method names.
    pub fn insert(&mut self, class: Arc<TestClass>, methods: Vec<String>) {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.class.name() == class.name())
        {
            Some(entry) => {
                entry.class = class;
                entry.methods = methods;
            }
            None => self.entries.push(PlanEntry { class, methods }),
        }
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Method names planned for the class named `name`.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|entry| entry.class.name() == name)
            .map(|entry| entry.methods.as_slice())
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.class.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loads a suite file and checks it against the classes of a catalog.
pub struct SuiteLoader<'a> {
    config: Config,
    catalog: &'a TestCatalog,
}

impl<'a> SuiteLoader<'a> {
    pub fn new(config: Config, catalog: &'a TestCatalog) -> Self {
        SuiteLoader { config, catalog }
    }

    /// Build the plan for the configured suite file.
    pub fn load(&self) -> Result<TestPlan, SuiteError> {
        let path = self.config.suite_path()?;
        let suite = SuiteFile::from_path(&path).map_err(|err| {
            error!(path = %path.display(), %err, "unable to load xml file with tests");
            err
        })?;

        let mut plan = TestPlan::default();
        for entry in suite.classes {
            let (class, methods) = self.resolve(entry)?;
            plan.insert(class, methods);
        }
        info!(
            path = %path.display(),
            classes = plan.len(),
            "loaded test plan"
        );
        Ok(plan)
    }

    fn resolve(
        &self,
        entry: ClassEntry,
    ) -> Result<(Arc<TestClass>, Vec<String>), SuiteError> {
        let ClassEntry { name, methods } = entry;
        let class = self.catalog.resolve(&name).ok_or_else(|| {
            error!(class = %name, "unable to find test class");
            SuiteError::ClassWithTestsNotFound(name.clone())
        })?;

        let discovered = class.test_method_names();
        if methods.is_empty() {
            debug!(class = %name, tests = discovered.len(), "planned every test");
            return Ok((class, discovered));
        }

        let invalid: Vec<String> = methods
            .iter()
            .filter(|m| !discovered.contains(*m))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(SuiteError::NonExistentTestsDetected(invalid));
        }

        debug!(class = %name, tests = methods.len(), "planned selected tests");
        Ok((class, methods))
    }
}

static INSTANCE: OnceLock<Result<Arc<TestPlan>, SuiteError>> = OnceLock::new();

/// The process-wide plan, loaded on first use from the suite file named by
/// the `testsXml` environment variable. Later calls return the same plan, or
/// the same error, whatever catalog they pass.
pub fn get_tests(catalog: &TestCatalog) -> Result<Arc<TestPlan>, SuiteError> {
    INSTANCE
        .get_or_init(|| {
            SuiteLoader::new(Config::from_env(), catalog)
                .load()
                .map(Arc::new)
        })
        .clone()
}
