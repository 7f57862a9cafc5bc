//! Rules wrap the statement of a test method or of a whole class.
//!
//! A rule member of a test class yields an `Arc<dyn Rule>`. The value can act
//! as a [TestRule], a [MethodRule] or both; the runner applies it once, as a
//! test rule when it is one.
use super::{statement::Statement, Description, Fixture, FrameworkMethod};
use crate::errors::{TestError, TestResult};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use tempfile::TempDir;
use tracing::debug;

/// Transforms a statement given the description of what it runs.
pub trait TestRule: Send + Sync {
    fn apply(&self, base: Statement, description: &Arc<Description>) -> Statement;
}

/// Transforms the statement of one test method given its fixture.
pub trait MethodRule: Send + Sync {
    fn apply(
        &self,
        base: Statement,
        method: &FrameworkMethod,
        target: &Fixture,
    ) -> Statement;
}

/// A value provided by a rule member.
pub trait Rule: Send + Sync {
    fn as_test_rule(&self) -> Option<&dyn TestRule> {
        None
    }

    fn as_method_rule(&self) -> Option<&dyn MethodRule> {
        None
    }
}

/// Apply every test rule in `rules` to `base`. The last rule ends up
/// outermost.
pub fn run_rules(
    base: Statement,
    rules: &[Arc<dyn Rule>],
    description: &Arc<Description>,
) -> Statement {
    rules
        .iter()
        .filter_map(|rule| rule.as_test_rule())
        .fold(base, |result, rule| rule.apply(result, description))
}

type BeforeFn = dyn Fn() -> TestResult + Send + Sync;
type AfterFn = dyn Fn() + Send + Sync;

/// Sets up a resource before the statement and tears it down afterwards,
/// whatever the outcome.
#[derive(Clone)]
pub struct ExternalResource {
    before: Arc<BeforeFn>,
    after: Arc<AfterFn>,
}

impl ExternalResource {
    pub fn new<B, A>(before: B, after: A) -> Self
    where
        B: Fn() -> TestResult + Send + Sync + 'static,
        A: Fn() + Send + Sync + 'static,
    {
        ExternalResource {
            before: Arc::new(before),
            after: Arc::new(after),
        }
    }
}

impl TestRule for ExternalResource {
    fn apply(&self, base: Statement, _: &Arc<Description>) -> Statement {
        let (before, after) = (self.before.clone(), self.after.clone());
        Statement::new(move || {
            before()?;
            let res = base.evaluate();
            after();
            res
        })
    }
}

impl Rule for ExternalResource {
    fn as_test_rule(&self) -> Option<&dyn TestRule> {
        Some(self)
    }
}

/// Creates a fresh directory before the test and deletes it afterwards.
#[derive(Clone, Default)]
pub struct TemporaryFolder {
    parent: Option<PathBuf>,
    folder: Arc<Mutex<Option<TempDir>>>,
}

impl TemporaryFolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the folders below `parent` instead of the system temp dir.
    pub fn in_dir<P: AsRef<Path>>(parent: P) -> Self {
        TemporaryFolder {
            parent: Some(parent.as_ref().to_path_buf()),
            folder: Arc::default(),
        }
    }

    /// Path of the folder. Only available while a test runs.
    pub fn root(&self) -> Result<PathBuf, TestError> {
        self.folder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .ok_or_else(|| {
                anyhow::anyhow!("the temporary folder has not yet been created")
                    .into()
            })
    }

    /// Create a new folder named `name` inside the root.
    pub fn new_folder(&self, name: &str) -> Result<PathBuf, TestError> {
        let path = self.root()?.join(name);
        fs::create_dir(&path).map_err(anyhow::Error::from)?;
        Ok(path)
    }

    /// Create a new, empty file named `name` inside the root.
    pub fn new_file(&self, name: &str) -> Result<PathBuf, TestError> {
        let path = self.root()?.join(name);
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(anyhow::Error::from)?;
        Ok(path)
    }

    fn create(&self) -> TestResult {
        let mut builder = tempfile::Builder::new();
        builder.prefix("xsuite");
        let dir = match &self.parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(anyhow::Error::from)?;
        debug!(path = %dir.path().display(), "created temporary folder");
        *self.folder.lock().unwrap_or_else(PoisonError::into_inner) = Some(dir);
        Ok(())
    }

    fn delete(&self) {
        let dir = self
            .folder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(dir) = dir {
            if let Err(err) = dir.close() {
                debug!(%err, "failed to delete temporary folder");
            }
        }
    }
}

impl TestRule for TemporaryFolder {
    fn apply(&self, base: Statement, _: &Arc<Description>) -> Statement {
        let folder = self.clone();
        Statement::new(move || {
            folder.create()?;
            let res = base.evaluate();
            folder.delete();
            res
        })
    }
}

impl Rule for TemporaryFolder {
    fn as_test_rule(&self) -> Option<&dyn TestRule> {
        Some(self)
    }
}

/// Makes the name of the running test method available inside the test.
#[derive(Clone, Default)]
pub struct TestName(Arc<Mutex<Option<String>>>);

impl TestName {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method_name(&self) -> Option<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TestRule for TestName {
    fn apply(&self, base: Statement, description: &Arc<Description>) -> Statement {
        let slot = self.0.clone();
        let name = description.method_name().map(str::to_string);
        Statement::new(move || {
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = name.clone();
            base.evaluate()
        })
    }
}

impl Rule for TestName {
    fn as_test_rule(&self) -> Option<&dyn TestRule> {
        Some(self)
    }
}
