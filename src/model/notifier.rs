//! Event bus between the runner and whoever observes a run.
use super::Description;
use crate::errors::{TestError, TestResult};
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};

/// A test that failed together with the error it raised.
#[derive(Debug)]
pub struct Failure {
    description: Arc<Description>,
    error: TestError,
}

impl Failure {
    pub fn new(description: Arc<Description>, error: TestError) -> Self {
        Failure { description, error }
    }

    pub fn description(&self) -> &Arc<Description> {
        &self.description
    }

    pub fn error(&self) -> &TestError {
        &self.error
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.description, self.error)
    }
}

/// Receives lifecycle events. Listeners may be called from several threads
/// when methods are scheduled in parallel.
pub trait RunListener: Send + Sync {
    fn test_started(&self, _description: &Arc<Description>) {}
    fn test_finished(&self, _description: &Arc<Description>) {}
    fn test_failure(&self, _failure: &Failure) {}
    fn test_assumption_failure(&self, _failure: &Failure) {}
    fn test_ignored(&self, _description: &Arc<Description>) {}
}

/// Fans events out to the registered listeners.
#[derive(Default)]
pub struct RunNotifier {
    listeners: RwLock<Vec<Arc<dyn RunListener>>>,
    please_stop: AtomicBool,
}

impl RunNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn RunListener>) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }

    pub fn remove_listener(&self, listener: &Arc<dyn RunListener>) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.retain(|l| !Arc::ptr_eq(l, listener));
        }
    }

    fn each<F: Fn(&dyn RunListener)>(&self, f: F) {
        if let Ok(listeners) = self.listeners.read() {
            listeners.iter().for_each(|l| f(l.as_ref()));
        }
    }

    /// Announce that a test is about to run. Fails with
    /// [TestError::StoppedByUser] once a stop was requested.
    pub fn fire_test_started(&self, description: &Arc<Description>) -> TestResult {
        if self.please_stop.load(Ordering::SeqCst) {
            return Err(TestError::StoppedByUser);
        }
        self.each(|l| l.test_started(description));
        Ok(())
    }

    pub fn fire_test_finished(&self, description: &Arc<Description>) {
        self.each(|l| l.test_finished(description));
    }

    pub fn fire_test_failure(&self, failure: &Failure) {
        self.each(|l| l.test_failure(failure));
    }

    pub fn fire_test_assumption_failed(&self, failure: &Failure) {
        self.each(|l| l.test_assumption_failure(failure));
    }

    pub fn fire_test_ignored(&self, description: &Arc<Description>) {
        self.each(|l| l.test_ignored(description));
    }

    /// Ask the run to stop before the next test starts.
    pub fn please_stop(&self) {
        self.please_stop.store(true, Ordering::SeqCst);
    }
}

/// Notifier bound to one description.
pub struct EachTestNotifier<'a> {
    notifier: &'a RunNotifier,
    description: Arc<Description>,
}

impl<'a> EachTestNotifier<'a> {
    pub fn new(notifier: &'a RunNotifier, description: Arc<Description>) -> Self {
        EachTestNotifier {
            notifier,
            description,
        }
    }

    /// Report `error`. Collected errors are reported one by one.
    pub fn add_failure(&self, error: TestError) {
        for err in error.into_flat() {
            self.notifier
                .fire_test_failure(&Failure::new(self.description.clone(), err));
        }
    }

    pub fn add_failed_assumption(&self, error: TestError) {
        self.notifier.fire_test_assumption_failed(&Failure::new(
            self.description.clone(),
            error,
        ));
    }

    pub fn fire_test_started(&self) -> TestResult {
        self.notifier.fire_test_started(&self.description)
    }

    pub fn fire_test_finished(&self) {
        self.notifier.fire_test_finished(&self.description)
    }

    pub fn fire_test_ignored(&self) {
        self.notifier.fire_test_ignored(&self.description)
    }
}
