//! Schedulers decide where and when the tests of one class run.
use crate::errors::{TestError, TestResult};
use futures::future;
use std::{
    io, mem,
    sync::{Mutex, PoisonError},
};
use tokio::{runtime, task::JoinHandle};
use tracing::trace;

/// The run of a single test method. Only a stop request is returned as an
/// error; test failures are reported to the notifier.
pub type ChildWork = Box<dyn FnOnce() -> TestResult + Send + 'static>;

/// Dispatches the tests of a class.
pub trait RunnerScheduler: Send + Sync {
    /// Run `child` now or queue it.
    fn schedule(&self, child: ChildWork) -> TestResult;

    /// Called once every test of a class was scheduled. Returns once all of
    /// them completed.
    fn finished(&self) -> TestResult;
}

/// Runs every test on the caller's thread as it is scheduled.
#[derive(Debug, Default, Clone, Copy)]
pub struct SynchronousScheduler;

impl RunnerScheduler for SynchronousScheduler {
    fn schedule(&self, child: ChildWork) -> TestResult {
        child()
    }

    fn finished(&self) -> TestResult {
        Ok(())
    }
}

/// Runs tests on a pool of worker threads.
///
/// `finished` blocks on the pool, so it must not be called from inside an
/// async runtime.
pub struct ParallelScheduler {
    runtime: runtime::Runtime,
    pending: Mutex<Vec<JoinHandle<TestResult>>>,
}

impl ParallelScheduler {
    /// Create a scheduler running at most `jobs` tests at once.
    pub fn new(jobs: usize) -> io::Result<Self> {
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(jobs.max(1))
            .thread_name("xsuite-worker")
            .build()?;
        Ok(ParallelScheduler {
            runtime,
            pending: Mutex::new(Vec::new()),
        })
    }

    /// One worker per CPU.
    pub fn with_available_parallelism() -> io::Result<Self> {
        Self::new(num_cpus::get())
    }
}

impl RunnerScheduler for ParallelScheduler {
    fn schedule(&self, child: ChildWork) -> TestResult {
        let handle = self.runtime.spawn_blocking(child);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
        Ok(())
    }

    fn finished(&self) -> TestResult {
        let handles = mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        trace!(tasks = handles.len(), "waiting for scheduled tests");

        let results = self.runtime.block_on(future::join_all(handles));
        results
            .into_iter()
            .map(|res| {
                res.unwrap_or_else(|err| Err(TestError::Panic(err.to_string())))
            })
            .find(Result::is_err)
            .unwrap_or(Ok(()))
    }
}
