//! Statements are the unit of execution: a closure evaluated to run one piece
//! of a test. Lifecycle behavior is layered on by wrapping one statement in
//! another. The wrappers in this module are listed from the innermost
//! ([invoke_method]) to the outermost ones used around a test method.
use super::{annotations::Expected, FrameworkMethod, Fixture};
use crate::errors::{TestError, TestResult};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{runtime, task, time};
use tracing::warn;

/// A composable, re-evaluable unit of test execution.
#[derive(Clone)]
pub struct Statement(Arc<dyn Fn() -> TestResult + Send + Sync>);

impl Statement {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn() -> TestResult + Send + Sync + 'static,
    {
        Statement(Arc::new(body))
    }

    /// Run the statement. Panics raised while evaluating are returned as
    /// [TestError::Panic].
    pub fn evaluate(&self) -> TestResult {
        guarded(|| (self.0)())
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Statement")
    }
}

/// Run `body`, converting a panic into an error.
pub(crate) fn guarded<F: FnOnce() -> TestResult>(body: F) -> TestResult {
    panic::catch_unwind(AssertUnwindSafe(body))
        .unwrap_or_else(|payload| Err(TestError::from_panic(payload)))
}

/// Call `method` on the fixture.
pub fn invoke_method(method: FrameworkMethod, target: Fixture) -> Statement {
    Statement::new(move || method.invoke_explosively(Some(&target)))
}

/// Succeed iff `next` raises the expected error. Assumption violations pass
/// through untouched.
pub fn expect_exception(next: Statement, expected: Expected) -> Statement {
    Statement::new(move || match next.evaluate() {
        Ok(()) => Err(TestError::MissingExpected(expected.name())),
        Err(err) if err.is_assumption() => Err(err),
        Err(err) if expected.matches(&err) => Ok(()),
        Err(err) => Err(TestError::UnexpectedException {
            expected: expected.name(),
            actual: Box::new(err),
        }),
    })
}

/// Evaluate `next` on a blocking thread of a private runtime and fail once
/// `timeout` elapses. A body that outlives its timeout is abandoned, not
/// killed: it keeps running on its thread while the outer statements go on.
pub fn fail_on_timeout(next: Statement, timeout: Duration) -> Statement {
    Statement::new(move || {
        let rt = runtime::Builder::new_current_thread()
            .enable_time()
            .thread_name("Time-limited test")
            .build()
            .map_err(|err| TestError::Error(err.into()))?;
        let body = next.clone();
        let res = rt.block_on(async move {
            let handle = task::spawn_blocking(move || body.evaluate());
            time::timeout(timeout, handle).await
        });
        // Do not wait for an abandoned body.
        rt.shutdown_background();

        match res {
            Ok(Ok(res)) => res,
            Ok(Err(err)) => Err(TestError::Panic(err.to_string())),
            Err(_) => {
                warn!(millis = timeout.as_millis() as u64, "test timed out");
                Err(TestError::Timeout(timeout))
            }
        }
    })
}

/// Invoke every method in `befores`, then `next`. The first failure
/// short-circuits.
pub fn run_befores(
    next: Statement,
    befores: Vec<FrameworkMethod>,
    target: Option<Fixture>,
) -> Statement {
    Statement::new(move || {
        for before in &befores {
            before.invoke_explosively(target.as_ref())?;
        }
        next.evaluate()
    })
}

/// Evaluate `next`, then invoke every method in `afters` regardless of the
/// outcome. All errors are collected.
pub fn run_afters(
    next: Statement,
    afters: Vec<FrameworkMethod>,
    target: Option<Fixture>,
) -> Statement {
    Statement::new(move || {
        let mut errors = Vec::new();
        if let Err(err) = next.evaluate() {
            errors.push(err);
        }
        for after in &afters {
            if let Err(err) = after.invoke_explosively(target.as_ref()) {
                errors.push(err);
            }
        }
        TestError::collapse(errors)
    })
}

/// A statement that fails with `err`.
/// The original error is returned by the first evaluation; later evaluations
/// report its message.
pub fn fail(err: TestError) -> Statement {
    let msg = err.to_string();
    let err = Mutex::new(Some(err));
    Statement::new(move || {
        let taken = err.lock().ok().and_then(|mut slot| slot.take());
        Err(taken
            .unwrap_or_else(|| TestError::Error(anyhow::anyhow!("{}", msg))))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        thread,
        time::Instant,
    };

    #[derive(Debug, thiserror::Error)]
    #[error("expected failure")]
    struct Expectedly;

    fn failing(msg: &'static str) -> Statement {
        Statement::new(move || Err(TestError::Panic(msg.to_string())))
    }

    #[test]
    fn evaluate_catches_panics() {
        let stmt = Statement::new(|| panic!("inside"));
        let err = stmt.evaluate().unwrap_err();
        assert!(matches!(err, TestError::Panic(msg) if msg == "inside"));
    }

    #[test]
    fn expectation_met() {
        let stmt = Statement::new(|| Err(TestError::Error(Expectedly.into())));
        let stmt = expect_exception(stmt, Expected::error::<Expectedly>());
        assert!(stmt.evaluate().is_ok());
    }

    #[test]
    fn expectation_missing() {
        let stmt = expect_exception(
            Statement::new(|| Ok(())),
            Expected::error::<Expectedly>(),
        );
        assert!(matches!(
            stmt.evaluate(),
            Err(TestError::MissingExpected(_))
        ));
    }

    #[test]
    fn expectation_mismatch_and_assumption() {
        let stmt =
            expect_exception(failing("other"), Expected::error::<Expectedly>());
        assert!(matches!(
            stmt.evaluate(),
            Err(TestError::UnexpectedException { .. })
        ));

        let stmt = expect_exception(
            Statement::new(|| Err(TestError::assumption("skip"))),
            Expected::panic(),
        );
        assert!(stmt.evaluate().unwrap_err().is_assumption());
    }

    #[test]
    fn timeout_expires() {
        let stmt = Statement::new(|| {
            thread::sleep(Duration::from_millis(300));
            Ok(())
        });
        let stmt = fail_on_timeout(stmt, Duration::from_millis(20));
        assert!(matches!(stmt.evaluate(), Err(TestError::Timeout(_))));
    }

    #[test]
    fn timeout_does_not_wait_for_abandoned_body() {
        let release = Arc::new(AtomicBool::new(false));
        let flag = release.clone();
        let stmt = Statement::new(move || {
            while !flag.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        });
        let stmt = fail_on_timeout(stmt, Duration::from_millis(20));
        let start = Instant::now();
        assert!(matches!(stmt.evaluate(), Err(TestError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_secs(5));
        release.store(true, Ordering::SeqCst);
    }

    #[test]
    fn timeout_inside_blocking_pool() {
        let rt = runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let stmt = fail_on_timeout(failing("pooled"), Duration::from_secs(5));
        let res = rt.block_on(rt.spawn_blocking(move || stmt.evaluate()));
        assert!(
            matches!(res.unwrap(), Err(TestError::Panic(m)) if m == "pooled")
        );
    }

    #[test]
    fn timeout_passes_result_through() {
        let stmt = fail_on_timeout(failing("quick"), Duration::from_secs(5));
        assert!(
            matches!(stmt.evaluate(), Err(TestError::Panic(m)) if m == "quick")
        );
        let stmt =
            fail_on_timeout(Statement::new(|| Ok(())), Duration::from_secs(5));
        assert!(stmt.evaluate().is_ok());
    }

    #[test]
    fn afters_run_on_failure_and_collect() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let after = FrameworkMethod::new_static(
            "after",
            vec![super::super::Annotation::After],
            move || {
                c.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Panic("after".into()))
            },
        );
        let stmt = run_afters(failing("body"), vec![after], None);
        let err = stmt.evaluate().unwrap_err();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(err.into_flat().len(), 2);
    }

    #[test]
    fn befores_short_circuit() {
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        let before = FrameworkMethod::new_static(
            "before",
            vec![super::super::Annotation::Before],
            || Err(TestError::Panic("before".into())),
        );
        let body = Statement::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(run_befores(body, vec![before], None).evaluate().is_err());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fail_reports_original_then_message() {
        let stmt = fail(TestError::Panic("ctor".into()));
        assert!(matches!(stmt.evaluate(), Err(TestError::Panic(_))));
        let second = stmt.evaluate().unwrap_err();
        assert_eq!(second.to_string(), "ctor");
    }
}
