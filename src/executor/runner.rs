//! The runner executing the tests selected by a [TestPlan].
//!
//! Classes run one after the other, in plan order. The tests of a class are
//! handed to the current [RunnerScheduler], which may run them in parallel.
//! Each test is wrapped in statements realizing the class lifecycle; from the
//! innermost to the outermost:
//!
//! - the test method itself,
//! - the expected error check, then the time limit,
//! - `Before` methods, then `After` methods,
//! - method rules, then test rules.
//!
//! The tests of a class are in turn wrapped by `BeforeClass` methods,
//! `AfterClass` methods and class rules, unless every selected test is ignored.
use super::scheduler::{RunnerScheduler, SynchronousScheduler};
use crate::{
    errors::{SuiteError, TestError, TestResult},
    model::{
        rules, statement, Description, EachTestNotifier, Fixture,
        FrameworkMethod, Kind, Rule, RunNotifier, Statement, TestCatalog,
        TestClass,
    },
    picker::{self, TestPlan},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock, PoisonError, RwLock},
    time::Duration,
};
use tracing::{debug, debug_span, trace};

/// Runtime model of one planned class.
struct ClassModel {
    class: Arc<TestClass>,
    /// Test methods named by the plan, in declaration order.
    tests_to_be_executed: Vec<FrameworkMethod>,
    filtered_children: OnceLock<Arc<[FrameworkMethod]>>,
}

/// State shared between the runner and the work it schedules.
struct RunnerCore {
    name: String,
    plan: Arc<TestPlan>,
    classes: Vec<ClassModel>,
    method_descriptions: Mutex<HashMap<(usize, String), Arc<Description>>>,
    scheduler: RwLock<Arc<dyn RunnerScheduler>>,
}

/// Runs the classes and methods of a [TestPlan].
pub struct SelectiveRunner {
    core: Arc<RunnerCore>,
}

impl SelectiveRunner {
    /// Create a runner named `name` over the process-wide plan.
    pub fn new(name: &str, catalog: &TestCatalog) -> Result<Self, SuiteError> {
        Ok(Self::with_plan(name, picker::get_tests(catalog)?))
    }

    /// Create a runner named `name` over `plan`.
    pub fn with_plan(name: &str, plan: Arc<TestPlan>) -> Self {
        let classes = plan
            .entries()
            .iter()
            .map(|entry| {
                let tests_to_be_executed = entry
                    .class
                    .annotated_methods(Kind::Test)
                    .into_iter()
                    .filter(|m| entry.methods.iter().any(|t| t == m.name()))
                    .collect();
                ClassModel {
                    class: entry.class.clone(),
                    tests_to_be_executed,
                    filtered_children: OnceLock::new(),
                }
            })
            .collect();

        SelectiveRunner {
            core: Arc::new(RunnerCore {
                name: name.to_string(),
                plan,
                classes,
                method_descriptions: Mutex::new(HashMap::new()),
                scheduler: RwLock::new(Arc::new(SynchronousScheduler)),
            }),
        }
    }

    /// Install the scheduler used by the next class that runs.
    pub fn set_scheduler(&self, scheduler: Arc<dyn RunnerScheduler>) {
        *self
            .core
            .scheduler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = scheduler;
    }

    pub fn plan(&self) -> &Arc<TestPlan> {
        &self.core.plan
    }

    /// Describe the run: one child per planned class.
    pub fn describe(&self) -> Description {
        let mut desc =
            Description::create_suite_description(&self.core.name, vec![]);
        for idx in 0..self.core.classes.len() {
            desc.add_child(self.core.class_description(idx));
        }
        desc
    }

    /// The cached description of `method` of the planned class `class`.
    pub fn describe_child(
        &self,
        class: &str,
        method: &str,
    ) -> Option<Arc<Description>> {
        let idx = self.core.class_index(class)?;
        let children = self.core.filtered_children(idx);
        let method = children.iter().find(|m| m.name() == method)?;
        Some(self.core.describe_child(idx, method))
    }

    /// Run every planned class, reporting to `notifier`. Only a stop request
    /// ends the run early; it is returned as [TestError::StoppedByUser].
    pub fn run(&self, notifier: &Arc<RunNotifier>) -> TestResult {
        for idx in 0..self.core.classes.len() {
            let class = &self.core.classes[idx].class;
            let span = debug_span!("class", name = %class.name());
            let _enter = span.enter();

            let description = self.core.class_description(idx);
            let each = EachTestNotifier::new(notifier, description);
            match self.core.class_block(notifier, idx).evaluate() {
                Ok(()) => {}
                Err(err) if err.is_stop() => {
                    // Class teardown failures still get reported.
                    let rest = err
                        .into_flat()
                        .into_iter()
                        .filter(|err| !err.is_stop())
                        .collect();
                    if let Err(rest) = TestError::collapse(rest) {
                        each.add_failure(rest);
                    }
                    debug!("run stopped by user");
                    return Err(TestError::StoppedByUser);
                }
                Err(err) if err.is_assumption() => {
                    each.add_failed_assumption(err)
                }
                Err(err) => each.add_failure(err),
            }
        }
        Ok(())
    }
}

impl RunnerCore {
    fn class_index(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c.class.name() == name)
    }

    fn filtered_children(&self, idx: usize) -> Arc<[FrameworkMethod]> {
        let model = &self.classes[idx];
        model
            .filtered_children
            .get_or_init(|| model.tests_to_be_executed.clone().into())
            .clone()
    }

    fn class_description(&self, idx: usize) -> Arc<Description> {
        let class = &self.classes[idx].class;
        let mut desc = Description::create_suite_description(
            class.name(),
            class.annotations().to_vec(),
        );
        for child in self.filtered_children(idx).iter() {
            desc.add_child(self.describe_child(idx, child));
        }
        Arc::new(desc)
    }

    fn describe_child(
        &self,
        idx: usize,
        method: &FrameworkMethod,
    ) -> Arc<Description> {
        let mut cache = self
            .method_descriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        cache
            .entry((idx, method.name().to_string()))
            .or_insert_with(|| {
                Arc::new(Description::create_test_description(
                    self.classes[idx].class.name(),
                    method.name(),
                    method.annotations().to_vec(),
                ))
            })
            .clone()
    }

    fn current_scheduler(&self) -> Arc<dyn RunnerScheduler> {
        self.scheduler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn are_all_children_ignored(&self, idx: usize) -> bool {
        self.filtered_children(idx).iter().all(|m| m.is_ignored())
    }

    //
    // Class level
    //

    fn class_block(
        self: &Arc<Self>,
        notifier: &Arc<RunNotifier>,
        idx: usize,
    ) -> Statement {
        let mut statement = self.children_invoker(notifier, idx);
        if !self.are_all_children_ignored(idx) {
            statement = self.with_before_classes(statement, idx);
            statement = self.with_after_classes(statement, idx);
            statement = self.with_class_rules(statement, idx);
        }
        statement
    }

    fn children_invoker(
        self: &Arc<Self>,
        notifier: &Arc<RunNotifier>,
        idx: usize,
    ) -> Statement {
        let core = self.clone();
        let notifier = notifier.clone();
        Statement::new(move || core.run_children(&notifier, idx))
    }

    fn run_children(
        self: &Arc<Self>,
        notifier: &Arc<RunNotifier>,
        idx: usize,
    ) -> TestResult {
        let scheduler = self.current_scheduler();
        let scheduled = statement::guarded(|| {
            for method in self.filtered_children(idx).iter() {
                let core = self.clone();
                let notifier = notifier.clone();
                let method = method.clone();
                trace!(method = method.name(), "scheduling test");
                scheduler.schedule(Box::new(move || {
                    core.run_child(idx, &method, &notifier)
                }))?;
            }
            Ok(())
        });
        let finished = scheduler.finished();
        scheduled.and(finished)
    }

    fn with_before_classes(
        &self,
        statement: Statement,
        idx: usize,
    ) -> Statement {
        let befores =
            self.classes[idx].class.annotated_methods(Kind::BeforeClass);
        if befores.is_empty() {
            return statement;
        }
        statement::run_befores(statement, befores, None)
    }

    fn with_after_classes(
        &self,
        statement: Statement,
        idx: usize,
    ) -> Statement {
        let afters =
            self.classes[idx].class.annotated_methods(Kind::AfterClass);
        if afters.is_empty() {
            return statement;
        }
        statement::run_afters(statement, afters, None)
    }

    fn class_rules(&self, idx: usize) -> Vec<Arc<dyn Rule>> {
        let class = &self.classes[idx].class;
        let mut result = class.annotated_method_values(None, Kind::ClassRule);
        result.extend(class.annotated_field_values(None, Kind::ClassRule));
        result.retain(|rule| rule.as_test_rule().is_some());
        result
    }

    fn with_class_rules(&self, statement: Statement, idx: usize) -> Statement {
        let class_rules = self.class_rules(idx);
        if class_rules.is_empty() {
            return statement;
        }
        let description = self.class_description(idx);
        rules::run_rules(statement, &class_rules, &description)
    }

    //
    // Method level
    //

    fn run_child(
        &self,
        idx: usize,
        method: &FrameworkMethod,
        notifier: &RunNotifier,
    ) -> TestResult {
        let description = self.describe_child(idx, method);
        if method.is_ignored() {
            notifier.fire_test_ignored(&description);
            return Ok(());
        }
        run_leaf(self.method_block(idx, method), description, notifier)
    }

    fn method_block(&self, idx: usize, method: &FrameworkMethod) -> Statement {
        let fixture = match self.classes[idx].class.create_fixture() {
            Ok(fixture) => fixture,
            Err(err) => return statement::fail(err),
        };

        let mut statement =
            statement::invoke_method(method.clone(), fixture.clone());
        statement = possibly_expecting_exceptions(method, statement);
        statement = with_potential_timeout(method, statement);
        statement = self.with_befores(idx, &fixture, statement);
        statement = self.with_afters(idx, &fixture, statement);
        statement = self.with_rules(idx, method, &fixture, statement);
        statement
    }

    fn with_befores(
        &self,
        idx: usize,
        target: &Fixture,
        statement: Statement,
    ) -> Statement {
        let befores = self.classes[idx].class.annotated_methods(Kind::Before);
        if befores.is_empty() {
            return statement;
        }
        statement::run_befores(statement, befores, Some(target.clone()))
    }

    fn with_afters(
        &self,
        idx: usize,
        target: &Fixture,
        statement: Statement,
    ) -> Statement {
        let afters = self.classes[idx].class.annotated_methods(Kind::After);
        if afters.is_empty() {
            return statement;
        }
        statement::run_afters(statement, afters, Some(target.clone()))
    }

    /// Rule values of the fixture: method members first, then fields.
    fn rules(&self, idx: usize, target: &Fixture) -> Vec<Arc<dyn Rule>> {
        let class = &self.classes[idx].class;
        let mut result =
            class.annotated_method_values(Some(target), Kind::Rule);
        result.extend(class.annotated_field_values(Some(target), Kind::Rule));
        result
    }

    fn with_rules(
        &self,
        idx: usize,
        method: &FrameworkMethod,
        target: &Fixture,
        statement: Statement,
    ) -> Statement {
        let (test_rules, method_rules): (Vec<_>, Vec<_>) = self
            .rules(idx, target)
            .into_iter()
            .partition(|rule| rule.as_test_rule().is_some());

        let mut result = statement;
        for each in &method_rules {
            if let Some(rule) = each.as_method_rule() {
                result = rule.apply(result, method, target);
            }
        }
        if test_rules.is_empty() {
            return result;
        }
        let description = self.describe_child(idx, method);
        rules::run_rules(result, &test_rules, &description)
    }
}

/// Run the statement of a single test between its start and finish events.
fn run_leaf(
    statement: Statement,
    description: Arc<Description>,
    notifier: &RunNotifier,
) -> TestResult {
    let each = EachTestNotifier::new(notifier, description);
    each.fire_test_started()?;
    match statement.evaluate() {
        Ok(()) => {}
        Err(err) if err.is_assumption() => each.add_failed_assumption(err),
        Err(err) => each.add_failure(err),
    }
    each.fire_test_finished();
    Ok(())
}

fn possibly_expecting_exceptions(
    method: &FrameworkMethod,
    next: Statement,
) -> Statement {
    match method.test_annotation().and_then(|test| test.expected) {
        Some(expected) => statement::expect_exception(next, expected),
        None => next,
    }
}

fn with_potential_timeout(
    method: &FrameworkMethod,
    next: Statement,
) -> Statement {
    let timeout = method.test_annotation().map_or(0, |test| test.timeout);
    if timeout == 0 {
        return next;
    }
    statement::fail_on_timeout(next, Duration::from_millis(timeout))
}
