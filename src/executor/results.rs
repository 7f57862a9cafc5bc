use crate::{
    cli,
    model::{Description, Failure, RunListener},
};
use std::{
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

/// Track the state of a test.
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    /// Started and no failure reported so far.
    Passed,
    /// One message per reported failure.
    Failed(Vec<String>),
    /// An assumption did not hold. Contains its message.
    AssumptionFailed(String),
    /// Marked as ignored; never started.
    Ignored,
}

/// Outcome of one test, or of a class whose setup failed.
#[derive(Debug, Clone)]
pub struct Test {
    pub description: Arc<Description>,
    pub state: State,
}

impl Test {
    fn with_only_opt(&self, only: &cli::OnlyOpt) -> bool {
        use cli::OnlyOpt as O;
        match (only, &self.state) {
            (O::Fail, State::Failed(..)) => true,
            (O::Pass, State::Passed) => true,
            (O::Ignored, State::Ignored) => true,
            (O::Ignored, State::AssumptionFailed(..)) => true,
            (O::Fail, _) | (O::Pass, _) | (O::Ignored, _) => false,
        }
    }

    /// Returns true if this test should be printed with the current options.
    pub fn should_print(&self, opts: &cli::Opts) -> bool {
        if opts.verbose {
            return true;
        }
        if let Some(only) = &opts.only {
            return self.with_only_opt(only);
        }
        // Otherwise just print failing and skipped tests
        !matches!(self.state, State::Passed)
    }

    /// Generate colorized string to report the results of this test.
    pub fn report_str(&self, show_messages: bool) -> String {
        use colored::*;

        let mut buf = String::new();
        let name = self.description.display_name();
        match &self.state {
            State::Passed => {
                buf.push_str(&"✓ ".green().to_string());
                buf.push_str(&name.green().to_string());
            }
            State::Failed(messages) => {
                buf.push_str(&"✗ ".red().to_string());
                buf.push_str(&name.red().to_string());
                if self.description.is_suite() {
                    buf.push_str(&" (class)".dimmed().to_string());
                }
                if show_messages {
                    for msg in messages {
                        buf.push_str(&format!("\n    {}", msg));
                    }
                }
            }
            State::AssumptionFailed(msg) => {
                buf.push_str(&"? ".yellow().to_string());
                buf.push_str(&name.yellow().to_string());
                if show_messages {
                    buf.push_str(&format!(" ({})", msg).dimmed().to_string());
                }
            }
            State::Ignored => {
                buf.push_str(&"~ ".dimmed().to_string());
                buf.push_str(&name.dimmed().to_string());
                buf.push_str(&" (ignored)".dimmed().to_string());
            }
        };
        buf
    }
}

/// Counts of a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub passing: usize,
    pub failing: usize,
    pub ignored: usize,
}

impl Summary {
    pub fn from_tests<'a, I: IntoIterator<Item = &'a Test>>(tests: I) -> Self {
        tests.into_iter().fold(Summary::default(), |mut acc, test| {
            match test.state {
                State::Passed => acc.passing += 1,
                State::Failed(..) => acc.failing += 1,
                State::AssumptionFailed(..) | State::Ignored => {
                    acc.ignored += 1
                }
            }
            acc
        })
    }

    pub fn report_str(&self) -> String {
        use colored::*;
        format!(
            "  {} / {} / {}",
            format!("{} passing", self.passing).green(),
            format!("{} failing", self.failing).red(),
            format!("{} ignored", self.ignored).yellow(),
        )
    }
}

/// A lifecycle event as observed by a [RecordingListener].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started(String),
    Finished(String),
    Failure(String, String),
    AssumptionFailure(String, String),
    Ignored(String),
}

#[derive(Default)]
struct Record {
    events: Vec<Event>,
    tests: Vec<Test>,
}

/// Remembers every event of a run and the resulting state of each test, in
/// the order tests were started.
#[derive(Default)]
pub struct RecordingListener {
    record: Mutex<Record>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    pub fn results(&self) -> Vec<Test> {
        self.lock().tests.clone()
    }

    pub fn summary(&self) -> Summary {
        Summary::from_tests(&self.lock().tests)
    }

    /// The recorded outcome for `description`.
    pub fn result_of(&self, description: &Arc<Description>) -> Option<Test> {
        self.lock()
            .tests
            .iter()
            .rev()
            .find(|t| Arc::ptr_eq(&t.description, description))
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Record> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `update` to the latest test for `description`, adding one when
    /// the description was never started (a class level failure).
    fn update<F: FnOnce(&mut State)>(
        record: &mut Record,
        description: &Arc<Description>,
        update: F,
    ) {
        let found = record
            .tests
            .iter_mut()
            .rev()
            .find(|t| Arc::ptr_eq(&t.description, description));
        match found {
            Some(test) => update(&mut test.state),
            None => {
                let mut state = State::Passed;
                update(&mut state);
                record.tests.push(Test {
                    description: description.clone(),
                    state,
                });
            }
        }
    }
}

impl RunListener for RecordingListener {
    fn test_started(&self, description: &Arc<Description>) {
        let mut record = self.lock();
        let name = description.display_name().to_string();
        record.events.push(Event::Started(name));
        record.tests.push(Test {
            description: description.clone(),
            state: State::Passed,
        });
    }

    fn test_finished(&self, description: &Arc<Description>) {
        let name = description.display_name().to_string();
        self.lock().events.push(Event::Finished(name));
    }

    fn test_failure(&self, failure: &Failure) {
        let mut record = self.lock();
        let description = failure.description();
        record.events.push(Event::Failure(
            description.display_name().to_string(),
            failure.message(),
        ));
        Self::update(&mut record, description, |state| match state {
            State::Failed(messages) => messages.push(failure.message()),
            other => *other = State::Failed(vec![failure.message()]),
        });
    }

    fn test_assumption_failure(&self, failure: &Failure) {
        let mut record = self.lock();
        let description = failure.description();
        record.events.push(Event::AssumptionFailure(
            description.display_name().to_string(),
            failure.message(),
        ));
        Self::update(&mut record, description, |state| {
            *state = State::AssumptionFailed(failure.message())
        });
    }

    fn test_ignored(&self, description: &Arc<Description>) {
        let mut record = self.lock();
        let name = description.display_name().to_string();
        record.events.push(Event::Ignored(name));
        record.tests.push(Test {
            description: description.clone(),
            state: State::Ignored,
        });
    }
}

/// Prints each test as soon as its result is known.
pub struct ConsoleListener<W: Write + Send = io::Stdout> {
    opts: cli::Opts,
    recorder: RecordingListener,
    out: Mutex<W>,
}

impl ConsoleListener {
    pub fn new(opts: cli::Opts) -> Self {
        Self::with_writer(opts, io::stdout())
    }
}

impl<W: Write + Send> ConsoleListener<W> {
    pub fn with_writer(opts: cli::Opts, out: W) -> Self {
        ConsoleListener {
            opts,
            recorder: RecordingListener::new(),
            out: Mutex::new(out),
        }
    }

    pub fn summary(&self) -> Summary {
        self.recorder.summary()
    }

    pub fn into_writer(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn print(&self, description: &Arc<Description>) {
        let test = match self.recorder.result_of(description) {
            Some(test) => test,
            None => return,
        };
        if !test.should_print(&self.opts) {
            return;
        }
        let buf = test.report_str(true) + "\n";
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        // Nothing to do when stdout is gone.
        let _ = out.write_all(buf.as_bytes()).and_then(|_| out.flush());
    }
}

impl<W: Write + Send> RunListener for ConsoleListener<W> {
    fn test_started(&self, description: &Arc<Description>) {
        self.recorder.test_started(description)
    }

    fn test_finished(&self, description: &Arc<Description>) {
        self.recorder.test_finished(description);
        self.print(description);
    }

    fn test_failure(&self, failure: &Failure) {
        self.recorder.test_failure(failure);
        // Tests print when they finish; classes never do.
        if failure.description().is_suite() {
            self.print(failure.description());
        }
    }

    fn test_assumption_failure(&self, failure: &Failure) {
        self.recorder.test_assumption_failure(failure);
        if failure.description().is_suite() {
            self.print(failure.description());
        }
    }

    fn test_ignored(&self, description: &Arc<Description>) {
        self.recorder.test_ignored(description);
        self.print(description);
    }
}
