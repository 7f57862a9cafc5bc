#![allow(dead_code)]

use std::{
    fs,
    sync::{Arc, Mutex},
};
use xsuite::{
    config::Config,
    executor::{results::Event, RecordingListener, SelectiveRunner},
    model::{RunNotifier, TestCatalog},
    picker::{SuiteLoader, TestPlan},
    SuiteError,
};

pub const CLASS: &str = "com.acme.C";

/// Shared record of which lifecycle methods ran.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: &str) {
        self.0.lock().unwrap().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// A suite selecting `includes` of [CLASS]; no includes selects every test.
pub fn suite_xml(includes: &[&str]) -> String {
    let methods: String = includes
        .iter()
        .map(|m| format!(r#"<include name="{}"/>"#, m))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<suite name="scenario">
  <test name="only">
    <classes>
      <class name="{}"><methods>{}</methods></class>
    </classes>
  </test>
</suite>"#,
        CLASS, methods
    )
}

pub fn load(xml: &str, catalog: &TestCatalog) -> Result<TestPlan, SuiteError> {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("suite.xml"), xml).unwrap();
    let config = Config::default()
        .with_suites_dir(dir.path())
        .with_tests_xml("suite.xml");
    SuiteLoader::new(config, catalog).load()
}

pub fn runner(xml: &str, catalog: &TestCatalog) -> SelectiveRunner {
    let plan = load(xml, catalog).unwrap();
    SelectiveRunner::with_plan("scenario", Arc::new(plan))
}

/// Run `runner` and return the recorded events.
pub fn events(runner: &SelectiveRunner) -> Vec<Event> {
    let notifier = Arc::new(RunNotifier::new());
    let recorder = Arc::new(RecordingListener::new());
    notifier.add_listener(recorder.clone());
    runner.run(&notifier).unwrap();
    recorder.events()
}

pub fn started(method: &str) -> Event {
    Event::Started(format!("{}({})", method, CLASS))
}

pub fn finished(method: &str) -> Event {
    Event::Finished(format!("{}({})", method, CLASS))
}

pub fn ignored(method: &str) -> Event {
    Event::Ignored(format!("{}({})", method, CLASS))
}
