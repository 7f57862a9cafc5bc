use std::{env, sync::Arc};
use xsuite::{
    config::TESTS_XML_VAR,
    executor::{RecordingListener, SelectiveRunner},
    model::{RunNotifier, TestCatalog, TestClass},
    picker,
};

fn catalog() -> TestCatalog {
    TestCatalog::new().with(
        TestClass::builder("com.acme.Smoke", || Ok(()))
            .test("reachable", |_| Ok(()))
            .test("slow", |_| Ok(()))
            .build(),
    )
}

// Only one test lives in this binary: the plan is loaded once per process.
#[test]
fn plan_is_loaded_once_from_the_environment() {
    env::set_var(TESTS_XML_VAR, "singleton.xml");

    let first = picker::get_tests(&catalog()).unwrap();
    let second = picker::get_tests(&TestCatalog::new()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.get("com.acme.Smoke").unwrap(), &["reachable"]);

    let runner = SelectiveRunner::new("singleton", &catalog()).unwrap();
    assert!(Arc::ptr_eq(runner.plan(), &first));

    let notifier = Arc::new(RunNotifier::new());
    let recorder = Arc::new(RecordingListener::new());
    notifier.add_listener(recorder.clone());
    runner.run(&notifier).unwrap();
    assert_eq!(recorder.summary().passing, 1);
}
