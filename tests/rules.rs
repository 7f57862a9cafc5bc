mod common;

use common::{events, finished, runner, started, suite_xml, Trace, CLASS};
use std::{path::PathBuf, sync::Arc};
use xsuite::model::{
    rules::{ExternalResource, TemporaryFolder, TestName},
    Description, Fixture, FrameworkMethod, MethodRule, Rule, Statement,
    TestCatalog, TestClass, TestRule,
};

fn resource(trace: &Trace, name: &'static str) -> Arc<dyn Rule> {
    let (before, after) = (trace.clone(), trace.clone());
    Arc::new(ExternalResource::new(
        move || {
            before.push(&format!("{} before", name));
            Ok(())
        },
        move || after.push(&format!("{} after", name)),
    ))
}

#[test]
fn later_rules_wrap_earlier_ones() {
    let trace = Trace::default();
    let (field, method, body) = (trace.clone(), trace.clone(), trace.clone());
    let catalog = TestCatalog::new().with(
        TestClass::builder(CLASS, || Ok(()))
            .rule_field("outer", move |_| resource(&field, "field"))
            .rule_method("inner", move |_| resource(&method, "method"))
            .test("a", move |_| {
                body.push("a");
                Ok(())
            })
            .build(),
    );
    events(&runner(&suite_xml(&[]), &catalog));
    assert_eq!(
        trace.entries(),
        vec![
            "field before",
            "method before",
            "a",
            "method after",
            "field after"
        ]
    );
}

#[test]
fn test_name_is_visible_inside_the_test() {
    struct Named {
        name: TestName,
    }

    let catalog = TestCatalog::new().with(
        TestClass::builder(CLASS, || Ok(Named { name: TestName::new() }))
            .rule_field("name", |n| Arc::new(n.name.clone()) as Arc<dyn Rule>)
            .test("a", |n| {
                assert_eq!(n.name.method_name().as_deref(), Some("a"));
                Ok(())
            })
            .test("b", |n| {
                assert_eq!(n.name.method_name().as_deref(), Some("b"));
                Ok(())
            })
            .build(),
    );
    assert_eq!(
        events(&runner(&suite_xml(&[]), &catalog)),
        vec![started("a"), finished("a"), started("b"), finished("b")]
    );
}

#[test]
fn temporary_folder_is_removed_after_the_test() {
    struct WithFolder {
        folder: TemporaryFolder,
        seen: Trace,
    }

    let seen = Trace::default();
    let ctor_seen = seen.clone();
    let catalog = TestCatalog::new().with(
        TestClass::builder(CLASS, move || {
            Ok(WithFolder {
                folder: TemporaryFolder::new(),
                seen: ctor_seen.clone(),
            })
        })
        .rule_field("folder", |w| Arc::new(w.folder.clone()) as Arc<dyn Rule>)
        .test("a", |w| {
            let file = w.folder.new_file("out.txt")?;
            assert!(file.exists());
            w.seen.push(&w.folder.root()?.display().to_string());
            Ok(())
        })
        .build(),
    );
    assert_eq!(
        events(&runner(&suite_xml(&[]), &catalog)),
        vec![started("a"), finished("a")]
    );
    let root = PathBuf::from(&seen.entries()[0]);
    assert!(!root.exists());
}

#[test]
fn class_rule_wraps_the_whole_class() {
    struct Announce(Trace);

    impl TestRule for Announce {
        fn apply(
            &self,
            base: Statement,
            description: &Arc<Description>,
        ) -> Statement {
            let trace = self.0.clone();
            let label = format!(
                "{} tests in {}",
                description.test_count(),
                description.display_name()
            );
            Statement::new(move || {
                trace.push(&label);
                base.evaluate()
            })
        }
    }

    impl Rule for Announce {
        fn as_test_rule(&self) -> Option<&dyn TestRule> {
            Some(self)
        }
    }

    let trace = Trace::default();
    let (static_trace, bc) = (trace.clone(), trace.clone());
    let body = trace.clone();
    let catalog = TestCatalog::new().with(
        TestClass::builder(CLASS, || Ok(()))
            .class_rule_field("announce", Arc::new(Announce(trace.clone())))
            .class_rule_method("resource", move || {
                resource(&static_trace, "class")
            })
            .before_class("setUpClass", move || {
                bc.push("beforeClass");
                Ok(())
            })
            .test("a", move |_| {
                body.push("a");
                Ok(())
            })
            .test("b", |_| Ok(()))
            .build(),
    );
    events(&runner(&suite_xml(&["a"]), &catalog));
    assert_eq!(
        trace.entries(),
        vec![
            format!("1 tests in {}", CLASS),
            "class before".to_string(),
            "beforeClass".to_string(),
            "a".to_string(),
            "class after".to_string(),
        ]
    );
}

#[derive(Default)]
struct Both {
    as_test: Trace,
    as_method: Trace,
}

impl TestRule for Both {
    fn apply(&self, base: Statement, _: &Arc<Description>) -> Statement {
        self.as_test.push("test rule");
        base
    }
}

impl MethodRule for Both {
    fn apply(
        &self,
        base: Statement,
        method: &FrameworkMethod,
        _: &Fixture,
    ) -> Statement {
        self.as_method.push(method.name());
        base
    }
}

impl Rule for Both {
    fn as_test_rule(&self) -> Option<&dyn TestRule> {
        Some(self)
    }

    fn as_method_rule(&self) -> Option<&dyn MethodRule> {
        Some(self)
    }
}

struct OnlyMethod(Trace);

impl MethodRule for OnlyMethod {
    fn apply(
        &self,
        base: Statement,
        method: &FrameworkMethod,
        _: &Fixture,
    ) -> Statement {
        let (trace, name) = (self.0.clone(), method.name().to_string());
        Statement::new(move || {
            trace.push(&format!("around {}", name));
            base.evaluate()
        })
    }
}

impl Rule for OnlyMethod {
    fn as_method_rule(&self) -> Option<&dyn MethodRule> {
        Some(self)
    }
}

#[test]
fn rule_that_is_both_kinds_applies_once() {
    let both = Arc::new(Both::default());
    let only = Trace::default();
    let (value, only_value) = (both.clone(), only.clone());
    let catalog = TestCatalog::new().with(
        TestClass::builder(CLASS, || Ok(()))
            .rule_field("both", move |_| value.clone() as Arc<dyn Rule>)
            .rule_field("method", move |_| {
                Arc::new(OnlyMethod(only_value.clone())) as Arc<dyn Rule>
            })
            .test("a", |_| Ok(()))
            .test("b", |_| Ok(()))
            .build(),
    );
    events(&runner(&suite_xml(&[]), &catalog));
    assert_eq!(both.as_test.entries(), vec!["test rule", "test rule"]);
    assert!(both.as_method.entries().is_empty());
    assert_eq!(only.entries(), vec!["around a", "around b"]);
}

#[test]
fn rules_are_not_built_for_ignored_tests() {
    let built = Trace::default();
    let value = built.clone();
    let catalog = TestCatalog::new().with(
        TestClass::builder(CLASS, || Ok(()))
            .rule_method("name", move |_| {
                value.push("built");
                Arc::new(TestName::new()) as Arc<dyn Rule>
            })
            .ignored("a", |_| Ok(()))
            .test("b", |_| Ok(()))
            .build(),
    );
    events(&runner(&suite_xml(&[]), &catalog));
    assert_eq!(built.entries(), vec!["built"]);
}
