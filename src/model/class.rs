//! Registered view of a test class: its constructor, its annotated methods and
//! the members providing rules.
use super::{
    annotations::{Annotation, Kind, TestAnnotation},
    rules::Rule,
    statement::guarded,
};
use crate::errors::{TestError, TestResult};
use anyhow::anyhow;
use std::{
    any::{type_name, Any},
    fmt,
    marker::PhantomData,
    sync::Arc,
};

/// A type-erased test class instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

type InstanceFn = dyn Fn(&(dyn Any + Send + Sync)) -> TestResult + Send + Sync;
type StaticFn = dyn Fn() -> TestResult + Send + Sync;
type Constructor = dyn Fn() -> Result<Instance, TestError> + Send + Sync;
type InstanceRuleFn =
    dyn Fn(&(dyn Any + Send + Sync)) -> Option<Arc<dyn Rule>> + Send + Sync;
type StaticRuleFn = dyn Fn() -> Arc<dyn Rule> + Send + Sync;

/// A fresh instance of a test class, shared by the statements built for one
/// test method.
///
/// Methods only get shared access to the instance. A test body abandoned
/// after its timeout may still be running while the `After` methods use the
/// same instance, so mutable state lives behind atomics or locks of the
/// class's own choosing.
#[derive(Clone)]
pub struct Fixture(Instance);

impl Fixture {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Fixture(Arc::new(value))
    }

    fn from_instance(instance: Instance) -> Self {
        Fixture(instance)
    }

    pub fn instance(&self) -> &(dyn Any + Send + Sync) {
        &*self.0
    }

    /// The instance if it is a `T`.
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Fixture")
    }
}

#[derive(Clone)]
enum Invoker {
    Instance(Arc<InstanceFn>),
    Static(Arc<StaticFn>),
}

/// A method of a test class together with its annotations.
#[derive(Clone)]
pub struct FrameworkMethod {
    name: Arc<str>,
    annotations: Arc<[Annotation]>,
    invoker: Invoker,
}

impl FrameworkMethod {
    /// A method invoked on a fixture of type `T`.
    pub fn new_instance<T, F>(
        name: &str,
        annotations: Vec<Annotation>,
        body: F,
    ) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> TestResult + Send + Sync + 'static,
    {
        let invoker = move |instance: &(dyn Any + Send + Sync)| {
            match instance.downcast_ref::<T>() {
                Some(target) => body(target),
                None => Err(anyhow!(
                    "test instance is not a {}",
                    type_name::<T>()
                )
                .into()),
            }
        };
        FrameworkMethod {
            name: name.into(),
            annotations: annotations.into(),
            invoker: Invoker::Instance(Arc::new(invoker)),
        }
    }

    /// A method invoked without a fixture.
    pub fn new_static<F>(
        name: &str,
        annotations: Vec<Annotation>,
        body: F,
    ) -> Self
    where
        F: Fn() -> TestResult + Send + Sync + 'static,
    {
        FrameworkMethod {
            name: name.into(),
            annotations: annotations.into(),
            invoker: Invoker::Static(Arc::new(body)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn get_annotation(&self, kind: Kind) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.kind() == kind)
    }

    /// Arguments of the test marker, if this is a test method.
    pub fn test_annotation(&self) -> Option<&TestAnnotation> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::Test(test) => Some(test),
            _ => None,
        })
    }

    pub fn is_ignored(&self) -> bool {
        self.get_annotation(Kind::Ignore).is_some()
    }

    pub fn is_static(&self) -> bool {
        matches!(self.invoker, Invoker::Static(_))
    }

    /// Invoke the method. Instance methods need a `target`.
    /// Panics raised by the method are returned as errors.
    pub fn invoke_explosively(&self, target: Option<&Fixture>) -> TestResult {
        match (&self.invoker, target) {
            (Invoker::Static(body), _) => guarded(|| body()),
            (Invoker::Instance(body), Some(fixture)) => {
                guarded(|| body(fixture.instance()))
            }
            (Invoker::Instance(_), None) => Err(anyhow!(
                "method {} needs a test instance",
                self.name
            )
            .into()),
        }
    }
}

impl fmt::Debug for FrameworkMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FrameworkMethod")
            .field("name", &self.name)
            .field("annotations", &self.annotations)
            .finish()
    }
}

/// Whether a rule member reads a value or calls a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
}

#[derive(Clone)]
enum RuleSource {
    Instance(Arc<InstanceRuleFn>),
    Static(Arc<StaticRuleFn>),
}

#[derive(Clone)]
struct RuleMember {
    name: String,
    kind: MemberKind,
    annotation: Kind,
    source: RuleSource,
}

/// The registered model of a test class.
pub struct TestClass {
    name: String,
    annotations: Vec<Annotation>,
    constructor: Arc<Constructor>,
    methods: Vec<FrameworkMethod>,
    rules: Vec<RuleMember>,
}

impl TestClass {
    /// Start registering a class named `name` whose sole constructor is `ctor`.
    pub fn builder<T, C>(name: &str, ctor: C) -> ClassBuilder<T>
    where
        T: Any + Send + Sync,
        C: Fn() -> Result<T, TestError> + Send + Sync + 'static,
    {
        let constructor =
            move || ctor().map(|value| Arc::new(value) as Instance);
        ClassBuilder {
            class: TestClass {
                name: name.to_string(),
                annotations: Vec::new(),
                constructor: Arc::new(constructor),
                methods: Vec::new(),
                rules: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Fully qualified name of the class.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// All methods in declaration order.
    pub fn methods(&self) -> &[FrameworkMethod] {
        &self.methods
    }

    /// Methods carrying an annotation of `kind`, in declaration order.
    pub fn annotated_methods(&self, kind: Kind) -> Vec<FrameworkMethod> {
        self.methods
            .iter()
            .filter(|m| m.get_annotation(kind).is_some())
            .cloned()
            .collect()
    }

    /// Names of the test methods, in declaration order.
    pub fn test_method_names(&self) -> Vec<String> {
        self.methods
            .iter()
            .filter(|m| m.test_annotation().is_some())
            .map(|m| m.name().to_string())
            .collect()
    }

    /// Build a fresh instance through the class's sole constructor.
    pub fn create_fixture(&self) -> Result<Fixture, TestError> {
        let mut created = None;
        guarded(|| {
            created = Some((self.constructor)()?);
            Ok(())
        })?;
        created.map(Fixture::from_instance).ok_or_else(|| {
            anyhow!("constructor of {} produced no instance", self.name).into()
        })
    }

    /// Rules provided by methods annotated with `kind`. Instance members are
    /// only read when a `target` is given.
    pub fn annotated_method_values(
        &self,
        target: Option<&Fixture>,
        kind: Kind,
    ) -> Vec<Arc<dyn Rule>> {
        self.rule_values(target, kind, MemberKind::Method)
    }

    /// Rules provided by fields annotated with `kind`.
    pub fn annotated_field_values(
        &self,
        target: Option<&Fixture>,
        kind: Kind,
    ) -> Vec<Arc<dyn Rule>> {
        self.rule_values(target, kind, MemberKind::Field)
    }

    fn rule_values(
        &self,
        target: Option<&Fixture>,
        kind: Kind,
        member: MemberKind,
    ) -> Vec<Arc<dyn Rule>> {
        self.rules
            .iter()
            .filter(|r| r.annotation == kind && r.kind == member)
            .filter_map(|r| match (&r.source, target) {
                (RuleSource::Static(value), _) => Some(value()),
                (RuleSource::Instance(value), Some(fixture)) => {
                    value(fixture.instance())
                }
                (RuleSource::Instance(_), None) => None,
            })
            .collect()
    }

    /// Names of the rule members annotated with `kind`.
    pub fn rule_member_names(&self, kind: Kind) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| r.annotation == kind)
            .map(|r| r.name.as_str())
            .collect()
    }
}

impl fmt::Debug for TestClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TestClass")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Registers the members of a test class with fixture type `T`.
pub struct ClassBuilder<T> {
    class: TestClass,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    /// Attach an annotation to the class itself.
    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.class.annotations.push(annotation);
        self
    }

    /// Register an instance method with arbitrary annotations.
    pub fn method<F>(
        mut self,
        name: &str,
        annotations: Vec<Annotation>,
        body: F,
    ) -> Self
    where
        F: Fn(&T) -> TestResult + Send + Sync + 'static,
    {
        self.class
            .methods
            .push(FrameworkMethod::new_instance(name, annotations, body));
        self
    }

    /// Register a plain test.
    pub fn test<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&T) -> TestResult + Send + Sync + 'static,
    {
        self.method(name, vec![Annotation::test()], body)
    }

    /// Register a test with an expected error or a timeout.
    pub fn test_with<F>(
        self,
        name: &str,
        test: TestAnnotation,
        body: F,
    ) -> Self
    where
        F: Fn(&T) -> TestResult + Send + Sync + 'static,
    {
        self.method(name, vec![Annotation::Test(test)], body)
    }

    /// Register a test that is skipped.
    pub fn ignored<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&T) -> TestResult + Send + Sync + 'static,
    {
        self.method(name, vec![Annotation::test(), Annotation::ignore()], body)
    }

    pub fn before<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&T) -> TestResult + Send + Sync + 'static,
    {
        self.method(name, vec![Annotation::Before], body)
    }

    pub fn after<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(&T) -> TestResult + Send + Sync + 'static,
    {
        self.method(name, vec![Annotation::After], body)
    }

    pub fn before_class<F>(mut self, name: &str, body: F) -> Self
    where
        F: Fn() -> TestResult + Send + Sync + 'static,
    {
        self.class.methods.push(FrameworkMethod::new_static(
            name,
            vec![Annotation::BeforeClass],
            body,
        ));
        self
    }

    pub fn after_class<F>(mut self, name: &str, body: F) -> Self
    where
        F: Fn() -> TestResult + Send + Sync + 'static,
    {
        self.class.methods.push(FrameworkMethod::new_static(
            name,
            vec![Annotation::AfterClass],
            body,
        ));
        self
    }

    /// Register an instance field holding a rule.
    pub fn rule_field<F>(self, name: &str, value: F) -> Self
    where
        F: Fn(&T) -> Arc<dyn Rule> + Send + Sync + 'static,
    {
        self.instance_rule(name, MemberKind::Field, value)
    }

    /// Register an instance method returning a rule.
    pub fn rule_method<F>(self, name: &str, value: F) -> Self
    where
        F: Fn(&T) -> Arc<dyn Rule> + Send + Sync + 'static,
    {
        self.instance_rule(name, MemberKind::Method, value)
    }

    /// Register a static field holding a class rule. The same rule value is
    /// used on every run.
    pub fn class_rule_field(
        mut self,
        name: &str,
        rule: Arc<dyn Rule>,
    ) -> Self {
        self.class.rules.push(RuleMember {
            name: name.to_string(),
            kind: MemberKind::Field,
            annotation: Kind::ClassRule,
            source: RuleSource::Static(Arc::new(move || rule.clone())),
        });
        self
    }

    /// Register a static method returning a class rule.
    pub fn class_rule_method<F>(mut self, name: &str, value: F) -> Self
    where
        F: Fn() -> Arc<dyn Rule> + Send + Sync + 'static,
    {
        self.class.rules.push(RuleMember {
            name: name.to_string(),
            kind: MemberKind::Method,
            annotation: Kind::ClassRule,
            source: RuleSource::Static(Arc::new(value)),
        });
        self
    }

    fn instance_rule<F>(
        mut self,
        name: &str,
        kind: MemberKind,
        value: F,
    ) -> Self
    where
        F: Fn(&T) -> Arc<dyn Rule> + Send + Sync + 'static,
    {
        let source = move |instance: &(dyn Any + Send + Sync)| {
            instance.downcast_ref::<T>().map(|t| value(t))
        };
        self.class.rules.push(RuleMember {
            name: name.to_string(),
            kind,
            annotation: Kind::Rule,
            source: RuleSource::Instance(Arc::new(source)),
        });
        self
    }

    pub fn build(self) -> TestClass {
        self.class
    }
}
