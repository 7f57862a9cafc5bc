//! Markers attached to test methods and rule members.
use crate::errors::TestError;
use std::fmt;

/// Identifies the kind of an [Annotation] without its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Test,
    Before,
    After,
    BeforeClass,
    AfterClass,
    Ignore,
    Rule,
    ClassRule,
}

/// A lifecycle marker. Methods and rule members carry a list of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// Marks a test method.
    Test(TestAnnotation),
    /// Run before every test of the class.
    Before,
    /// Run after every test of the class, even when it failed.
    After,
    /// Run once before the tests of the class.
    BeforeClass,
    /// Run once after the tests of the class.
    AfterClass,
    /// Skip the test. Holds an optional reason.
    Ignore(Option<String>),
    /// Instance member providing a method-level rule.
    Rule,
    /// Static member providing a class-level rule.
    ClassRule,
}

impl Annotation {
    pub fn kind(&self) -> Kind {
        match self {
            Annotation::Test(_) => Kind::Test,
            Annotation::Before => Kind::Before,
            Annotation::After => Kind::After,
            Annotation::BeforeClass => Kind::BeforeClass,
            Annotation::AfterClass => Kind::AfterClass,
            Annotation::Ignore(_) => Kind::Ignore,
            Annotation::Rule => Kind::Rule,
            Annotation::ClassRule => Kind::ClassRule,
        }
    }

    /// A plain test marker without expectation or timeout.
    pub fn test() -> Self {
        Annotation::Test(TestAnnotation::default())
    }

    pub fn ignore() -> Self {
        Annotation::Ignore(None)
    }
}

/// Arguments of the test marker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestAnnotation {
    /// Error the test must raise to pass. `None` means no expectation.
    pub expected: Option<Expected>,
    /// Time limit in milliseconds. `0` disables the limit.
    pub timeout: u64,
}

impl TestAnnotation {
    pub fn expected(mut self, expected: Expected) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn timeout(mut self, millis: u64) -> Self {
        self.timeout = millis;
        self
    }
}

impl From<TestAnnotation> for Annotation {
    fn from(test: TestAnnotation) -> Self {
        Annotation::Test(test)
    }
}

/// An expected error type for a test.
#[derive(Clone, Copy)]
pub struct Expected {
    name: &'static str,
    matcher: fn(&TestError) -> bool,
}

impl Expected {
    /// Expect a user error that downcasts to `E`.
    pub fn error<E>() -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        fn matches<E>(err: &TestError) -> bool
        where
            E: std::error::Error + Send + Sync + 'static,
        {
            match err {
                TestError::Error(inner) => inner.is::<E>(),
                _ => false,
            }
        }
        Expected {
            name: std::any::type_name::<E>(),
            matcher: matches::<E>,
        }
    }

    /// Expect the test body to panic.
    pub fn panic() -> Self {
        Expected {
            name: "panic",
            matcher: |err| matches!(err, TestError::Panic(_)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, err: &TestError) -> bool {
        (self.matcher)(err)
    }
}

impl fmt::Debug for Expected {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Expected({})", self.name)
    }
}

impl PartialEq for Expected {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
