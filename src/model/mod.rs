//! The test framework model the runner drives: registered test classes and
//! their annotated methods, statements, rules, descriptions and the notifier.
//!
//! Test classes are registered explicitly through [ClassBuilder] and collected
//! in a [TestCatalog], which suite files are resolved against.

pub mod annotations;
mod catalog;
mod class;
mod description;
mod notifier;
pub mod rules;
pub mod statement;

pub use annotations::{Annotation, Expected, Kind, TestAnnotation};
pub use catalog::TestCatalog;
pub use class::{ClassBuilder, Fixture, FrameworkMethod, MemberKind, TestClass};
pub use description::Description;
pub use notifier::{EachTestNotifier, Failure, RunListener, RunNotifier};
pub use rules::{MethodRule, Rule, TestRule};
pub use statement::Statement;
