//! xsuite runs the test classes and methods selected by an XML suite file.
//!
//! Test classes are registered with the runner explicitly. A suite file then
//! picks which classes, and which tests of each class, are run. Selected tests
//! go through a JUnit style lifecycle: a fresh fixture per test, `Before` and
//! `After` methods around it, `BeforeClass` and `AfterClass` methods around
//! the class, and rules wrapping either.
//!
//! ## Installation
//!
//! Add xsuite as a dev-dependency and declare a test target that provides its
//! own `main`:
//! ```toml
//! [dev-dependencies]
//! xsuite = "0.1"
//!
//! [[test]]
//! name = "acceptance"
//! harness = false
//! ```
//!
//! ## Registering Tests
//! A test class is built from its constructor and its annotated members.
//! The class name is what suite files refer to. Members get a shared
//! reference to the instance, so mutable state goes behind atomics or locks.
//! ```no_run
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use xsuite::model::{TestCatalog, TestClass};
//!
//! #[derive(Default)]
//! struct Login {
//!     attempts: AtomicU32,
//! }
//!
//! fn main() {
//!     let catalog = TestCatalog::new().with(
//!         TestClass::builder("com.acme.Login", || Ok(Login::default()))
//!             .before("reset", |login| {
//!                 login.attempts.store(0, Ordering::SeqCst);
//!                 Ok(())
//!             })
//!             .test("valid", |login| {
//!                 login.attempts.fetch_add(1, Ordering::SeqCst);
//!                 Ok(())
//!             })
//!             .ignored("locked", |_| Ok(()))
//!             .build(),
//!     );
//!     xsuite::harness::main("acceptance", catalog)
//! }
//! ```
//!
//! ## Suite Files
//! Suite files live in `./src/test/resources/suites/`. The runner only looks
//! at the `class` elements under `suite/test/classes`, for `suite` elements
//! at any depth, and at their `include` elements; everything else is ignored.
//! ```xml
//! <suite name="Smoke">
//!   <test name="login">
//!     <classes>
//!       <!-- Run only the listed tests, in class order. -->
//!       <class name="com.acme.Login">
//!         <methods>
//!           <include name="valid"/>
//!         </methods>
//!       </class>
//!       <!-- No includes: run every test of the class. -->
//!       <class name="com.acme.Cart"/>
//!     </classes>
//!   </test>
//! </suite>
//! ```
//!
//! A suite that names an unknown class or a method that is not a test of its
//! class is rejected before anything runs.
//!
//! ## Running a Suite
//! The suite file is picked with the `testsXml` environment variable or the
//! `--tests-xml` flag:
//! ```bash
//! testsXml=smoke.xml cargo test --test acceptance
//! ```
//! xsuite prints the failing, ignored and skipped tests followed by a summary:
//! ```text
//! ✗ valid(com.acme.Login)
//!     Expected exception: std::io::Error
//! ~ locked(com.acme.Login) (ignored)
//!   1 passing / 1 failing / 1 ignored
//! ```
//! The process exits with the number of failing tests.
//!
//! ## Filters
//!
//! The `--only` flag prints the tests with a specific outcome (`fail`,
//! `pass` or `ignored`); `--verbose` prints every test. Like with any
//! post-filter, all selected tests still run.
//! `--dry-run` prints the validated selection without running it.
//!
//! ## Parallelism and Timeouts
//!
//! The tests of a class run one after the other unless `--jobs N` asks for
//! up to N of them at once. Classes always run in suite order.
//!
//! A test declared with a timeout fails once the limit elapses. Its `After`
//! methods run once the test body returns.
pub mod cli;
pub mod config;
pub mod errors;
pub mod executor;
pub mod harness;
pub mod model;
pub mod picker;

pub use errors::{assume, SuiteError, TestError, TestResult};
