use std::{fs, path::Path, sync::Mutex};
use structopt::StructOpt;
use xsuite::{
    cli::Opts,
    harness,
    model::{TestCatalog, TestClass},
};

fn catalog() -> TestCatalog {
    TestCatalog::new().with(
        TestClass::builder("com.acme.Cart", || {
            Ok(Mutex::new(Vec::<u32>::new()))
        })
            .test("add", |cart| {
                cart.lock().unwrap().push(1);
                Ok(())
            })
            .test("total", |cart| {
                assert!(cart.lock().unwrap().is_empty(), "fixture was reused");
                Err(anyhow::anyhow!("total is wrong").into())
            })
            .ignored("discount", |_| Ok(()))
            .build(),
    )
}

fn opts(dir: &Path, extra: &[&str]) -> Opts {
    opts_for(dir, "cart.xml", extra)
}

fn opts_for(dir: &Path, suite: &str, extra: &[&str]) -> Opts {
    let dir = dir.to_string_lossy().into_owned();
    let mut args = vec!["xsuite", "--suites-dir", dir.as_str(), "-x", suite];
    args.extend_from_slice(extra);
    Opts::from_iter(args)
}

fn suite_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("cart.xml"),
        r#"<suite name="Cart"><test name="cart"><classes>
            <class name="com.acme.Cart"/>
        </classes></test></suite>"#,
    )
    .unwrap();
    dir
}

#[test]
fn exit_code_counts_failures() {
    let dir = suite_dir();
    let code = harness::run("cart", &catalog(), &opts(dir.path(), &[]));
    assert_eq!(code.unwrap(), 1);
}

#[test]
fn parallel_run_reports_the_same() {
    let dir = suite_dir();
    let code =
        harness::run("cart", &catalog(), &opts(dir.path(), &["--jobs", "3"]));
    assert_eq!(code.unwrap(), 1);
}

#[test]
fn dry_run_runs_nothing() {
    let dir = suite_dir();
    let code = harness::run("cart", &catalog(), &opts(dir.path(), &["-n"]));
    assert_eq!(code.unwrap(), 0);
}

#[test]
fn invalid_suite_is_an_error() {
    let dir = suite_dir();
    let opts = opts_for(dir.path(), "missing.xml", &[]);
    let err = harness::run("cart", &catalog(), &opts).unwrap_err();
    assert!(format!("{:#}", err).contains("Unable to read xml file"));
}
