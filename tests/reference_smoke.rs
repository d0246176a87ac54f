use std::process::Command;
use std::time::Duration;

use pyport::engine::{InterpreterConfig, ReferenceSandbox};

fn interpreter_available() -> bool {
    Command::new("python3").arg("--version").output().is_ok()
}

#[test]
fn baseline_output_of_a_small_program() {
    if !interpreter_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let source = r#"
def lcg(seed, a=1664525, c=1013904223, m=2**32):
    value = seed
    while True:
        value = (a * value + c) % m
        yield value

gen = lcg(42)
total = sum(next(gen) % 21 - 10 for _ in range(100))
print(total)
"#;
    let sandbox = ReferenceSandbox::default_sandbox();
    let outcome = sandbox.run(source);
    assert!(outcome.error.is_none(), "unexpected error: {:?}", outcome.error);
    let value: i64 = outcome.stdout.trim().parse().expect("baseline prints one integer");
    assert!((-1000..=1000).contains(&value));
}

#[test]
fn raising_source_yields_error_not_panic() {
    if !interpreter_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let sandbox = ReferenceSandbox::default_sandbox();
    let outcome = sandbox.run("import sys\nprint('partial')\nsys.exit('gave up')");
    assert_eq!(outcome.stdout.trim(), "partial");
    let error = outcome.error.expect("non-zero exit must surface as an error string");
    assert!(error.contains("gave up"));
}

#[test]
fn hanging_source_is_killed_at_the_deadline() {
    if !interpreter_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let sandbox = ReferenceSandbox::new(
        InterpreterConfig::default().with_timeout(Duration::from_secs(1)),
    );
    let outcome = sandbox.run("while True:\n    pass");
    let error = outcome.error.expect("timeout must surface as an error string");
    assert!(error.contains("timed out"), "error was: {error}");
}
