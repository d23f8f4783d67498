//! Tests for the nbm version flags

mod common;

fn assert_version_output(args: &[&str]) {
    let output = common::nbm()
        .args(args)
        .output()
        .expect("Failed to execute nbm command");

    assert!(output.status.success(), "Command should exit successfully");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(
        stdout.contains("NB Music session"),
        "Output should contain 'NB Music session': {}",
        stdout
    );
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "Output should contain version '{}': {}",
        env!("CARGO_PKG_VERSION"),
        stdout
    );
}

#[test]
fn test_version_flag() {
    assert_version_output(&["--version"]);
}

#[test]
fn test_version_flag_short() {
    assert_version_output(&["-v"]);
}

#[test]
fn test_no_args_shows_help() {
    let output = common::nbm()
        .output()
        .expect("Failed to execute nbm command");

    assert!(output.status.success(), "Command should exit successfully");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for section in ["Usage:", "Commands:", "Options:"] {
        assert!(
            stdout.contains(section),
            "Output should contain '{section}': {stdout}"
        );
    }
}
