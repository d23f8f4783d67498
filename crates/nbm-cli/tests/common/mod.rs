#![allow(dead_code)]

use std::{path::Path, process::Command};

/// Create a new nbm CLI command with logging silenced
pub fn nbm() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_nbm"));
    cmd.env("RUST_LOG", "off").env_remove("NBM_CONFIG").env_remove("NBM_STORE");
    cmd
}

/// Write a credential store document holding `credential`
pub fn write_store(path: &Path, credential: &str) {
    std::fs::write(path, serde_json::json!({ "cookies": credential }).to_string()).unwrap();
}

/// Write a session configuration that can never launch a real browser
pub fn write_config(path: &Path, allowed_domains: &[&str]) {
    let config = serde_json::json!({
        "rootUrl": "https://example.com/",
        "allowedDomains": allowed_domains,
        "userAgent": "nbm-test-agent",
        "navigationTimeoutSecs": 1,
        "browserPath": path.with_file_name("no-such-browser"),
    });
    std::fs::write(path, config.to_string()).unwrap();
}
