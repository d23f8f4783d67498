//! Tests for `nbm fetch` against a local server

mod common;

use common::{nbm, write_config, write_store};
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::any};

async fn run_fetch(args: Vec<std::ffi::OsString>) -> std::process::Output {
    tokio::task::spawn_blocking(move || nbm().args(args).output().unwrap())
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_sends_cached_credential_to_allowed_host() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("session.json");
    let config = dir.path().join("config.json");
    write_store(&store, "sid=xyz");
    write_config(&config, &["127.0.0.1"]);

    let output = run_fetch(vec![
        "--store".into(),
        store.into(),
        "--config".into(),
        config.into(),
        "fetch".into(),
        format!("{}/x", server.uri()).into(),
    ])
    .await;

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("204 No Content"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let header = |name: &str| requests[0].headers.get(name).map(|v| v.to_str().unwrap());
    assert_eq!(header("cookie"), Some("sid=xyz"));
    assert_eq!(header("referer"), Some("https://example.com/"));
    assert_eq!(header("user-agent"), Some("nbm-test-agent"));
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_to_other_host_is_unmodified() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("session.json");
    let config = dir.path().join("config.json");
    write_store(&store, "sid=xyz");
    write_config(&config, &["example.com"]);

    let output = run_fetch(vec![
        "--store".into(),
        store.into(),
        "--config".into(),
        config.into(),
        "fetch".into(),
        format!("{}/x", server.uri()).into(),
    ])
    .await;

    assert!(output.status.success());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("cookie").is_none());
    assert!(requests[0].headers.get("referer").is_none());
}
