// Integration tests for `grantcheck check` and `grantcheck config`.
// Run with: cargo test -p grantcheck-cli --test check_command

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use httpmock::prelude::*;

const SEARCH_HTML: &str = include_str!("../../recon/tests/fixtures/search.html");
const DETAIL_HTML: &str = include_str!("../../recon/tests/fixtures/detail.html");
const LOGIN_HTML: &str = include_str!("../../recon/tests/fixtures/login.html");
const REGISTRY_SEARCH: &str = include_str!("../../recon/tests/fixtures/registry_search.json");
const FUNDING: &str = include_str!("../../recon/tests/fixtures/funding.json");
const PROJECT: &str = include_str!("../../recon/tests/fixtures/project.json");

fn grantcheck() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_grantcheck"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    // Keep a real session out of the tests
    cmd.env_remove("COOKIE");
    cmd.env_remove("GRANT_ID");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "expected exit {code}, got {:?}\nstderr: {}",
        output.status.code(),
        stderr(output),
    );
}

/// Config pointing both sources at one mock server, no retries.
fn write_config(dir: &Path, server: &MockServer) -> PathBuf {
    let path = dir.join("config.toml");
    let body = format!(
        "[institutional]\nbase_url = \"{base}\"\n\n\
         [registry]\napi_base = \"{base}\"\nservices_base = \"{base}/services\"\n\n\
         [http]\nmax_retries = 0\n",
        base = server.base_url(),
    );
    std::fs::write(&path, body).unwrap();
    path
}

fn mock_institution(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST).path("/grants_list.php");
        then.status(200).body(SEARCH_HTML);
    });
    server.mock(|when, then| {
        when.method(POST).path("/grants_maint.php").query_param("serial", "5127");
        then.status(200).body(DETAIL_HTML);
    });
}

fn mock_registry(server: &MockServer, search: &str) {
    server.mock(|when, then| {
        when.method(POST).path("/v1/projects/Search");
        then.status(200).header("content-type", "application/json").body(search);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/services/Projects/ProjectFundingDetail")
            .query_param("projectId", "10834567");
        then.status(200).header("content-type", "application/json").body(FUNDING);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/services/Projects/ProjectDetail")
            .query_param("projectId", "10834567");
        then.status(200).header("content-type", "application/json").body(PROJECT);
    });
}

#[test]
fn missing_grant_id_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let output = grantcheck()
        .args(["check", "--cookie", "PHPSESSID=abc", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run grantcheck");

    assert_exit(&output, 2);
    assert!(stderr(&output).contains("no grant ID found"), "stderr: {}", stderr(&output));
}

#[test]
fn missing_cookie_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let output = grantcheck()
        .args(["check", "HD012345", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run grantcheck");

    assert_exit(&output, 2);
    assert!(stderr(&output).contains("no session cookie found"));
}

#[test]
fn unknown_field_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let output = grantcheck()
        .args(["check", "HD012345", "--cookie", "c=1", "--fields", "projectStartnDate", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run grantcheck");

    assert_exit(&output, 2);
    assert!(stderr(&output).contains("projectStartnDate"));
}

#[test]
fn broken_config_exits_65() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[http]\ntimeout_secs = 0\n").unwrap();

    let output = grantcheck()
        .args(["check", "HD012345", "--cookie", "c=1", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run grantcheck");

    assert_exit(&output, 65);
}

#[test]
fn config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nested").join("config.toml");

    let output = grantcheck()
        .args(["config", "init", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run grantcheck");
    assert_exit(&output, 0);
    assert!(config.exists());

    let output = grantcheck()
        .args(["config", "init", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run grantcheck");
    assert_exit(&output, 65);
    assert!(stderr(&output).contains("--force"));

    let output = grantcheck()
        .args(["config", "show", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run grantcheck");
    assert_exit(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("page_size = 99"), "stdout: {stdout}");
}

#[test]
fn config_path_prints_override() {
    let output = grantcheck()
        .args(["config", "path", "--config", "/tmp/grantcheck-test.toml"])
        .output()
        .expect("failed to run grantcheck");
    assert_exit(&output, 0);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "/tmp/grantcheck-test.toml");
}

#[test]
fn check_reports_differences() {
    let server = MockServer::start();
    mock_institution(&server);
    mock_registry(&server, REGISTRY_SEARCH);
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server);

    let output = grantcheck()
        .args(["check", "--quiet", "--config"])
        .arg(&config)
        .env("GRANT_ID", "HD012345")
        .env("COOKIE", "PHPSESSID=abc")
        .output()
        .expect("failed to run grantcheck");

    assert_exit(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("NIH Grant ID: 5R01HD012345-03"), "stdout: {stdout}");
    assert!(stdout.ends_with("1 changes found:\n\n\ncurrentEndDate: 6/30/2024\n"), "stdout: {stdout}");
    assert!(stderr(&output).is_empty(), "stderr: {}", stderr(&output));
}

#[test]
fn fail_on_diff_exits_1() {
    let server = MockServer::start();
    mock_institution(&server);
    mock_registry(&server, REGISTRY_SEARCH);
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server);

    let output = grantcheck()
        .args(["check", "HD012345", "--cookie", "PHPSESSID=abc", "--fail-on-diff", "--quiet", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run grantcheck");

    assert_exit(&output, 1);
    // Exit 1 carries no error line
    assert!(!stderr(&output).contains("error:"));
}

#[test]
fn json_output_with_field_selection() {
    let server = MockServer::start();
    mock_institution(&server);
    mock_registry(&server, REGISTRY_SEARCH);
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server);

    let output = grantcheck()
        .args([
            "check", "HD012345", "--cookie", "PHPSESSID=abc", "--json", "--quiet",
            "--fields", "totalCost,names", "--config",
        ])
        .arg(&config)
        .output()
        .expect("failed to run grantcheck");

    assert_exit(&output, 0);
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["grant_id"], "5R01HD012345-03");
    assert_eq!(report["fields"], serde_json::json!(["totalCost", "names"]));
    assert_eq!(report["diffs"], serde_json::json!([]));
}

#[test]
fn login_page_exits_60() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/grants_list.php");
        then.status(200).body(LOGIN_HTML);
    });
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server);

    let output = grantcheck()
        .args(["check", "HD012345", "--cookie", "PHPSESSID=stale", "--quiet", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run grantcheck");

    assert_exit(&output, 60);
    assert!(stderr(&output).contains("hint:"));
}

#[test]
fn registry_miss_exits_62() {
    let server = MockServer::start();
    mock_institution(&server);
    server.mock(|when, then| {
        when.method(POST).path("/v1/projects/Search");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"meta":{"total":0},"results":[]}"#);
    });
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server);

    let output = grantcheck()
        .args(["check", "HD012345", "--cookie", "PHPSESSID=abc", "--quiet", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run grantcheck");

    assert_exit(&output, 62);
    assert!(stderr(&output).contains("not found on registry"));
    assert!(output.stdout.is_empty());
}
