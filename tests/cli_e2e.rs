//! End-to-end CLI tests for the creiq binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a CSV and an env file into `dir` and returns their paths.
fn write_inputs(dir: &Path, csv: &str, env: &str) -> (PathBuf, PathBuf) {
    let csv_path = dir.join("roll-number.csv");
    let env_path = dir.join(".env");
    fs::write(&csv_path, csv).unwrap();
    fs::write(&env_path, env).unwrap();
    (csv_path, env_path)
}

/// A command isolated from any `URL` or `CREIQ_*` values in the test environment.
fn creiq() -> Command {
    let mut cmd = Command::cargo_bin("creiq").unwrap();
    for key in [
        "URL",
        "RUST_LOG",
        "CREIQ_TIMEOUT_SECS",
        "CREIQ_MAX_RETRIES",
        "CREIQ_RETRY_DELAY_MS",
        "CREIQ_CONCURRENCY",
        "CREIQ_RATE_LIMIT_MS",
        "CREIQ_USER_AGENT",
        "CREIQ_CSV_HEADER",
        "CREIQ_ID_COLUMN",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    creiq()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--fetch"))
        .stdout(predicate::str::contains("--csv"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    creiq()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("creiq"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    creiq()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_print_lists_generated_urls() {
    let dir = TempDir::new().unwrap();
    let (csv, env) = write_inputs(
        dir.path(),
        "roll_number,owner\n100,Ann\n200,Bob\n100,Ann\n",
        "URL=https://example.com/\n",
    );

    creiq()
        .arg("--csv")
        .arg(&csv)
        .arg("--env")
        .arg(&env)
        .arg("--print")
        .assert()
        .success()
        .stdout(predicate::str::contains("Base URL: https://example.com/"))
        .stdout(predicate::str::contains("Generated 2 URLs:"))
        .stdout(predicate::str::contains("https://example.com/100\nhttps://example.com/200\n"));
}

#[test]
fn test_print_uses_placeholder_and_custom_column() {
    let dir = TempDir::new().unwrap();
    let (csv, env) = write_inputs(
        dir.path(),
        "Parcel\n42\n",
        "URL=https://example.com/appeal/{id}/detail\n",
    );

    creiq()
        .arg("--csv")
        .arg(&csv)
        .arg("--env")
        .arg(&env)
        .args(["--column", "parcel", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.com/appeal/42/detail"));
}

#[test]
fn test_missing_base_url_fails_before_fetching() {
    let dir = TempDir::new().unwrap();
    let (csv, env) = write_inputs(dir.path(), "roll_number\n100\n", "OTHER=value\n");

    creiq()
        .arg("--csv")
        .arg(&csv)
        .arg("--env")
        .arg(&env)
        .arg("--fetch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("`URL` is not set"))
        .stdout(predicate::str::contains("Fetch completed").not());
}

#[test]
fn test_missing_csv_fails() {
    let dir = TempDir::new().unwrap();
    let env = dir.path().join(".env");
    fs::write(&env, "URL=https://example.com/\n").unwrap();

    creiq()
        .arg("--csv")
        .arg(dir.path().join("absent.csv"))
        .arg("--env")
        .arg(&env)
        .arg("--print")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load identifiers"));
}

#[test]
fn test_missing_column_fails() {
    let dir = TempDir::new().unwrap();
    let (csv, env) = write_inputs(dir.path(), "id\n1\n", "URL=https://example.com/\n");

    creiq()
        .arg("--csv")
        .arg(&csv)
        .arg("--env")
        .arg(&env)
        .args(["--column", "roll_number", "--print"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("roll_number"));
}

#[test]
fn test_headerless_csv_with_no_header_flag() {
    let dir = TempDir::new().unwrap();
    let (csv, env) = write_inputs(dir.path(), "123456\n789012\n", "URL=https://example.com/\n");

    creiq()
        .arg("--csv")
        .arg(&csv)
        .arg("--env")
        .arg(&env)
        .args(["--no-header", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated 2 URLs:"))
        .stdout(predicate::str::contains(
            "https://example.com/123456\nhttps://example.com/789012\n",
        ));
}

#[test]
fn test_headerless_csv_from_env_file() {
    let dir = TempDir::new().unwrap();
    let (csv, env) = write_inputs(
        dir.path(),
        "123456\n789012\n",
        "URL=https://example.com/\nCREIQ_CSV_HEADER=false\n",
    );

    creiq()
        .arg("--csv")
        .arg(&csv)
        .arg("--env")
        .arg(&env)
        .arg("--print")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.com/123456\n"));
}

#[test]
fn test_exported_url_wins_over_env_file() {
    let dir = TempDir::new().unwrap();
    let (csv, env) = write_inputs(
        dir.path(),
        "roll_number\n100\n",
        "URL=https://from-file.example/\n",
    );

    creiq()
        .env("URL", "https://from-process.example/")
        .arg("--csv")
        .arg(&csv)
        .arg("--env")
        .arg(&env)
        .arg("--print")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://from-process.example/100"));
}

#[test]
fn test_no_action_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    let (csv, env) = write_inputs(dir.path(), "roll_number\n1\n", "URL=https://example.com/\n");

    creiq()
        .arg("--csv")
        .arg(&csv)
        .arg("--env")
        .arg(&env)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_writes_results_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/roll/100"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>100</p>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/roll/200"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (csv, env) = write_inputs(
        dir.path(),
        "roll_number\n100\n200\n",
        &format!(
            "URL={}/roll/\nCREIQ_RETRY_DELAY_MS=10\nCREIQ_RATE_LIMIT_MS=0\n",
            server.uri()
        ),
    );
    let output = dir.path().join("out/results.json");

    let assert = creiq()
        .arg("--csv")
        .arg(&csv)
        .arg("--env")
        .arg(&env)
        .args(["--fetch", "--retries", "1", "-o"])
        .arg(&output)
        .assert();
    assert
        .success()
        .stdout(predicate::str::contains("Fetch completed: 1 successful, 1 failed"))
        .stdout(predicate::str::contains("HTTP 500"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let ok_url = format!("{}/roll/100", server.uri());
    let bad_url = format!("{}/roll/200", server.uri());
    assert_eq!(json[&ok_url]["success"], true);
    assert_eq!(json[&ok_url]["content"], "<p>100</p>");
    assert_eq!(json[&bad_url]["success"], false);
    assert!(json[&bad_url]["error"].as_str().unwrap().contains("HTTP 500"));

    creiq()
        .arg("--summarize")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetch completed: 1 successful, 1 failed"))
        .stdout(predicate::str::contains(bad_url.as_str()));
}

#[test]
fn test_summarize_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    creiq()
        .arg("--summarize")
        .arg(dir.path().join("none.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read results"));
}

const LISTING_PAGE: &str = r#"<html><body>
  <div class="row">
    <div class="col-md-3"><strong>Roll Number:</strong></div>
    <div class="col-md-3">100</div>
  </div>
  <div class="row">
    <div class="col-md-3"><strong>Property Description:</strong></div>
    <div class="col-md-3">1 KING ST</div>
  </div>
  <table id="MainContent_GridView1">
    <tr><th>AppealNo</th><th>Status</th></tr>
    <tr><td><a href="ComplaintDetail?AppealNo=A1">A1</a></td><td>Open</td></tr>
  </table>
</body></html>"#;

const DETAIL_PAGE: &str = r#"<html><body>
  <div class="row">
    <div class="col-md-4"><strong>Status:</strong></div>
    <div class="col-md-4">Scheduled</div>
  </div>
</body></html>"#;

#[test]
fn test_parse_saved_results_without_csv() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("results.json");
    let saved = serde_json::json!({
        "https://example.com/arb/Default?RollNo=100": {"success": true, "content": LISTING_PAGE},
        "https://example.com/arb/Default?RollNo=200": {"success": false, "error": "HTTP 500"},
    });
    fs::write(&input, saved.to_string()).unwrap();
    let output = dir.path().join("parsed.json");

    creiq()
        .arg("--csv")
        .arg(dir.path().join("absent.csv"))
        .arg("--env")
        .arg(dir.path().join("absent.env"))
        .arg("--parse")
        .arg("--input")
        .arg(&input)
        .arg("--parsed-output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Parsed 1 pages (1 appeals)"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let page = &json["https://example.com/arb/Default?RollNo=100"];
    assert_eq!(page["property_info"]["roll_number"], "100");
    assert_eq!(page["property_info"]["property_description"], "1 KING ST");
    assert_eq!(page["appeals"][0]["AppealNo"]["text"], "A1");
    assert_eq!(page["appeals"][0]["Status"], "Open");
    assert!(json.get("https://example.com/arb/Default?RollNo=200").is_none());
}

#[test]
fn test_parse_without_source_fails() {
    let dir = TempDir::new().unwrap();
    let (csv, env) = write_inputs(dir.path(), "roll_number\n1\n", "URL=https://example.com/\n");

    creiq()
        .arg("--csv")
        .arg(&csv)
        .arg("--env")
        .arg(&env)
        .arg("--parse")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to parse"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_parse_and_follow_appeal_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/arb/100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING_PAGE))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/arb/ComplaintDetail"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (csv, env) = write_inputs(
        dir.path(),
        "roll_number\n100\n",
        &format!(
            "URL={}/arb/\nCREIQ_RETRY_DELAY_MS=10\nCREIQ_RATE_LIMIT_MS=0\n",
            server.uri()
        ),
    );
    let output = dir.path().join("parsed.json");

    creiq()
        .arg("--csv")
        .arg(&csv)
        .arg("--env")
        .arg(&env)
        .args(["--fetch", "--parse", "--fetch-details", "--parsed-output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetched 1 appeal detail pages"))
        .stdout(predicate::str::contains("Parsed 1 pages (1 appeals)"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let appeal = &json[format!("{}/arb/100", server.uri())]["appeals"][0]["AppealNo"];
    assert_eq!(appeal["url"], "ComplaintDetail?AppealNo=A1");
    assert_eq!(
        appeal["details"]["appellant_information"]["status"],
        "Scheduled"
    );
}
