use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn redem_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("redem");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(
        config_dir.join("host_aliases.txt"),
        "# mobile hosts\nen.m.wikipedia.org en.wikipedia.org\nyoutu.be www.youtube.com\n",
    )
    .unwrap();
    fs::write(config_dir.join("https_hosts.txt"), "www.youtube.com\n").unwrap();

    fs::write(
        data_dir.join("old.json"),
        r#"{
  "_meta": {"date_utc": "2015-01-01 00:00:00.000000", "username": "someone"},
  "comments": [
    {"id": "c1", "body": "old", "body_html": "<p><a href=\"http://en.m.wikipedia.org/wiki/X\">x</a></p>",
     "created_utc": 100.0, "edited": 100, "permalink": "/r/test/comments/1/t/c1", "subreddit": "test"},
    {"id": "c0", "body": "first", "created_utc": 50.0, "permalink": "/r/test/comments/1/t/c0"}
  ],
  "submissions": [],
  "uris": []
}"#,
    )
    .unwrap();
    fs::write(
        data_dir.join("new.json"),
        r#"{
  "_meta": {"date_utc": "2016-01-01 00:00:00.000000", "username": "someone"},
  "comments": [
    {"id": "c1", "body": "new", "body_html": "<p><a href=\"http://youtu.be/v\">v</a></p>",
     "created_utc": 100.0, "edited": 200, "permalink": "/r/test/comments/1/t/c1", "subreddit": "test"}
  ],
  "submissions": [
    {"id": "s1", "title": "Link & stuff", "url": "http://youtu.be/v", "permalink": "/r/test/comments/1/t/",
     "created_utc": 90.0, "domain": "youtu.be", "subreddit": "test"}
  ],
  "uris": []
}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[archive]
path = "{root}/data/data.json"

[fetch]
base_url = "http://127.0.0.1:9"
timeout_secs = 5

[cache]
enabled = false

[canonical]
host_aliases = "{root}/config/host_aliases.txt"
https_hosts = "{root}/config/https_hosts.txt"

[extract]
mode = "markup"
workers = 2
"#,
        root = root.display()
    );

    let config_path = config_dir.join("redem.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_redem(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = redem_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run redem binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn merged_env() -> (TempDir, PathBuf, PathBuf) {
    let (tmp, config_path) = setup_test_env();
    let data = tmp.path().join("data");
    let merged = data.join("data.json");
    let (stdout, stderr, success) = run_redem(
        &config_path,
        &[
            "merge",
            data.join("old.json").to_str().unwrap(),
            data.join("new.json").to_str().unwrap(),
            "-o",
            merged.to_str().unwrap(),
        ],
    );
    assert!(success, "merge failed: stdout={}, stderr={}", stdout, stderr);
    (tmp, config_path, merged)
}

#[test]
fn test_merge_keeps_newest_edit() {
    let (_tmp, _config_path, merged) = merged_env();

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&merged).unwrap()).unwrap();
    let comments = doc["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["id"], "c1");
    assert_eq!(comments[0]["body"], "new");
    assert_eq!(comments[1]["id"], "c0");

    let from = doc["_meta"]["merged_from"].as_object().unwrap();
    assert!(from.contains_key("old.json"));
    assert!(from.contains_key("new.json"));
}

#[test]
fn test_merge_recomputes_canonical_uris() {
    let (_tmp, _config_path, merged) = merged_env();

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&merged).unwrap()).unwrap();
    let uris: Vec<(String, u64)> = doc["uris"]
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| (pair[0].as_str().unwrap().to_string(), pair[1].as_u64().unwrap()))
        .collect();

    let mut sorted = uris.clone();
    sorted.sort();
    assert_eq!(uris, sorted, "uris must be sorted by canonical URI");

    assert!(uris.contains(&("https://www.youtube.com/v".to_string(), 2)));
    assert!(
        !uris.iter().any(|(u, _)| u.contains("en.wikipedia.org")),
        "the replaced comment's links must not survive"
    );
}

#[test]
fn test_merge_missing_input_fails() {
    let (tmp, config_path) = setup_test_env();
    let out = tmp.path().join("out.json");
    let (_, stderr, success) = run_redem(
        &config_path,
        &["merge", "/nonexistent/a.json", "-o", out.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("a.json"));
    assert!(!out.exists());
}

#[test]
fn test_report_writes_html() {
    let (tmp, config_path, _merged) = merged_env();
    let html_path = tmp.path().join("site/summary.html");

    let (stdout, stderr, success) = run_redem(
        &config_path,
        &["report", "-o", html_path.to_str().unwrap(), "--media-url", "/assets/"],
    );
    assert!(success, "report failed: stdout={}, stderr={}", stdout, stderr);

    let html = fs::read_to_string(&html_path).unwrap();
    assert!(html.contains("<title>redem_summary - someone</title>"));
    assert!(html.contains("Link &amp; stuff"));
    assert!(html.contains("href=\"/assets/redem.css\""));
    assert!(html.contains("https://www.youtube.com/v"));
}

#[test]
fn test_report_to_stdout_with_username() {
    let (_tmp, config_path, merged) = merged_env();
    let (stdout, _, success) = run_redem(
        &config_path,
        &["report", "--json", merged.to_str().unwrap(), "--username", "other"],
    );
    assert!(success);
    assert!(stdout.starts_with("<!DOCTYPE html>"));
    assert!(stdout.contains("<title>redem_summary - other</title>"));
}

#[test]
fn test_uris_table() {
    let (_tmp, config_path, _merged) = merged_env();

    let (stdout, stderr, success) =
        run_redem(&config_path, &["uris", "--by", "freq", "--limit", "1"]);
    assert!(success, "uris failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("URI index"));
    assert!(stdout.contains("www.youtube.com"));
    assert!(stdout.contains("more"));
}

#[test]
fn test_uris_rejects_unknown_order() {
    let (_tmp, config_path, _merged) = merged_env();
    let (_, _, success) = run_redem(&config_path, &["uris", "--by", "popularity"]);
    assert!(!success);
}

#[test]
fn test_backup_unreachable_platform_fails() {
    let (tmp, config_path) = setup_test_env();
    let out = tmp.path().join("backup.json");

    let (_, stderr, success) = run_redem(
        &config_path,
        &["--quiet", "backup", "someone", "--json", out.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("someone"));
    assert!(!out.exists());
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, _config_path) = setup_test_env();
    let bad = tmp.path().join("bad.toml");
    fs::write(&bad, "[extract]\nworkers = 0\n").unwrap();

    let (_, stderr, success) = run_redem(&bad, &["uris"]);
    assert!(!success);
    assert!(stderr.contains("workers"));
}

#[test]
fn test_explicit_missing_config_is_error() {
    let (tmp, _config_path) = setup_test_env();
    let (_, stderr, success) = run_redem(&tmp.path().join("absent.toml"), &["uris"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
