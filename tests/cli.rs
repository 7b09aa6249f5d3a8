use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn subtopic_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("subtopic");
    path
}

/// Temp dir with a config file; also used as the working directory so no
/// stray `.env` gets picked up.
fn setup_test_env(config: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("subtopic.toml");
    fs::write(&config_path, config).unwrap();
    (tmp, config_path)
}

fn run_subtopic(
    workdir: &Path,
    config_path: &Path,
    args: &[&str],
    creds: Option<(&str, &str)>,
) -> (String, String, bool) {
    let binary = subtopic_binary();
    let mut cmd = Command::new(&binary);
    cmd.current_dir(workdir)
        .arg("--config")
        .arg(config_path)
        .arg("--progress")
        .arg("off")
        .args(args)
        .env_remove("CLIENT_ID")
        .env_remove("API_KEY")
        .env_remove("RUST_LOG");
    if let Some((id, key)) = creds {
        cmd.env("CLIENT_ID", id).env("API_KEY", key);
    }
    let output = cmd
        .output()
        .unwrap_or_else(|e| panic!("Failed to run subtopic binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

// Points at a closed local port so an accidental network call fails fast
// instead of reaching Reddit.
const OFFLINE_CONFIG: &str = r#"
[source]
base_url = "http://127.0.0.1:9"
token_url = "http://127.0.0.1:9/api/v1/access_token"
timeout_secs = 2
"#;

#[test]
fn test_help_lists_commands() {
    let output = Command::new(subtopic_binary())
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("fetch"));
    assert!(stdout.contains("analyze"));
    assert!(stdout.contains("check"));
}

#[test]
fn test_fetch_rejects_unknown_sort() {
    let (tmp, config) = setup_test_env(OFFLINE_CONFIG);
    let (_, stderr, success) = run_subtopic(
        tmp.path(),
        &config,
        &["fetch", "rust", "--sort", "biweekly", "--limit", "5"],
        Some(("id", "secret")),
    );
    assert!(!success);
    assert!(
        stderr.contains("Invalid sort option 'biweekly'"),
        "stderr: {}",
        stderr
    );
    assert!(stderr.contains("hot, new, week, month, year"));
}

#[test]
fn test_analyze_rejects_unknown_sort_before_credentials() {
    let (tmp, config) = setup_test_env(OFFLINE_CONFIG);
    let (_, stderr, success) = run_subtopic(
        tmp.path(),
        &config,
        &["analyze", "rust", "--sort", "daily"],
        None,
    );
    assert!(!success);
    assert!(stderr.contains("Invalid sort option 'daily'"), "stderr: {}", stderr);
}

#[test]
fn test_fetch_rejects_zero_limit() {
    let (tmp, config) = setup_test_env(OFFLINE_CONFIG);
    let (_, stderr, success) = run_subtopic(
        tmp.path(),
        &config,
        &["fetch", "rust", "--limit", "0"],
        Some(("id", "secret")),
    );
    assert!(!success);
    assert!(stderr.contains("requested item count must be > 0"), "stderr: {}", stderr);
}

#[test]
fn test_missing_credentials() {
    let (tmp, config) = setup_test_env(OFFLINE_CONFIG);
    let (_, stderr, success) = run_subtopic(tmp.path(), &config, &["check"], None);
    assert!(!success);
    assert!(
        stderr.contains("CLIENT_ID environment variable not set"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_unreachable_token_endpoint_fails() {
    let (tmp, config) = setup_test_env(OFFLINE_CONFIG);
    let (_, stderr, success) =
        run_subtopic(tmp.path(), &config, &["check"], Some(("id", "secret")));
    assert!(!success);
    assert!(stderr.contains("Error:"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, config) = setup_test_env("[fetch]\ncomment_cap = 0\n");
    let (_, stderr, success) = run_subtopic(
        tmp.path(),
        &config,
        &["fetch", "rust"],
        Some(("id", "secret")),
    );
    assert!(!success);
    assert!(stderr.contains("fetch.comment_cap must be > 0"), "stderr: {}", stderr);
}
