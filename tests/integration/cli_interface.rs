//! CLI surface tests.

use assert_cmd::Command;

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("callsync")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("download"))
        .stdout(predicates::str::contains("test"));
}

#[test]
fn test_download_requires_credentials() {
    Command::cargo_bin("callsync")
        .unwrap()
        .args([
            "download",
            "--start-date",
            "2024-01-01",
            "--end-date",
            "2024-01-31",
        ])
        .env_remove("CALLSYNC_ACCESS_KEY")
        .env_remove("CALLSYNC_ACCESS_KEY_SECRET")
        .env_remove("CALLSYNC_BASE_URL")
        .assert()
        .failure();
}

#[test]
fn test_download_rejects_inverted_date_range() {
    Command::cargo_bin("callsync")
        .unwrap()
        .args([
            "download",
            "--access-key",
            "k",
            "--access-key-secret",
            "s",
            "--base-url",
            "https://api.example.com",
            "--start-date",
            "2024-02-01",
            "--end-date",
            "2024-01-01",
        ])
        .assert()
        .failure();
}
