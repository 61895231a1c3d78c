//! End-to-end checks of the glintctl binary.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("glintctl");
    let output = cmd
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    for sub in ["list", "key", "fetch", "bind"] {
        assert!(text.contains(sub), "help missing '{sub}'");
    }
}

#[test]
fn bind_help_mentions_slots() {
    let mut cmd = cargo_bin_cmd!("glintctl");
    cmd.arg("bind")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--slots"))
        .stdout(predicate::str::contains("--passes"));
}

#[test]
fn key_uses_last_path_segment_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("glintctl");
    cmd.current_dir(dir.path())
        .env_remove("GLINT_KEY_STRATEGY")
        .env_remove("GLINT_CONFIG_PATH")
        .arg("key")
        .arg("http://x/icons/a.png")
        .assert()
        .success()
        .stdout("a.png\n");
}

#[test]
fn key_rejects_url_without_filename() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("glintctl");
    cmd.current_dir(dir.path())
        .env_remove("GLINT_CONFIG_PATH")
        .args(["key", "http://x/", "--strategy", "last-segment"])
        .assert()
        .failure();
}

#[test]
fn list_prints_records_and_keys() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("mask.json");
    std::fs::write(
        &manifest,
        r#"[
            {"icon_url":"http://x/a.png","resource_id":"1"},
            {"icon_url":"http://x/b.png","resource_id":"2"}
        ]"#,
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("glintctl");
    cmd.current_dir(dir.path())
        .env_remove("GLINT_KEY_STRATEGY")
        .env_remove("GLINT_CONFIG_PATH")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 records"))
        .stdout(predicate::str::contains("0\t1\thttp://x/a.png\ta.png"))
        .stdout(predicate::str::contains("1\t2\thttp://x/b.png\tb.png"));
}

#[test]
fn missing_manifest_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("glintctl");
    cmd.current_dir(dir.path())
        .env_remove("GLINT_CONFIG_PATH")
        .args(["list", "--manifest", "absent.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 records"));

    let mut cmd = cargo_bin_cmd!("glintctl");
    cmd.current_dir(dir.path())
        .env_remove("GLINT_CONFIG_PATH")
        .args(["bind", "--manifest", "absent.json"])
        .arg("--cache-dir")
        .arg(dir.path().join("cache"))
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to bind"));
}
