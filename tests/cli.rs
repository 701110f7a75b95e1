#![cfg(unix)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAKE_SCAN: &str = r#"#!/bin/sh
case "$1" in
  -v) echo "6.0.4.564"; exit 0 ;;
  -V) echo "9324"; exit 0 ;;
  -abfu)
    if grep -q EICAR "$2"; then
      printf '%s\tEICAR test file NOT a virus.\n' "$2"
      exit 1
    fi
    if grep -q GARBLED "$2"; then
      echo "engine busy"
      exit 0
    fi
    if grep -q BROKEN "$2"; then
      echo "daemon unavailable" >&2
      exit 2
    fi
    printf '%s\t[OK]\n' "$2"
    exit 0 ;;
esac
exit 3
"#;

struct Engine {
    _tmp: TempDir,
    root: PathBuf,
}

impl Engine {
    fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().to_path_buf();

        write_script(&root.join("scan"), FAKE_SCAN);
        write_script(&root.join("daemon"), "#!/bin/sh\nexit 0\n");
        write_script(&root.join("update"), "#!/bin/sh\necho \"DATs updated\"\n");
        fs::write(root.join("license"), "Product=VSCL\nUpdateValidThru=4102444800\n").unwrap();
        fs::write(root.join("UPDATED"), "20260110").unwrap();

        Self { _tmp: tmp, root }
    }

    fn sample(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("avbridge");
        cmd.env("AVBRIDGE_SCAN_BIN", self.root.join("scan"))
            .env("AVBRIDGE_DAEMON_CMD", format!("{} start", self.root.join("daemon").display()))
            .env("AVBRIDGE_UPDATE_CMD", self.root.join("update"))
            .env("AVBRIDGE_LICENSE_FILE", self.root.join("license"))
            .env("AVBRIDGE_UPDATED_FILE", self.root.join("UPDATED"))
            .env("MALICE_TIMEOUT", "10")
            .env_remove("MALICE_ELASTICSEARCH_URL")
            .env_remove("MALICE_ENDPOINT")
            .env_remove("MALICE_PROXY")
            .env_remove("MALICE_SCANID")
            .env_remove("RUST_LOG");
        cmd
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}

#[test]
fn clean_file_prints_json() {
    let engine = Engine::new();
    let sample = engine.sample("clean.txt", "hello");

    let output = engine.cmd().arg(&sample).assert().success().get_output().stdout.clone();
    let value = stdout_json(&output);

    assert_eq!(value["mcafee"]["infected"], Value::Bool(false));
    assert_eq!(value["mcafee"]["result"], "");
    assert_eq!(value["mcafee"]["engine"], "6.0.4.564");
    assert_eq!(value["mcafee"]["database"], "9324");
    assert_eq!(value["mcafee"]["updated"], "20260110");
    assert!(value["mcafee"].get("markdown").is_none());
}

#[test]
fn infected_file_reports_threat() {
    let engine = Engine::new();
    let sample = engine.sample("eicar.com", "EICAR");

    let output = engine
        .cmd()
        .args(["scan"])
        .arg(&sample)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value = stdout_json(&output);

    assert_eq!(value["mcafee"]["infected"], Value::Bool(true));
    assert_eq!(value["mcafee"]["result"], "EICAR test file NOT a virus.");
}

#[test]
fn table_flag_prints_markdown() {
    let engine = Engine::new();
    let sample = engine.sample("eicar.com", "EICAR");

    engine
        .cmd()
        .arg("-t")
        .arg(&sample)
        .assert()
        .success()
        .stdout(contains("#### McAfee"))
        .stdout(contains("| Infected | Result | Engine | Definitions | Updated |"))
        .stdout(contains("| true | EICAR test file NOT a virus. | 6.0.4.564 | 9324 | 20260110 |"));
}

#[test]
fn missing_file_fails() {
    let engine = Engine::new();

    engine
        .cmd()
        .arg(engine.root.join("missing.bin"))
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(contains("file not found"));
}

#[test]
fn missing_license_fails() {
    let engine = Engine::new();
    let sample = engine.sample("clean.txt", "hello");
    fs::remove_file(engine.root.join("license")).unwrap();

    engine
        .cmd()
        .arg(&sample)
        .assert()
        .failure()
        .stderr(contains("license"));
}

#[test]
fn unparseable_output_fails_without_json() {
    let engine = Engine::new();
    let sample = engine.sample("garbled.bin", "GARBLED");

    engine
        .cmd()
        .arg(&sample)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(contains("malformed engine output"));
}

#[test]
fn engine_process_error_fails() {
    let engine = Engine::new();
    let sample = engine.sample("broken.bin", "BROKEN");

    engine
        .cmd()
        .arg(&sample)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(contains("exit code 2"));
}

#[test]
fn update_rewrites_marker() {
    let engine = Engine::new();
    let marker = engine.root.join("UPDATED");
    fs::remove_file(&marker).unwrap();

    engine.cmd().arg("update").assert().success();

    let stamp = fs::read_to_string(&marker).unwrap();
    assert_eq!(stamp.trim().len(), 8);
    assert!(stamp.trim().chars().all(|c| c.is_ascii_digit()));
}
