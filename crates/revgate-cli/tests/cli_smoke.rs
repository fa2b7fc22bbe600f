use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "revgate-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_revgate<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_revgate");
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("revgate command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

struct Fixture {
    _dir: TempDirGuard,
    snapshot: PathBuf,
    census: PathBuf,
    config: PathBuf,
}

impl Fixture {
    fn new(prefix: &str, description: &str) -> Self {
        let dir = TempDirGuard::new(prefix);
        let snapshot = dir.path().join("pr.json");
        let census = dir.path().join("census.toml");
        let config = dir.path().join("revgate.toml");

        let payload = serde_json::json!({
            "id": "17",
            "author": "author",
            "description": description,
            "created_at": "2024-03-01T12:00:00Z",
            "labels": [],
            "comments": [],
            "reviews": [
                {
                    "reviewer": "integrator",
                    "verdict": "approved",
                    "submitted_at": "2024-03-01T13:00:00Z"
                }
            ]
        });
        fs::write(
            &snapshot,
            serde_json::to_vec_pretty(&payload).expect("snapshot should serialize"),
        )
        .expect("snapshot should be written");
        fs::write(
            &census,
            "[members]\nauthor = \"committers\"\nintegrator = \"reviewer\"\n",
        )
        .expect("census should be written");

        Self {
            _dir: dir,
            snapshot,
            census,
            config,
        }
    }

    fn args<'a>(&'a self, command: &'a str) -> Vec<&'a OsStr> {
        vec![
            OsStr::new(command),
            OsStr::new("--snapshot"),
            self.snapshot.as_os_str(),
            OsStr::new("--census"),
            self.census.as_os_str(),
            OsStr::new("--config"),
            self.config.as_os_str(),
        ]
    }

    fn stored(&self) -> Value {
        let bytes = fs::read(&self.snapshot).expect("snapshot should be readable");
        serde_json::from_slice(&bytes).expect("snapshot should be JSON")
    }
}

#[test]
fn parse_json_reports_outcome_and_message() {
    let output = run_revgate(["parse", "/reviewers 2 lead", "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["is_command"], true);
    assert_eq!(payload["outcome"]["outcome"], "parsed");
    assert_eq!(payload["outcome"]["count"], 2);
    assert_eq!(payload["outcome"]["role"], "lead");
    assert!(
        payload["message"]
            .as_str()
            .expect("message should be a string")
            .contains("At least 2 of them must have the role lead.")
    );
}

#[test]
fn parse_text_reports_rejections() {
    let output = run_revgate(["parse", "/reviewers 7001"]);
    assert_success(&output);
    let stdout = stdout_text(&output);
    assert!(stdout.contains("out of range"));
    assert!(stdout.contains(
        "Cannot increase the required number of reviewers above 10 (requested: 7001)"
    ));

    let output = run_revgate(["parse", "looks good to me", "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["is_command"], false);
    assert_eq!(payload["outcome"], Value::Null);
}

#[test]
fn evaluate_write_replays_idempotently() {
    let fixture = Fixture::new("evaluate", "Speed up the parser.\n\n/reviewers 2\n");

    let mut args = fixture.args("evaluate");
    args.extend([OsStr::new("--write"), OsStr::new("--json")]);
    let output = run_revgate(&args);
    assert_success(&output);
    let report = parse_json_stdout(&output);
    assert_eq!(report["replies"], serde_json::json!(["description"]));
    assert_eq!(report["policy"]["required_total"], 2);
    assert_eq!(report["readiness"]["ready"], false);
    assert_eq!(report["tally"]["total"], 1);

    let stored = fixture.stored();
    let comments = stored["comments"].as_array().expect("comments array");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["author"], "revgate-bot");
    let body = comments[0]["body"].as_str().expect("comment body");
    assert!(body.starts_with("@author "));
    assert!(body.contains("(with at least 1 of role reviewers)"));

    let output = run_revgate(&args);
    assert_success(&output);
    let report = parse_json_stdout(&output);
    assert_eq!(report["replies"], serde_json::json!([]));
    assert_eq!(
        fixture.stored()["comments"]
            .as_array()
            .expect("comments array")
            .len(),
        1
    );
}

#[test]
fn gate_blocks_until_requirement_met() {
    let fixture = Fixture::new("gate-blocked", "/reviewers 2");

    let mut args = fixture.args("gate");
    args.extend([OsStr::new("--action"), OsStr::new("integrate")]);
    let output = run_revgate(&args);
    assert_failure(&output);
    let stdout = stdout_text(&output);
    assert!(stdout.contains("Your pull request has not yet been marked as ready for integration."));
    assert!(stdout.contains("- 1 of 2 required approvals"));

    let mut args = fixture.args("gate");
    args.extend([
        OsStr::new("--action"),
        OsStr::new("sponsor"),
        OsStr::new("--json"),
    ]);
    let output = run_revgate(&args);
    assert_failure(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["gate"], "blocked");
    assert!(
        payload["message"]
            .as_str()
            .expect("message should be a string")
            .starts_with("This PR has not yet been marked as ready for integration.")
    );
}

#[test]
fn gate_allows_and_writes_ready_label() {
    let fixture = Fixture::new("gate-allowed", "");

    let mut args = fixture.args("gate");
    args.extend([
        OsStr::new("--action"),
        OsStr::new("integrate"),
        OsStr::new("--write"),
    ]);
    let output = run_revgate(&args);
    assert_success(&output);
    assert!(stdout_text(&output).contains("Allowed"));
    assert_eq!(fixture.stored()["labels"], serde_json::json!(["ready"]));
}

#[test]
fn watch_runs_requested_ticks() {
    let fixture = Fixture::new("watch", "/reviewers 1 lead");

    let mut args = fixture.args("watch");
    args.extend([
        OsStr::new("--passes"),
        OsStr::new("2"),
        OsStr::new("--interval-secs"),
        OsStr::new("1"),
        OsStr::new("--write"),
    ]);
    let output = run_revgate(&args);
    assert_success(&output);
    let stdout = stdout_text(&output);
    assert!(stdout.contains("Ticks: 2"));
    assert!(stdout.contains("Passes completed: 2"));
    assert!(stdout.contains("Ready: no"));

    let stored = fixture.stored();
    assert_eq!(stored["comments"].as_array().expect("comments array").len(), 1);
}

#[test]
fn missing_snapshot_reports_error() {
    let dir = TempDirGuard::new("missing");
    let snapshot = dir.path().join("absent.json");
    let output = run_revgate([
        OsStr::new("evaluate"),
        OsStr::new("--snapshot"),
        snapshot.as_os_str(),
    ]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn malformed_census_reports_error() {
    let fixture = Fixture::new("bad-census", "");
    fs::write(&fixture.census, "[members]\nauthor = \"penguins\"\n")
        .expect("census should be written");
    let output = run_revgate(fixture.args("evaluate"));
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: failed to parse census"));
}
