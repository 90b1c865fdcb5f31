#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const ORMS: [&str; 4] = ["prisma", "typeorm", "sequelize", "drizzle"];

/// A throwaway workspace: `pnpm-workspace.yaml`, one package dir per ORM and
/// a `bin/` directory for fake tools.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pnpm-workspace.yaml"), "packages:\n  - packages/*\n")
            .unwrap();
        for orm in ORMS {
            std::fs::create_dir_all(dir.path().join("packages").join(orm)).unwrap();
        }
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn log_path(&self) -> PathBuf {
        self.root().join("calls.log")
    }

    fn log(&self) -> Vec<String> {
        std::fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn path_env(&self) -> String {
        let bin = self.root().join("bin");
        match std::env::var("PATH") {
            Ok(path) => format!("{}:{path}", bin.display()),
            Err(_) => bin.display().to_string(),
        }
    }

    fn helper(&self) -> Command {
        let mut cmd = Command::cargo_bin("orm-helper").unwrap();
        cmd.current_dir(self.root())
            .env("ORM_HELPER_ROOT", self.root())
            .env("PATH", self.path_env())
            .env("ORMS_TEST_LOG", self.log_path())
            .env_remove("RUST_LOG");
        cmd
    }

    #[cfg(unix)]
    fn script(&self, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root().join("bin").join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// docker: log `<dir> docker <args>`; exit 7 when cwd contains `$ORMS_FAIL_IN`.
    #[cfg(unix)]
    fn fake_docker(&self) {
        self.script(
            "docker",
            r#"echo "${PWD##*/} docker $*" >> "$ORMS_TEST_LOG"
if [ -n "$ORMS_FAIL_IN" ]; then
  case "$PWD" in *"$ORMS_FAIL_IN"*) exit 7 ;; esac
fi
exit 0
"#,
        );
    }

    /// dotenv: log, drop everything up to `--`, exec the rest.
    #[cfg(unix)]
    fn fake_dotenv(&self) {
        self.script(
            "dotenv",
            r#"echo "${PWD##*/} dotenv $*" >> "$ORMS_TEST_LOG"
while [ "$#" -gt 0 ]; do
  if [ "$1" = "--" ]; then shift; break; fi
  shift
done
exec "$@"
"#,
        );
    }

    #[cfg(unix)]
    fn fake_pnpm(&self) {
        self.script("pnpm", r#"echo "${PWD##*/} pnpm $*" >> "$ORMS_TEST_LOG""#);
    }
}

// ---------------------------------------------------------------------------
// Argument validation
// ---------------------------------------------------------------------------

#[test]
fn no_arguments_prints_usage() {
    let ws = Workspace::new();
    ws.helper()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage: orm-helper <command> <orm>"))
        .stderr(predicate::str::contains(
            "Commands: db:up, db:down, db:reset, service:dev, service:start, dev",
        ))
        .stderr(predicate::str::contains(
            "ORMs: prisma, typeorm, sequelize, drizzle, all",
        ));
}

#[test]
fn one_argument_prints_usage() {
    let ws = Workspace::new();
    ws.helper()
        .arg("db:up")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn invalid_target_lists_valid_values_once() {
    let ws = Workspace::new();
    let output = ws
        .helper()
        .args(["db:up", "mongoose"])
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();

    let stderr = String::from_utf8(output).unwrap();
    assert!(stderr.contains("Invalid ORM: mongoose"), "{stderr}");
    for value in ["prisma", "typeorm", "sequelize", "drizzle", "all"] {
        assert_eq!(stderr.matches(value).count(), 1, "{value} in {stderr}");
    }
}

#[test]
fn invalid_target_reported_before_unknown_command() {
    let ws = Workspace::new();
    ws.helper()
        .args(["db:migrate", "mongoose"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid ORM: mongoose"));
}

#[test]
fn unknown_command_fails() {
    let ws = Workspace::new();
    ws.helper()
        .args(["db:migrate", "prisma"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown command: db:migrate"));
}

#[test]
fn service_commands_reject_all() {
    let ws = Workspace::new();
    for command in ["service:dev", "service:start"] {
        ws.helper()
            .args([command, "all"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("does not support target 'all'"));
    }
    assert!(ws.log().is_empty());
}

#[test]
fn malformed_config_fails() {
    let ws = Workspace::new();
    std::fs::write(ws.root().join("orm-helper.yaml"), "tools: [docker\n").unwrap();
    ws.helper()
        .args(["db:up", "prisma", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to load orm-helper.yaml"));
}

#[test]
fn extra_argument_is_a_usage_error() {
    let ws = Workspace::new();
    ws.helper()
        .args(["db:up", "prisma", "extra"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unexpected argument 'extra'"));
    assert!(ws.log().is_empty());
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let ws = Workspace::new();
    ws.helper().args(["db:up", "-x"]).assert().code(1);
}

#[test]
fn help_still_exits_zero() {
    let ws = Workspace::new();
    ws.helper()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

// ---------------------------------------------------------------------------
// --dry-run
// ---------------------------------------------------------------------------

#[test]
fn dry_run_json_reset_is_single_step_in_package_dir() {
    let ws = Workspace::new();
    let output = ws
        .helper()
        .args(["--dry-run", "--json", "db:reset", "typeorm"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["mode"], "sequential");
    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["program"], "sh");
    assert_eq!(
        steps[0]["args"][1],
        "docker compose down -v && docker compose up -d"
    );
    let cwd = PathBuf::from(steps[0]["cwd"].as_str().unwrap());
    assert_eq!(cwd, ws.root().join("packages/typeorm"));
}

#[test]
fn dry_run_dev_all_lists_both_phases() {
    let ws = Workspace::new();
    ws.helper()
        .args(["--dry-run", "dev", "all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sequential"))
        .stdout(predicate::str::contains("concurrent"))
        .stdout(predicate::str::contains("@rd-node-orms/drizzle-service"));
}

#[test]
fn dry_run_uses_configured_scope() {
    let ws = Workspace::new();
    std::fs::write(ws.root().join("orm-helper.yaml"), "service_scope: \"@acme\"\n").unwrap();
    ws.helper()
        .args(["--dry-run", "service:start", "prisma"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "dotenv -e .env -- pnpm --filter @acme/prisma-service start",
        ));
}

// ---------------------------------------------------------------------------
// Execution with fake tools
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn db_up_runs_docker_in_package_dir() {
    let ws = Workspace::new();
    ws.fake_docker();
    ws.helper().args(["db:up", "sequelize"]).assert().success();
    assert_eq!(ws.log(), ["sequelize docker compose up -d"]);
}

#[cfg(unix)]
#[test]
fn db_down_single_target() {
    let ws = Workspace::new();
    ws.fake_docker();
    ws.helper().args(["db:down", "drizzle"]).assert().success();
    assert_eq!(ws.log(), ["drizzle docker compose down"]);
}

#[cfg(unix)]
#[test]
fn db_reset_is_down_with_volumes_then_up() {
    let ws = Workspace::new();
    ws.fake_docker();
    ws.helper().args(["db:reset", "prisma"]).assert().success();
    assert_eq!(
        ws.log(),
        [
            "prisma docker compose down -v",
            "prisma docker compose up -d"
        ]
    );
}

#[cfg(unix)]
#[test]
fn all_db_up_runs_in_declaration_order() {
    let ws = Workspace::new();
    ws.fake_docker();
    ws.helper().args(["db:up", "all"]).assert().success();
    assert_eq!(
        ws.log(),
        [
            "prisma docker compose up -d",
            "typeorm docker compose up -d",
            "sequelize docker compose up -d",
            "drizzle docker compose up -d",
        ]
    );
}

#[cfg(unix)]
#[test]
fn all_db_up_stops_at_first_failure() {
    let ws = Workspace::new();
    ws.fake_docker();
    ws.helper()
        .args(["db:up", "all"])
        .env("ORMS_FAIL_IN", "packages/typeorm")
        .assert()
        .code(1)
        .stderr(predicate::str::is_empty());
    assert_eq!(
        ws.log(),
        [
            "prisma docker compose up -d",
            "typeorm docker compose up -d"
        ]
    );
}

#[cfg(unix)]
#[test]
fn service_start_loads_env_and_filters_one_service() {
    let ws = Workspace::new();
    ws.fake_dotenv();
    ws.fake_pnpm();
    ws.helper().args(["service:start", "drizzle"]).assert().success();

    let log = ws.log();
    assert_eq!(log.len(), 2, "{log:?}");
    assert!(log[0].ends_with("dotenv -e .env -- pnpm --filter @rd-node-orms/drizzle-service start"));
    assert!(log[1].ends_with("pnpm --filter @rd-node-orms/drizzle-service start"));
}

#[cfg(unix)]
#[test]
fn dev_runs_service_after_database() {
    let ws = Workspace::new();
    ws.fake_docker();
    ws.fake_dotenv();
    ws.fake_pnpm();
    ws.helper().args(["dev", "typeorm"]).assert().success();

    let log = ws.log();
    assert_eq!(log.len(), 3, "{log:?}");
    assert_eq!(log[0], "typeorm docker compose up -d");
    assert!(log[2].ends_with("pnpm --filter @rd-node-orms/typeorm-service dev"));
}

#[cfg(unix)]
#[test]
fn dev_aborts_when_database_fails() {
    let ws = Workspace::new();
    ws.fake_docker();
    ws.fake_dotenv();
    ws.fake_pnpm();
    ws.helper()
        .args(["dev", "prisma"])
        .env("ORMS_FAIL_IN", "packages/prisma")
        .assert()
        .code(1);
    assert_eq!(ws.log(), ["prisma docker compose up -d"]);
}

#[cfg(unix)]
#[test]
fn missing_tool_fails_with_message() {
    let ws = Workspace::new();
    let mut cmd = ws.helper();
    cmd.env("PATH", ws.root().join("bin"));
    cmd.args(["db:up", "prisma"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("'docker' not found on PATH"));
}

#[cfg(unix)]
#[test]
fn missing_package_dir_fails_before_spawn() {
    let ws = Workspace::new();
    ws.fake_docker();
    std::fs::remove_dir(ws.root().join("packages/drizzle")).unwrap();
    ws.helper()
        .args(["db:down", "drizzle"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("working directory does not exist"));
    assert!(ws.log().is_empty());
}

// ---------------------------------------------------------------------------
// dev all: fan-out + cancellation
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn dev_all_fails_before_spawning_when_a_database_fails() {
    let ws = Workspace::new();
    ws.fake_docker();
    ws.fake_dotenv();
    ws.fake_pnpm();
    ws.helper()
        .args(["dev", "all"])
        .env("ORMS_FAIL_IN", "packages/sequelize")
        .assert()
        .code(1);

    let log = ws.log();
    assert_eq!(log.len(), 3, "{log:?}");
    assert!(log.iter().all(|l| l.contains("docker compose up -d")));
}

/// A running `orm-helper dev all` whose services drop marker files into
/// `marks/`.
#[cfg(unix)]
struct DevAll {
    child: std::process::Child,
    marks: PathBuf,
}

#[cfg(unix)]
impl DevAll {
    fn start(ws: &Workspace) -> Self {
        use std::process::Stdio;

        let marks = ws.root().join("marks");
        std::fs::create_dir_all(&marks).unwrap();
        let child = std::process::Command::new(assert_cmd::cargo::cargo_bin("orm-helper"))
            .args(["dev", "all"])
            .current_dir(ws.root())
            .env("ORM_HELPER_ROOT", ws.root())
            .env("PATH", ws.path_env())
            .env("ORMS_TEST_LOG", ws.log_path())
            .env("ORMS_TEST_DIR", &marks)
            .env_remove("RUST_LOG")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        Self { child, marks }
    }

    fn all_marked(&self, prefix: &str) -> bool {
        ORMS.iter()
            .all(|o| self.marks.join(format!("{prefix}-{o}-service")).exists())
    }

    fn wait_until_started(&self) {
        let deadline = Instant::now() + Duration::from_secs(20);
        while !self.all_marked("started") {
            assert!(Instant::now() < deadline, "services did not start");
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    fn send(&self, signal: nix::sys::signal::Signal) {
        use nix::unistd::Pid;
        nix::sys::signal::kill(Pid::from_raw(self.child.id() as i32), signal).unwrap();
    }

    fn wait_exit(&mut self, within: Duration) -> std::process::ExitStatus {
        let deadline = Instant::now() + within;
        loop {
            if let Some(status) = self.child.try_wait().unwrap() {
                return status;
            }
            if Instant::now() >= deadline {
                let _ = self.child.kill();
                panic!("orm-helper did not exit within {within:?}");
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}

/// Long-running service: marks itself started, marks SIGTERM, exits 0.
#[cfg(unix)]
fn polite_pnpm(ws: &Workspace) {
    ws.script(
        "pnpm",
        r#"svc=${2##*/}
trap ': > "$ORMS_TEST_DIR/term-$svc"; kill "$pid" 2>/dev/null; exit 0' TERM
: > "$ORMS_TEST_DIR/started-$svc"
sleep 30 &
pid=$!
wait "$pid"
"#,
    );
}

/// Service that ignores SIGTERM and SIGINT; only SIGKILL stops it.
#[cfg(unix)]
fn stubborn_pnpm(ws: &Workspace) {
    ws.script(
        "pnpm",
        r#"svc=${2##*/}
trap '' TERM INT
: > "$ORMS_TEST_DIR/started-$svc"
while :; do sleep 0.2; done
"#,
    );
}

#[cfg(unix)]
fn stops_every_service_on(signal: nix::sys::signal::Signal) {
    let ws = Workspace::new();
    ws.fake_docker();
    ws.fake_dotenv();
    polite_pnpm(&ws);

    let mut dev = DevAll::start(&ws);
    dev.wait_until_started();
    dev.send(signal);

    let status = dev.wait_exit(Duration::from_secs(20));
    assert_eq!(status.code(), Some(0));
    assert!(dev.all_marked("term"), "every service should receive SIGTERM");

    // Databases came up before any service.
    let log = ws.log();
    let first_service = log.iter().position(|l| l.contains("dotenv")).unwrap();
    assert_eq!(first_service, 4, "{log:?}");
}

#[cfg(unix)]
#[test]
fn dev_all_terminates_every_service_on_sigterm() {
    stops_every_service_on(nix::sys::signal::Signal::SIGTERM);
}

#[cfg(unix)]
#[test]
fn dev_all_terminates_every_service_on_interrupt() {
    stops_every_service_on(nix::sys::signal::Signal::SIGINT);
}

#[cfg(unix)]
#[test]
fn dev_all_kills_services_that_ignore_sigterm() {
    let ws = Workspace::new();
    ws.fake_docker();
    ws.fake_dotenv();
    stubborn_pnpm(&ws);
    std::fs::write(ws.root().join("orm-helper.yaml"), "stop_timeout_secs: 1\n").unwrap();

    let mut dev = DevAll::start(&ws);
    dev.wait_until_started();
    let sent = Instant::now();
    dev.send(nix::sys::signal::Signal::SIGTERM);

    let status = dev.wait_exit(Duration::from_secs(15));
    assert_eq!(status.code(), Some(0));
    assert!(sent.elapsed() >= Duration::from_secs(1), "grace period was skipped");
}

#[cfg(unix)]
#[test]
fn second_signal_kills_services_immediately() {
    let ws = Workspace::new();
    ws.fake_docker();
    ws.fake_dotenv();
    stubborn_pnpm(&ws);
    std::fs::write(ws.root().join("orm-helper.yaml"), "stop_timeout_secs: 600\n").unwrap();

    let mut dev = DevAll::start(&ws);
    dev.wait_until_started();
    dev.send(nix::sys::signal::Signal::SIGTERM);
    std::thread::sleep(Duration::from_millis(500));
    dev.send(nix::sys::signal::Signal::SIGINT);

    let status = dev.wait_exit(Duration::from_secs(15));
    assert_eq!(status.code(), Some(0));
}
