//! Automation trigger: detached worker launch on status transitions.
//!
//! When an update moves a task from the not-started label to the ready
//! label and automation is enabled, the configured worker command is
//! spawned with `run <task-id>` appended and its combined stdout/stderr
//! redirected into an append-only log file.
//!
//! The launch is fire-and-forget: the caller never awaits the worker,
//! there is no backpressure and no cancellation, and after a successful
//! spawn the worker's lifecycle is observable only through the log (a
//! completion observer task records the exit code or signal there). No
//! automation failure is ever surfaced to the caller of the update that
//! fired the trigger.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::Local;
use tokio::process::Command;

use crate::settings::Settings;
use crate::store::UpdateOutcome;

/// The "not started" side of the trigger pair, also the status new tasks
/// are created in.
pub const STATUS_NOT_STARTED: &str = "Backlog";

/// The "ready for work" status that fires the trigger.
pub const STATUS_READY: &str = "To Do";

/// Sub-command passed to the worker ahead of the task id.
const WORKER_SUBCOMMAND: &str = "run";

/// True exactly for the Backlog -> To Do transition (case-insensitive on
/// both sides). The reverse transition, a write of the label a task
/// already had, and any transition not touching this pair never fire.
pub fn should_trigger(outcome: &UpdateOutcome) -> bool {
    outcome.before.status.eq_ignore_ascii_case(STATUS_NOT_STARTED)
        && outcome.after.status.eq_ignore_ascii_case(STATUS_READY)
}

/// Evaluate an update outcome and launch the worker when it fires.
///
/// Returns whether the transition fired (used by tests; callers usually
/// ignore it). Errors never escape: log-open failure skips the spawn,
/// spawn failure is logged and swallowed, and the already-committed update
/// is never rolled back.
pub async fn maybe_launch(settings: &Settings, data_dir: &Path, outcome: &UpdateOutcome) -> bool {
    if !should_trigger(outcome) {
        return false;
    }
    if !settings.automation_enabled {
        tracing::debug!(
            task = outcome.after.id,
            "automation disabled, not launching worker"
        );
        return false;
    }
    launch_worker(settings, data_dir, outcome.after.id).await;
    true
}

async fn launch_worker(settings: &Settings, data_dir: &Path, task_id: u64) {
    use std::io::Write;

    let tokens = split_command(&settings.worker_command);
    let Some((program, args)) = tokens.split_first() else {
        tracing::warn!("worker command is empty, nothing to launch");
        return;
    };

    let log_path = resolve_log_path(data_dir, &settings.log_path);
    let mut log = match open_log(&log_path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(
                path = %log_path.display(),
                error = %e,
                "cannot open worker log, skipping launch"
            );
            return;
        }
    };

    let _ = writeln!(
        log,
        "[{}] launching `{} {} {}`",
        timestamp(),
        settings.worker_command,
        WORKER_SUBCOMMAND,
        task_id
    );

    let (stdout, stderr) = match (log.try_clone(), log.try_clone()) {
        (Ok(out), Ok(err)) => (out, err),
        _ => {
            tracing::warn!(path = %log_path.display(), "cannot clone worker log handle");
            return;
        }
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .arg(WORKER_SUBCOMMAND)
        .arg(task_id.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(program = %program, error = %e, "failed to spawn worker");
            let _ = writeln!(log, "[{}] spawn failed: {}", timestamp(), e);
            return;
        }
    };
    tracing::info!(task = task_id, pid = child.id(), "worker launched");

    // Completion observer: logging only, never awaited by the caller.
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                let line = match (status.code(), signal_of(&status)) {
                    (Some(code), _) => {
                        format!("worker for task {task_id} exited with code {code}")
                    }
                    (None, Some(signal)) => {
                        format!("worker for task {task_id} terminated by signal {signal}")
                    }
                    (None, None) => format!("worker for task {task_id} exited"),
                };
                tracing::info!("{line}");
                let _ = writeln!(log, "[{}] {}", timestamp(), line);
            }
            Err(e) => {
                tracing::warn!(task = task_id, error = %e, "failed to wait on worker");
                let _ = writeln!(log, "[{}] wait failed: {}", timestamp(), e);
            }
        }
    });
}

/// Tokenize a command line the way a shell would: whitespace-separated,
/// with single- and double-quoted segments and backslash escapes.
pub fn split_command(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_token = true;
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    current.push(c);
                }
            }
            '"' => {
                in_token = true;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => match chars.next() {
                            Some(next @ ('"' | '\\')) => current.push(next),
                            Some(next) => {
                                current.push('\\');
                                current.push(next);
                            }
                            None => current.push('\\'),
                        },
                        _ => current.push(c),
                    }
                }
            }
            '\\' => {
                if let Some(next) = chars.next() {
                    in_token = true;
                    current.push(next);
                }
            }
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                in_token = true;
                current.push(c);
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

fn resolve_log_path(data_dir: &Path, log_path: &str) -> PathBuf {
    let path = Path::new(log_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

fn open_log(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(unix)]
fn signal_of(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}
