//! Git metadata collection via a bounded-timeout subprocess (§4.2, §5).
//!
//! Failure here is always non-fatal: every public function returns an
//! `Option`/default rather than propagating an error, mirroring the
//! spec's "failure is non-fatal and yields `is_git_repo=false`" rule.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs `git <args>` in `cwd` with a bounded timeout, returning trimmed
/// stdout on success. Any failure — git missing, non-zero exit, timeout —
/// yields `None`.
fn git_cmd(cwd: &Path, args: &[&str]) -> Option<String> {
    git_cmd_with_timeout(cwd, args, DEFAULT_GIT_TIMEOUT)
}

fn git_cmd_with_timeout(cwd: &Path, args: &[&str], timeout: Duration) -> Option<String> {
    let mut child = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    let (tx, rx) = mpsc::channel();
    let mut stdout = child.stdout.take();
    std::thread::spawn(move || {
        use std::io::Read;
        let mut buf = String::new();
        if let Some(out) = stdout.as_mut() {
            let _ = out.read_to_string(&mut buf);
        }
        let _ = tx.send(buf);
    });

    let status = match wait_with_timeout(&mut child, timeout) {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return None;
        }
    };

    if !status.success() {
        return None;
    }

    rx.recv_timeout(Duration::from_secs(1)).ok().map(|s| s.trim().to_string())
}

fn wait_with_timeout(child: &mut std::process::Child, timeout: Duration) -> Option<std::process::ExitStatus> {
    let start = std::time::Instant::now();
    loop {
        if let Ok(Some(status)) = child.try_wait() {
            return Some(status);
        }
        if start.elapsed() >= timeout {
            return None;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Whether `path` is inside a git working tree.
#[must_use]
pub fn is_git_repo(path: &Path) -> bool {
    git_cmd(path, &["rev-parse", "--is-inside-work-tree"])
        .is_some_and(|out| out == "true")
}

/// The git top-level directory enclosing `path`, if any.
#[must_use]
pub fn find_toplevel(path: &Path) -> Option<std::path::PathBuf> {
    git_cmd(path, &["rev-parse", "--show-toplevel"]).map(std::path::PathBuf::from)
}

/// The current branch name, or `None` if detached or unavailable.
#[must_use]
pub fn current_branch(path: &Path) -> Option<String> {
    git_cmd(path, &["rev-parse", "--abbrev-ref", "HEAD"])
        .filter(|b| b != "HEAD")
}

/// The full `HEAD` commit hash.
#[must_use]
pub fn head_commit(path: &Path) -> Option<String> {
    git_cmd(path, &["rev-parse", "HEAD"])
}

/// Files touched by commits within the last `days` days, deduplicated.
/// Used to build `recent_commit_file_set` (§4.2, feeds the git-activity
/// scoring factor in §4.3).
#[must_use]
pub fn recent_commit_files(path: &Path, days: u32) -> Vec<String> {
    let since = format!("--since={days}.days");
    let Some(out) = git_cmd(path, &["log", &since, "--name-only", "--pretty=format:"]) else {
        return Vec::new();
    };

    let mut files: Vec<String> = out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ToString::to_string)
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Per-file commit counts within the lookback window, used by the git
/// activity scoring factor to scale its signal by commit frequency.
#[must_use]
pub fn commit_counts(path: &Path, days: u32) -> std::collections::HashMap<String, u32> {
    let since = format!("--since={days}.days");
    let Some(out) = git_cmd(path, &["log", &since, "--name-only", "--pretty=format:"]) else {
        return std::collections::HashMap::new();
    };

    let mut counts = std::collections::HashMap::new();
    for line in out.lines().map(str::trim).filter(|l| !l.is_empty()) {
        *counts.entry(line.to_string()).or_insert(0u32) += 1;
    }
    counts
}
