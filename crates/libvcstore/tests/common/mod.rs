use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
    thread,
    time::Duration,
};

use anyhow::{Context, Result, bail, ensure};
use libvcstore::VersionedFileHandler;
use tempfile::TempDir;

/// Whether the svn client and admin tools are installed.
fn svn_available() -> bool {
    ["svn", "svnadmin"].iter().all(|program| {
        Command::new(program)
            .arg("--version")
            .output()
            .is_ok_and(|output| output.status.success())
    })
}

/// True when svn is missing, after noting that `test` is skipped.
pub fn svn_missing(test: &str) -> bool {
    let missing = !svn_available();
    if missing {
        eprintln!("svn not installed; skipping {test}");
    }
    missing
}

/// Run a command, ensuring it succeeds.
pub fn run(program: &str, args: &[&str]) -> Result<Output> {
    let output = Command::new(program)
        .env("LC_ALL", "C")
        .args(args)
        .output()
        .with_context(|| format!("failed to run {program} {}", args.join(" ")))?;

    ensure!(
        output.status.success(),
        "command failed: {program} {}\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(output)
}

/// Run svn against `path` and return its stdout.
pub fn svn(args: &[&str], path: &Path) -> Result<String> {
    let path = path.to_string_lossy();
    let mut full = args.to_vec();
    full.push(&path);
    let output = run("svn", &full)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Create a fresh repository and a checkout of it. Returns the temp dir and the
/// working-copy root.
pub fn create_working_copy() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let repo = temp_dir.path().join("repo");
    let wc = temp_dir.path().join("wc");

    run("svnadmin", &["create", &repo.to_string_lossy()])?;
    let url = format!("file://{}", repo.display());
    run("svn", &["checkout", "--quiet", &url, &wc.to_string_lossy()])?;

    Ok((temp_dir, wc))
}

/// Wait until the handler's committer has applied `count` commits.
pub fn wait_for_commits(handler: &VersionedFileHandler, count: u64) -> Result<()> {
    for _ in 0..500 {
        if handler.stats().is_some_and(|stats| stats.committed >= count) {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(10));
    }
    bail!("timed out waiting for {count} commits")
}
