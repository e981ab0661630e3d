use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use anyhow::{Context, Result};

use crate::{
    plan::CommitDepth,
    status::{PathStatus, StatusQuery},
    vcs::VersionControl,
};

/// Error code svn reports for a path that is not inside a working copy.
const NOT_A_WORKING_COPY: &str = "155007";
/// Warning code svn reports for a path the working copy has no node for.
const NODE_NOT_FOUND: &str = "W155010";

/// Username and password passed to every svn invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Repository username.
    pub username: String,
    /// Repository password; may be empty.
    pub password: String,
}

impl Credentials {
    /// Create credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// [`VersionControl`] backed by the `svn` command-line client.
#[derive(Debug, Clone)]
pub struct SvnClient {
    /// Program to execute, normally `svn` from `PATH`.
    program: PathBuf,
    /// Credentials used for repository access, if any.
    credentials: Option<Credentials>,
}

impl SvnClient {
    /// Create a client that runs `svn` from `PATH`.
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            program: PathBuf::from("svn"),
            credentials,
        }
    }

    /// Use a different svn executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Build an svn command for `subcommand` with the given options and path operands.
    fn command(&self, subcommand: &str, options: &[&str], paths: &[&Path]) -> Command {
        let mut command = Command::new(&self.program);
        // Message parsing relies on untranslated output.
        command.env("LC_ALL", "C");
        command.arg(subcommand).arg("--non-interactive");
        if let Some(credentials) = &self.credentials {
            command
                .arg("--username")
                .arg(&credentials.username)
                .arg("--password")
                .arg(&credentials.password)
                .arg("--no-auth-cache");
        }
        command.args(options).arg("--");
        for path in paths {
            command.arg(peg_safe(path));
        }
        command
    }

    /// Run an svn command and return its output whatever the exit status.
    fn output(&self, subcommand: &str, options: &[&str], paths: &[&Path]) -> Result<Output> {
        self.command(subcommand, options, paths)
            .output()
            .with_context(|| {
                format!(
                    "Failed to execute svn command: {}",
                    describe(subcommand, options, paths)
                )
            })
    }

    /// Run an svn command, returning an error with the full command details if it fails.
    fn run_svn(&self, subcommand: &str, options: &[&str], paths: &[&Path]) -> Result<Output> {
        let output = self.output(subcommand, options, paths)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Svn command failed: {}\nError: {}",
                describe(subcommand, options, paths),
                stderr.trim()
            );
        }

        Ok(output)
    }
}

impl VersionControl for SvnClient {
    fn is_working_copy(&self, dir: &Path) -> Result<bool> {
        let output = self.output("info", &["--depth=empty"], &[dir])?;
        Ok(output.status.success())
    }

    fn status(&self, path: &Path) -> Result<StatusQuery> {
        let output = self.output("status", &["--depth=empty"], &[path])?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if let Some(query) = classify_failure(&stderr) {
            return Ok(query);
        }
        if !output.status.success() {
            anyhow::bail!(
                "Svn status failed for {}\nError: {}",
                path.display(),
                stderr.trim()
            );
        }

        parse_status(&String::from_utf8_lossy(&output.stdout))
    }

    fn add(&self, path: &Path) -> Result<()> {
        self.run_svn(
            "add",
            &["--force", "--depth=empty", "--parents"],
            &[path],
        )?;
        Ok(())
    }

    fn move_path(&self, from: &Path, to: &Path) -> Result<()> {
        self.run_svn("move", &["--parents"], &[from, to])?;
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        self.run_svn("delete", &["--force"], &[path])?;
        Ok(())
    }

    fn commit(&self, paths: &[PathBuf], depth: CommitDepth, message: &str) -> Result<()> {
        let operands: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        self.run_svn("commit", &[depth.as_arg(), "-m", message], &operands)?;
        Ok(())
    }

    fn update(&self, path: &Path) -> Result<()> {
        self.run_svn("update", &["--depth=infinity"], &[path])?;
        Ok(())
    }
}

/// Render a command line for error messages. Credentials are never included.
fn describe(subcommand: &str, options: &[&str], paths: &[&Path]) -> String {
    let mut parts = vec!["svn".to_string(), subcommand.to_string()];
    parts.extend(options.iter().map(|opt| opt.to_string()));
    parts.extend(paths.iter().map(|path| path.display().to_string()));
    parts.join(" ")
}

/// Protect a path operand from peg-revision parsing.
///
/// svn reads everything after the last `@` as a peg revision, so a trailing `@`
/// is appended to any path that contains one.
fn peg_safe(path: &Path) -> OsString {
    let mut operand = path.as_os_str().to_os_string();
    if path.to_string_lossy().contains('@') {
        operand.push("@");
    }
    operand
}

/// Recognize the failures that mean "no status available" rather than a real error.
fn classify_failure(stderr: &str) -> Option<StatusQuery> {
    if stderr.contains(NOT_A_WORKING_COPY) {
        Some(StatusQuery::OutsideTree)
    } else if stderr.contains(NODE_NOT_FOUND) {
        Some(StatusQuery::NotTracked)
    } else {
        None
    }
}

/// Parse `svn status --depth=empty` output for a single path.
fn parse_status(stdout: &str) -> Result<StatusQuery> {
    let Some(line) = stdout
        .lines()
        .find(|line| !line.trim().is_empty() && !line.starts_with("---"))
    else {
        // svn prints nothing for an unmodified, versioned path.
        return Ok(StatusQuery::Tracked(PathStatus::Clean));
    };

    let mut columns = line.chars();
    let item = columns.next().unwrap_or(' ');
    let props = columns.next().unwrap_or(' ');

    let status = match (item, props) {
        ('?' | 'I', _) => return Ok(StatusQuery::NotTracked),
        ('A', _) => PathStatus::Added,
        ('M', _) => PathStatus::Modified,
        ('R', _) => PathStatus::Replaced,
        ('D' | '!', _) => PathStatus::Deleted,
        (' ', 'M') => PathStatus::Modified,
        (' ', ' ') => PathStatus::Clean,
        _ => anyhow::bail!("Unsupported svn status line: {line}"),
    };
    Ok(StatusQuery::Tracked(status))
}
