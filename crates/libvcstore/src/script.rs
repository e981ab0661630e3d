use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::plan::PendingCommit;

/// File name of the export script inside the working copy.
pub const SCRIPT_FILE_NAME: &str = "svn_commit_commands.sh";

/// Appends the svn commands equivalent to each pending commit to a shell script
/// instead of running them, so an operator can replay them by hand.
#[derive(Debug, Clone)]
pub struct ScriptExport {
    /// Script file that receives the commands.
    path: PathBuf,
}

impl ScriptExport {
    /// Export into `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Export into the default script file inside `files_dir`.
    pub fn in_dir(files_dir: &Path) -> Self {
        Self::new(files_dir.join(SCRIPT_FILE_NAME))
    }

    /// Location of the script.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the commit and update commands for `entry`.
    pub fn append(&self, entry: &PendingCommit) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open export script {}", self.path.display()))?;
        file.write_all(render(entry).as_bytes())
            .with_context(|| format!("Failed to write export script {}", self.path.display()))?;
        Ok(())
    }
}

/// Render the two command lines for one pending commit.
fn render(entry: &PendingCommit) -> String {
    let mut commit = format!(
        "svn commit {} -m {} --",
        entry.depth.as_arg(),
        shell_quote(&entry.message)
    );
    for path in &entry.paths {
        commit.push(' ');
        commit.push_str(&shell_quote(&path.to_string_lossy()));
    }
    format!(
        "{commit}\nsvn update --depth=infinity -- {}\n",
        shell_quote(&entry.refresh_root.to_string_lossy())
    )
}

/// Quote `value` for a POSIX shell using single quotes.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
