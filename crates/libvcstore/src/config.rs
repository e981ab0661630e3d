use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{
    committer::{CommitMode, CommitSchedule},
    error::{Result, VcStoreError},
    handler::HandlerOptions,
    script::ScriptExport,
    svn::Credentials,
};

/// Storage configuration, usually read from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Repository credentials. Without them every area is pass-through.
    #[serde(default)]
    pub svn: Option<SvnConfig>,
    /// Background committer settings shared by all areas.
    #[serde(default)]
    pub commits: CommitsConfig,
    /// Storage areas by name.
    #[serde(default)]
    pub areas: BTreeMap<String, AreaConfig>,
}

/// The `[svn]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SvnConfig {
    /// Repository user.
    pub username: String,
    /// Repository password.
    #[serde(default)]
    pub password: String,
}

/// The `[commits]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommitsConfig {
    /// Seconds between committer ticks.
    pub check_interval_secs: u64,
    /// Seconds a tick may spend before it stops starting new commits.
    pub work_budget_secs: u64,
    /// What the committer does with each pending commit.
    pub mode: ModeConfig,
}

impl Default for CommitsConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: CommitSchedule::DEFAULT_CHECK_INTERVAL.as_secs(),
            work_budget_secs: CommitSchedule::DEFAULT_WORK_BUDGET.as_secs(),
            mode: ModeConfig::Execute,
        }
    }
}

/// Configured commit mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeConfig {
    /// Run commits against the repository.
    #[default]
    Execute,
    /// Append commits to a script in each area's directory.
    ExportScript,
}

/// One `[areas.NAME]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaConfig {
    /// Directory served by the area.
    pub dir: PathBuf,
    /// Whether the directory is an svn working copy to commit into.
    #[serde(default)]
    pub versioned: bool,
}

impl Config {
    /// Read and validate a configuration file.
    ///
    /// Relative area directories are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            VcStoreError::Config(format!("Failed to read {}: {err}", path.display()))
        })?;
        let mut config = Self::parse(&contents)
            .map_err(|err| VcStoreError::Config(format!("{}: {err}", path.display())))?;

        if let Some(base) = path.parent() {
            for area in config.areas.values_mut() {
                if area.dir.is_relative() {
                    area.dir = base.join(&area.dir);
                }
            }
        }
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|err| VcStoreError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the committer cannot run with.
    fn validate(&self) -> Result<()> {
        if self.commits.check_interval_secs == 0 {
            return Err(VcStoreError::Config(
                "check_interval_secs must be positive".to_string(),
            ));
        }
        if self.commits.work_budget_secs == 0 {
            return Err(VcStoreError::Config(
                "work_budget_secs must be positive".to_string(),
            ));
        }
        if let Some(svn) = &self.svn
            && svn.username.is_empty()
        {
            return Err(VcStoreError::Config(
                "svn username must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Credentials from the `[svn]` table.
    pub fn credentials(&self) -> Option<Credentials> {
        self.svn
            .as_ref()
            .map(|svn| Credentials::new(&svn.username, &svn.password))
    }

    /// The committer schedule.
    pub fn schedule(&self) -> CommitSchedule {
        CommitSchedule {
            check_interval: Duration::from_secs(self.commits.check_interval_secs),
            work_budget: Duration::from_secs(self.commits.work_budget_secs),
        }
    }

    /// Handler options for an area rooted at `dir`.
    pub fn handler_options(&self, dir: &Path) -> HandlerOptions {
        let mode = match self.commits.mode {
            ModeConfig::Execute => CommitMode::Execute,
            ModeConfig::ExportScript => CommitMode::ExportScript(ScriptExport::in_dir(dir)),
        };
        HandlerOptions {
            schedule: self.schedule(),
            mode,
            ..HandlerOptions::default()
        }
    }
}
