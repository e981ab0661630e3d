use std::{
    env, fs,
    io::{self, Read},
    path::{Path, PathBuf},
    result::Result as StdResult,
};

use anyhow::{Context, Result};
use libvcstore::{
    Config, ModeConfig, StatusQuery, StorageAreas, SvnClient, SvnConfig, VcStoreError,
    VersionControl, VersionedFileHandler,
};

use tracing::debug;

use crate::{
    args::{Cli, Commands},
    output::{Output, OutputError},
};

/// Emit an output result, mapping errors into `VcStoreError`.
fn emit(result: StdResult<(), OutputError>) -> Result<()> {
    result.map_err(|err| VcStoreError::Io(io::Error::other(err)))?;
    Ok(())
}

/// Handler selected on the command line, with whatever owns it.
enum Store {
    /// A single directory given by `--dir` or the current directory.
    Dir(VersionedFileHandler),
    /// A named area out of the configured storage areas.
    Area {
        /// Every configured area.
        areas: StorageAreas,
        /// The area commands operate on.
        name: String,
    },
}

impl Store {
    /// The handler commands operate on.
    fn handler(&self) -> Result<&VersionedFileHandler> {
        match self {
            Self::Dir(handler) => Ok(handler),
            Self::Area { areas, name } => Ok(areas.require(name)?),
        }
    }

    /// Shut down and wait until every queued commit has been applied or dropped.
    fn drain(&self) -> Result<()> {
        match self {
            Self::Dir(handler) => {
                handler.shutdown();
                handler.join()?;
            }
            Self::Area { areas, .. } => {
                areas.shutdown_all();
                areas.join_all()?;
            }
        }
        Ok(())
    }
}

/// Load the configuration and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(username) = &cli.username {
        config.svn = Some(SvnConfig {
            username: username.clone(),
            password: cli.password.clone().unwrap_or_default(),
        });
    }
    if let Some(secs) = cli.interval_secs {
        if secs == 0 {
            return Err(VcStoreError::Config("--interval-secs must be positive".to_string()).into());
        }
        config.commits.check_interval_secs = secs;
    }
    if cli.export_script {
        config.commits.mode = ModeConfig::ExportScript;
    }
    if cli.pass_through {
        config.svn = None;
        for area in config.areas.values_mut() {
            area.versioned = false;
        }
    }

    Ok(config)
}

/// Open the storage selected by `--area` or `--dir`.
fn open_store(cli: &Cli, config: &Config) -> Result<Store> {
    if let Some(name) = &cli.area {
        let areas = StorageAreas::from_config(config)?;
        let handler = areas.require(name)?;
        debug!(area = %name, dir = %handler.files_dir().display(), "opened storage area");
        return Ok(Store::Area {
            areas,
            name: name.clone(),
        });
    }

    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("Failed to determine current directory")?,
    };
    let options = config.handler_options(&dir);
    let handler = VersionedFileHandler::new(&dir, config.credentials(), options)?;
    debug!(dir = %handler.files_dir().display(), versioned = handler.is_versioned(), "opened storage");
    Ok(Store::Dir(handler))
}

/// Execute the selected command.
pub fn run(cli: Cli, output: &dyn Output) -> Result<()> {
    let config = load_config(&cli)?;
    let store = open_store(&cli, &config)?;
    let result = store
        .handler()
        .and_then(|handler| execute(&cli.command, &config, output, handler));
    finish(&store, result)?;
    summarize(output, store.handler()?)
}

/// Apply one command to `handler` without waiting for its commit.
fn execute(
    command: &Commands,
    config: &Config,
    output: &dyn Output,
    handler: &VersionedFileHandler,
) -> Result<()> {
    match command {
        Commands::Commit { path, message } => {
            handler.commit_version(path, message)?;
            report(output, handler, &format!("committing {}", path.display()))
        }
        Commands::Move { old, new, message } => {
            handler.move_versioned_file(old, new, message)?;
            report(
                output,
                handler,
                &format!("moved {} to {}", old.display(), new.display()),
            )
        }
        Commands::Delete { path, message } => {
            handler.delete_versioned_file(path, message)?;
            report(output, handler, &format!("deleted {}", path.display()))
        }
        Commands::Write {
            path,
            from,
            message,
        } => {
            let contents = read_source(from)?;
            handler.write_file(path, contents, message)?;
            report(output, handler, &format!("wrote {}", path.display()))
        }
        Commands::Status { paths } => status(output, handler, config, paths),
    }
}

/// Drain the store, then surface the command's error ahead of any drain error.
///
/// The drain runs whatever `result` holds, so committers are always joined.
fn finish(store: &Store, result: Result<()>) -> Result<()> {
    let drained = store.drain();
    result?;
    drained
}

/// Describe what happened synchronously.
fn report(output: &dyn Output, handler: &VersionedFileHandler, action: &str) -> Result<()> {
    if handler.is_versioned() {
        emit(output.message(action))
    } else {
        emit(output.success(&format!("{action} (not versioned)")))
    }
}

/// Report the committer's outcome after draining.
fn summarize(output: &dyn Output, handler: &VersionedFileHandler) -> Result<()> {
    let Some(stats) = handler.stats() else {
        return Ok(());
    };
    if stats.dropped > 0 {
        return Err(VcStoreError::Commit(format!(
            "{} of {} queued commits failed",
            stats.dropped, stats.enqueued
        ))
        .into());
    }
    if stats.enqueued == 0 {
        emit(output.message("nothing to commit"))
    } else {
        emit(output.success(&format!("{} commit(s) applied", stats.committed)))
    }
}

/// Read new file contents from `source`, where `-` means stdin.
fn read_source(source: &Path) -> Result<Vec<u8>> {
    if source == Path::new("-") {
        let mut contents = Vec::new();
        io::stdin()
            .read_to_end(&mut contents)
            .context("Failed to read stdin")?;
        return Ok(contents);
    }
    fs::read(source).with_context(|| format!("Failed to read {}", source.display()))
}

/// Print the working-copy status of each path.
fn status(
    output: &dyn Output,
    handler: &VersionedFileHandler,
    config: &Config,
    paths: &[PathBuf],
) -> Result<()> {
    let client = SvnClient::new(config.credentials());
    let section = output.section(&handler.files_dir().display().to_string());
    for path in paths {
        let resolved = handler.resolve(path)?;
        let query = client
            .status(&resolved)
            .with_context(|| format!("Failed to query status of {}", resolved.display()))?;
        emit(section.item(&path.display().to_string(), &describe(query)))?;
    }
    Ok(())
}

/// Human-readable form of a status query.
fn describe(query: StatusQuery) -> String {
    match query {
        StatusQuery::Tracked(status) => status.to_string(),
        StatusQuery::NotTracked => "not tracked".to_string(),
        StatusQuery::OutsideTree => "outside working copy".to_string(),
    }
}
