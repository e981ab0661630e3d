use std::collections::BTreeMap;

use tracing::warn;

use crate::{
    config::Config,
    error::{Result, VcStoreError},
    handler::VersionedFileHandler,
};

/// One handler per configured storage area.
pub struct StorageAreas {
    /// Handlers by area name.
    handlers: BTreeMap<String, VersionedFileHandler>,
}

impl StorageAreas {
    /// Build a handler for every area in `config`.
    ///
    /// Versioned areas use the `[svn]` credentials; asking for one without
    /// credentials is a configuration error.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = config.credentials();
        let mut handlers = BTreeMap::new();

        for (name, area) in &config.areas {
            let handler = if area.versioned {
                let Some(credentials) = credentials.clone() else {
                    return Err(VcStoreError::Config(format!(
                        "area {name} is versioned but no [svn] credentials are configured"
                    )));
                };
                VersionedFileHandler::new(
                    &area.dir,
                    Some(credentials),
                    config.handler_options(&area.dir),
                )?
            } else {
                VersionedFileHandler::pass_through(&area.dir)?
            };
            handlers.insert(name.clone(), handler);
        }

        Ok(Self { handlers })
    }

    /// Handler for the area called `name`.
    pub fn get(&self, name: &str) -> Option<&VersionedFileHandler> {
        self.handlers.get(name)
    }

    /// Handler for `name`, or a configuration error naming the known areas.
    pub fn require(&self, name: &str) -> Result<&VersionedFileHandler> {
        self.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.names().collect();
            VcStoreError::Config(format!(
                "unknown storage area {name} (known: {})",
                known.join(", ")
            ))
        })
    }

    /// Area names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Request shutdown of every area.
    pub fn shutdown_all(&self) {
        for handler in self.handlers.values() {
            handler.shutdown();
        }
    }

    /// Wait for every area's committer to drain.
    ///
    /// Joins all areas even if one fails, then returns the first failure.
    pub fn join_all(&self) -> Result<()> {
        let mut first_error = None;
        for (name, handler) in &self.handlers {
            if let Err(err) = handler.join() {
                warn!(area = %name, error = %err, "failed to join storage area");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
