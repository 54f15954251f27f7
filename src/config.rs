//! Database profiles from the JSON config file.
//!
//! ```json
//! {
//!   "db": "pdb",
//!   "database": {
//!     "sdb": { "driver": "sqlite", "dsn": "" },
//!     "pdb": { "driver": "postgres", "dsn": "postgres://localhost/test" }
//!   }
//! }
//! ```

use crate::engine::Driver;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A named connection profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(alias = "dbdriver")]
    pub driver: String,
    #[serde(default)]
    pub dsn: String,
}

impl Database {
    pub fn driver(&self) -> Result<Driver> {
        self.driver.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Profile used when none is named.
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub database: BTreeMap<String, Database>,
}

impl Config {
    /// `<config dir>/flatsql/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("flatsql").join("config.json"))
    }

    /// Load `path`, or the default file when `path` is `None`. Only a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    tracing::debug!("no config file");
                    return Ok(Self::default());
                }
            },
        };
        tracing::debug!(path = %path.display(), "config");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// The profile named `name`, or the default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<Option<&Database>> {
        match name {
            Some(name) => self
                .database
                .get(name)
                .map(Some)
                .ok_or_else(|| Error::Config(format!("database '{}' is not configured", name))),
            None => Ok(self.db.as_deref().and_then(|name| {
                let found = self.database.get(name);
                if found.is_none() {
                    tracing::warn!(db = name, "default database is not configured");
                }
                found
            })),
        }
    }
}
