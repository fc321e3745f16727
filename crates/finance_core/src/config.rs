//! User settings and data-directory resolution.
//!
//! # Responsibility
//! - Resolve where settings and logs live.
//! - Persist the last opened database file between runs.
//!
//! Directory resolution order:
//! 1. `FINANCE_TRACKER_DATA_DIR` environment variable.
//! 2. Platform config directory from `directories::ProjectDirs`.

use crate::logging::default_log_level;
use crate::service::balance::DEFAULT_ALLOWANCE;
use directories::ProjectDirs;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "FINANCE_TRACKER_DATA_DIR";
/// File name suggested for a new database.
pub const DEFAULT_DATABASE_FILE: &str = "Finance.sqlite";

const SETTINGS_FILE: &str = "settings.json";
const LOG_DIR: &str = "logs";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// No home directory to derive a config directory from.
    NoHomeDir,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "settings io error: {err}"),
            Self::Json(err) => write!(f, "settings file is not valid json: {err}"),
            Self::NoHomeDir => write!(
                f,
                "cannot determine a config directory; set {DATA_DIR_ENV}"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::NoHomeDir => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Locations derived from one base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    base_dir: PathBuf,
}

impl DataPaths {
    pub fn resolve() -> ConfigResult<Self> {
        if let Some(custom) = std::env::var_os(DATA_DIR_ENV) {
            return Ok(Self::with_base_dir(custom));
        }
        let dirs = ProjectDirs::from("", "", "finance-tracker").ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::with_base_dir(dirs.config_dir()))
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.base_dir.join(LOG_DIR)
    }

    pub fn default_database_file(&self) -> PathBuf {
        self.base_dir.join(DEFAULT_DATABASE_FILE)
    }

    pub fn ensure_directories(&self) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}

/// Persisted user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Database opened by the last session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_level")]
    pub log_level: String,
    /// Opening balance for months without a budget.
    #[serde(default = "default_allowance")]
    pub default_allowance: f64,
}

fn default_level() -> String {
    default_log_level().to_string()
}

fn default_allowance() -> f64 {
    DEFAULT_ALLOWANCE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_level(),
            default_allowance: default_allowance(),
        }
    }
}

impl Settings {
    /// Reads the settings file, or returns defaults when it does not exist.
    pub fn load(paths: &DataPaths) -> ConfigResult<Self> {
        let file = paths.settings_file();
        if !file.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&file)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, paths: &DataPaths) -> ConfigResult<()> {
        paths.ensure_directories()?;
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.settings_file(), contents)?;
        Ok(())
    }

    /// Records `path` as the last opened database and saves.
    pub fn remember_database(
        &mut self,
        paths: &DataPaths,
        path: impl Into<PathBuf>,
    ) -> ConfigResult<()> {
        let path = path.into();
        info!(
            "event=settings_remember_db module=config status=ok path={}",
            path.display()
        );
        self.database_path = Some(path);
        self.save(paths)
    }
}
