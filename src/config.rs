use std::path::PathBuf;

use anyhow::Result;
use tracing::level_filters::LevelFilter;

use crate::utils::dir::create_application_default_path;

const STORAGE_DIR_NAME: &str = "storage";
const BACKUP_DIR_NAME: &str = "backups";

/// Settings resolved once at startup from command line flags and their environment fallbacks.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Holds persisted stores, logs and default backups.
    pub data_dir: PathBuf,
    /// Base URL of the GitHub REST API. Differs for GitHub Enterprise.
    pub api_host: String,
    pub log_level: Option<LevelFilter>,
    pub log_to_console: bool,
}

impl AppConfig {
    pub fn resolve(
        dir: Option<PathBuf>,
        api_host: String,
        log_level: Option<LevelFilter>,
        log_to_console: bool,
    ) -> Result<Self> {
        let data_dir = match dir {
            Some(dir) => {
                std::fs::create_dir_all(&dir)?;
                dir
            }
            None => create_application_default_path()?,
        };
        Ok(Self {
            data_dir,
            api_host,
            log_level,
            log_to_console,
        })
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join(STORAGE_DIR_NAME)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join(BACKUP_DIR_NAME)
    }
}
