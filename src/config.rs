//! Runtime configuration: data directory plus an optional `config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::controller::DEFAULT_DELETE_DELAY;
use crate::error::ConfigError;
use crate::filter::Filter;
use crate::store::FileStorage;

const DATA_DIR: &str = ".taskboard";
const CONFIG_FILE: &str = "config.toml";
const LOG_FILE: &str = "taskboard.log";
pub const DEFAULT_STORAGE_KEY: &str = "tasks";

/// Keys accepted in `config.toml`. Everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct FileConfig {
    storage_key: Option<String>,
    delete_delay_ms: Option<u64>,
    default_filter: Option<Filter>,
    log_level: Option<String>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub delete_delay: Duration,
    pub default_filter: Filter,
    pub log_level: Option<String>,
}

impl Config {
    /// Resolve the data directory, create it, then layer the config file on top of
    /// the defaults.
    ///
    /// A missing `<data_dir>/config.toml` is fine; an explicit `--config` path must exist.
    pub fn resolve(data_dir: Option<&Path>, config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let data_dir = data_dir.map(Path::to_path_buf).unwrap_or_else(default_data_dir);
        fs::create_dir_all(&data_dir).map_err(|source| ConfigError::DataDir {
            path: data_dir.clone(),
            source,
        })?;

        let file = match config_path {
            Some(path) => read_file(path)?,
            None => {
                let path = data_dir.join(CONFIG_FILE);
                if path.exists() {
                    read_file(&path)?
                } else {
                    FileConfig::default()
                }
            }
        };

        Ok(Config {
            data_dir,
            storage_key: file
                .storage_key
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
            delete_delay: file
                .delete_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_DELETE_DELAY),
            default_filter: file.default_filter.unwrap_or_default(),
            log_level: file.log_level,
        })
    }

    pub fn storage(&self) -> FileStorage {
        FileStorage::new(&self.data_dir)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }
}

/// `$HOME/.taskboard`, or `./.taskboard` when `HOME` is unset.
pub fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(DATA_DIR)
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("nested/data");
        let cfg = Config::resolve(Some(&data), None).unwrap();
        assert!(data.is_dir());
        assert_eq!(cfg.storage_key, "tasks");
        assert_eq!(cfg.delete_delay, Duration::from_millis(300));
        assert_eq!(cfg.default_filter, Filter::All);
        assert_eq!(cfg.log_level, None);
        assert_eq!(cfg.storage().path_for("tasks"), data.join("tasks.json"));
    }

    #[test]
    fn file_in_data_dir_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "storage-key = \"work\"\ndelete-delay-ms = 0\ndefault-filter = \"overdue\"\nlog-level = \"debug\"\n",
        )
        .unwrap();
        let cfg = Config::resolve(Some(dir.path()), None).unwrap();
        assert_eq!(cfg.storage_key, "work");
        assert_eq!(cfg.delete_delay, Duration::ZERO);
        assert_eq!(cfg.default_filter, Filter::Overdue);
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn malformed_or_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "default-filter = \"someday\"").unwrap();
        assert!(matches!(
            Config::resolve(Some(dir.path()), Some(&bad)),
            Err(ConfigError::Parse { .. })
        ));
        fs::write(&bad, "delete-delay = 10").unwrap();
        assert!(matches!(
            Config::resolve(Some(dir.path()), Some(&bad)),
            Err(ConfigError::Parse { .. })
        ));
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Config::resolve(Some(dir.path()), Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}
