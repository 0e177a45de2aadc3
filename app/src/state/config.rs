//! Configuration loading and persistence.
//!
//! Handles the TOML config file (~/.config/rallymetric/config.toml) and
//! resolves the directories the app reads from and writes to.

use std::path::{Path, PathBuf};

pub use rallymetric::RallymetricConfig;
use thiserror::Error;

use super::storage::{FileKeyValueStore, KeyValueStore, StorageError};

const CONFIG_HEADER: &str = "# rallymetric settings; command-line flags take precedence.\n";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config path {0} has no file name")]
    NoFileName(PathBuf),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config: {0}")]
    Write(#[from] StorageError),
}

// ---------------------------------------------------------------------------
// Default locations
// ---------------------------------------------------------------------------

/// Returns `~/.config/rallymetric/config.toml`.
pub fn default_config_path() -> PathBuf {
    let dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rallymetric");
    dir.join("config.toml")
}

/// Returns `~/.local/share/rallymetric` (platform equivalent elsewhere).
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rallymetric")
}

/// Data directory: command-line override, then config, then platform default.
pub fn resolve_data_dir(config: &RallymetricConfig, cli: Option<&Path>) -> PathBuf {
    cli.map(Path::to_path_buf)
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(default_data_dir)
}

/// Export directory: command-line override, then config, then the working
/// directory.
pub fn resolve_export_dir(config: &RallymetricConfig, cli: Option<&Path>) -> PathBuf {
    cli.map(Path::to_path_buf)
        .or_else(|| config.export_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

// ---------------------------------------------------------------------------
// Persistence I/O
// ---------------------------------------------------------------------------

/// Load persisted config from disk. If the file does not exist, creates it
/// with all-defaults and returns that. An unreadable or malformed file is
/// reported and replaced by defaults in memory only.
pub fn load(path: &Path) -> RallymetricConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<RallymetricConfig>(&contents) {
            Ok(config) => {
                tracing::debug!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("failed to parse {}: {e}", path.display());
                RallymetricConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let defaults = RallymetricConfig::default();
            tracing::info!("no config file found, creating {}", path.display());
            if let Err(e) = save_to(path, &defaults) {
                tracing::warn!("{e}");
            }
            defaults
        }
        Err(e) => {
            tracing::warn!("failed to read {}: {e}", path.display());
            RallymetricConfig::default()
        }
    }
}

/// Write `config` to `path`, creating the parent directory if needed. Goes
/// through the same temp-file-and-rename write as saved games.
pub fn save_to(path: &Path, config: &RallymetricConfig) -> Result<(), ConfigError> {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return Err(ConfigError::NoFileName(path.to_path_buf()));
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let contents = format!("{CONFIG_HEADER}{}", toml::to_string_pretty(config)?);
    FileKeyValueStore::new(dir).set(file_name, &contents)?;
    tracing::debug!("wrote config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_creates_missing_file_with_defaults() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rallymetric").join("config.toml");

        // Act
        let config = load(&path);

        // Assert
        assert_eq!(config, RallymetricConfig::default());
        assert!(path.exists());
        assert_eq!(load(&path), config);
    }

    #[test]
    fn test_load_reads_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = \"/srv/stats\"\nseed_new_games = false\n").unwrap();

        let config = load(&path);

        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/stats")));
        assert!(!config.seed_new_games);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults_and_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[[[ not toml").unwrap();

        assert_eq!(load(&path), RallymetricConfig::default());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[[[ not toml");
    }

    #[test]
    fn test_save_to_writes_header_and_leaves_no_temp_file() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = RallymetricConfig {
            export_dir: Some(PathBuf::from("/tmp/csv")),
            seed_new_games: false,
            ..RallymetricConfig::default()
        };

        // Act
        save_to(&path, &config).unwrap();

        // Assert
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(CONFIG_HEADER));
        assert_eq!(load(&path), config);
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, ["config.toml"]);
    }

    #[test]
    fn test_save_to_rejects_path_without_file_name() {
        let err = save_to(Path::new("/"), &RallymetricConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::NoFileName(_)));
    }

    #[test]
    fn test_cli_override_beats_config_dir() {
        let config = RallymetricConfig {
            data_dir: Some(PathBuf::from("/from/config")),
            ..RallymetricConfig::default()
        };

        assert_eq!(
            resolve_data_dir(&config, Some(Path::new("/from/cli"))),
            PathBuf::from("/from/cli")
        );
        assert_eq!(resolve_data_dir(&config, None), PathBuf::from("/from/config"));
        assert_eq!(
            resolve_export_dir(&RallymetricConfig::default(), None),
            PathBuf::from(".")
        );
    }

    #[test]
    fn test_default_paths_end_in_app_dir() {
        assert!(default_config_path().ends_with("rallymetric/config.toml"));
        assert!(default_data_dir().ends_with("rallymetric"));
    }
}
