use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Persisted config types
// ---------------------------------------------------------------------------

/// Top-level persisted config. Every field is optional in the TOML file so a
/// hand-edited file with only the keys someone cares about still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RallymetricConfig {
    /// Where game data lives. None = the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Where `export` writes CSV files. None = the working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
    /// Copy the roster (names and positions) of the latest game into every
    /// new game.
    #[serde(default = "default_true")]
    pub seed_new_games: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RallymetricConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            export_dir: None,
            seed_new_games: default_true(),
        }
    }
}
