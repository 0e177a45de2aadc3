//! Persistence adapter: games and the current-game pointer over a
//! key-value store.
//!
//! Two independent entries: `rallymetric-games` holds every game as one JSON
//! object, `rallymetric-current-game` holds the bare id of the active game.
//! Every save rewrites the whole entry.

use std::path::{Path, PathBuf};

use rallymetric::{GameId, GameMap};
use thiserror::Error;

pub const GAMES_KEY: &str = "rallymetric-games";
pub const CURRENT_GAME_KEY: &str = "rallymetric-current-game";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize games: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String-keyed, string-valued local storage.
pub trait KeyValueStore {
    /// `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// One file per key inside a data directory. The directory is created on the
/// first write.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;

        // Temp file, then rename over the target.
        let path = self.path(key);
        let tmp = self.dir.join(format!(".{key}.tmp"));
        std::fs::write(&tmp, value).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StorageError::Io { path, source })
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MemoryKeyValueStore {
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Game repository
// ---------------------------------------------------------------------------

/// Reads and writes the game collection and current-game pointer.
pub struct GameRepository<S> {
    kv: S,
}

impl<S: KeyValueStore> GameRepository<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn backend(&self) -> &S {
        &self.kv
    }

    /// Load every persisted game. Never fails: a missing entry, an unreadable
    /// entry, or a malformed blob all yield an empty collection. Games saved
    /// under an older stat schema are upgraded in memory.
    pub fn load(&self) -> GameMap {
        let contents = match self.kv.get(GAMES_KEY) {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                tracing::info!("no saved games found");
                return GameMap::new();
            }
            Err(e) => {
                tracing::warn!("failed to read saved games: {e}");
                return GameMap::new();
            }
        };

        let mut games = match serde_json::from_str::<GameMap>(&contents) {
            Ok(games) => games,
            Err(e) => {
                tracing::warn!("failed to parse saved games, starting empty: {e}");
                return GameMap::new();
            }
        };

        for game in games.values_mut() {
            let upgrade = game.upgrade();
            if upgrade.changed() {
                tracing::info!(
                    "upgraded game '{}' from schema {} ({} stats backfilled)",
                    game.id,
                    upgrade.from,
                    upgrade.backfilled
                );
            }
        }
        tracing::debug!("loaded {} games", games.len());
        games
    }

    /// Overwrite the persisted collection with `games`.
    pub fn save(&mut self, games: &GameMap) -> Result<(), StorageError> {
        let contents = serde_json::to_string(games)?;
        self.kv.set(GAMES_KEY, &contents)
    }

    pub fn load_current_game_id(&self) -> Option<GameId> {
        match self.kv.get(CURRENT_GAME_KEY) {
            Ok(Some(id)) => {
                let id = id.trim();
                (!id.is_empty()).then(|| GameId::from(id))
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("failed to read current game: {e}");
                None
            }
        }
    }

    pub fn save_current_game_id(&mut self, id: &GameId) -> Result<(), StorageError> {
        self.kv.set(CURRENT_GAME_KEY, id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rallymetric::{Game, Player, Position, StatKey, StatSchema};
    use tempfile::TempDir;

    use super::*;

    fn sample_games() -> GameMap {
        let date = Utc.timestamp_millis_opt(1_740_853_800_123).unwrap();
        let mut game = Game::new(GameId::from_timestamp(date), date);
        let mut sam = Player::new("p1".into(), "Sam", Position::Hitter);
        sam.playing = true;
        sam.stats.adjust(StatKey::Kills, 3);
        game.players.insert(sam.id.clone(), sam);
        game.players.insert(
            "p2".into(),
            Player::new("p2".into(), "Lee", Position::Other("Libero".into())),
        );
        let mut games = GameMap::new();
        games.insert(game.id.clone(), game);
        games
    }

    #[test]
    fn test_load_with_nothing_saved_is_empty() {
        let repo = GameRepository::new(MemoryKeyValueStore::default());
        assert!(repo.load().is_empty());
        assert_eq!(repo.load_current_game_id(), None);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        // Arrange
        let games = sample_games();
        let mut repo = GameRepository::new(MemoryKeyValueStore::default());

        // Act
        repo.save(&games).unwrap();
        let loaded = repo.load();

        // Assert
        assert_eq!(loaded, games);
        let order: Vec<&str> = loaded
            .values()
            .next()
            .unwrap()
            .players
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(order, ["p1", "p2"]);
    }

    #[test]
    fn test_date_is_stored_as_string_and_restored() {
        let games = sample_games();
        let mut repo = GameRepository::new(MemoryKeyValueStore::default());
        repo.save(&games).unwrap();

        let raw = repo.backend().get(GAMES_KEY).unwrap().unwrap();
        assert!(raw.contains("\"date\":\"2025-03-01T18:30:00.123Z\""));
        let loaded = repo.load();
        let game = loaded.values().next().unwrap();
        assert_eq!(game.date.timestamp_millis(), 1_740_853_800_123);
    }

    #[test]
    fn test_malformed_blob_falls_back_to_empty() {
        let kv = MemoryKeyValueStore::default().with_entry(GAMES_KEY, "{not json");
        let repo = GameRepository::new(kv);
        assert!(repo.load().is_empty());
    }

    #[test]
    fn test_legacy_games_are_backfilled_on_load() {
        let legacy = r#"{"2024-09-14T17:00:00.000Z":{
            "id":"2024-09-14T17:00:00.000Z","name":"9/14/2024 01:00 PM",
            "date":"2024-09-14T17:00:00.000Z",
            "players":{"1726333200000":{"id":"1726333200000","name":"Ria","position":"Setter",
            "playing":true,"stats":{"aces":1,"serves":6,"digs":2,"sets":9,"hits":0,"kills":0,"blocks":0}}}}}"#;
        let repo = GameRepository::new(MemoryKeyValueStore::default().with_entry(GAMES_KEY, legacy));

        let games = repo.load();

        let game = games.get("2024-09-14T17:00:00.000Z").unwrap();
        assert_eq!(game.schema, Some(StatSchema::CURRENT));
        let ria = game.player("1726333200000").unwrap();
        assert_eq!(ria.stats.get(StatKey::Sets), 9);
        assert!(StatSchema::CURRENT.keys().iter().all(|k| ria.stats.contains(*k)));
    }

    #[test]
    fn test_null_stat_in_one_game_keeps_every_game() {
        // Arrange
        let blob = r#"{
            "2024-09-14T17:00:00.000Z":{"id":"2024-09-14T17:00:00.000Z","name":"old",
                "date":"2024-09-14T17:00:00.000Z",
                "players":{"a":{"id":"a","name":"Ria","position":"Setter","playing":true,
                    "stats":{"aces":2,"pass3":null}}}},
            "2025-03-01T18:00:00.000Z":{"id":"2025-03-01T18:00:00.000Z","name":"new",
                "date":"2025-03-01T18:00:00.000Z","players":{}}
        }"#;
        let repo = GameRepository::new(MemoryKeyValueStore::default().with_entry(GAMES_KEY, blob));

        // Act
        let games = repo.load();

        // Assert
        assert_eq!(games.len(), 2);
        let ria = games["2024-09-14T17:00:00.000Z"].player("a").unwrap();
        assert_eq!(ria.stats.get(StatKey::Aces), 2);
        assert_eq!(ria.stats.get(StatKey::Pass3), 0);
    }

    #[test]
    fn test_current_game_id_is_independent_of_games() {
        let mut repo = GameRepository::new(MemoryKeyValueStore::default());
        repo.save_current_game_id(&GameId::from("g-1")).unwrap();
        assert_eq!(repo.load_current_game_id(), Some(GameId::from("g-1")));
        assert!(repo.load().is_empty());
    }

    #[test]
    fn test_file_store_round_trips_through_disk() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("nested").join("data");
        let games = sample_games();

        // Act
        let mut repo = GameRepository::new(FileKeyValueStore::new(&data_dir));
        repo.save(&games).unwrap();
        repo.save_current_game_id(games.keys().next().unwrap()).unwrap();
        let reopened = GameRepository::new(FileKeyValueStore::new(&data_dir));

        // Assert
        assert!(data_dir.join(GAMES_KEY).exists());
        assert_eq!(reopened.load(), games);
        assert_eq!(reopened.load_current_game_id().as_ref(), games.keys().next());
    }

    #[test]
    fn test_file_store_get_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let kv = FileKeyValueStore::new(dir.path());
        assert!(kv.get("absent").unwrap().is_none());
    }

    #[test]
    fn test_file_store_overwrites_previous_value() {
        let dir = TempDir::new().unwrap();
        let mut kv = FileKeyValueStore::new(dir.path());
        kv.set(CURRENT_GAME_KEY, "first").unwrap();
        kv.set(CURRENT_GAME_KEY, "second").unwrap();
        assert_eq!(kv.get(CURRENT_GAME_KEY).unwrap().as_deref(), Some("second"));
    }
}
