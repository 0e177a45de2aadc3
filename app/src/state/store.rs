//! Game/player store: the in-memory collection of games, the current game
//! pointer, and every mutation on them.
//!
//! Each applied mutation is written through to the repository before the
//! call returns. A failed write is logged and the in-memory change stands.

use rallymetric::{
    Game, GameId, GameMap, Player, PlayerId, Position, PositionError, StatKey, games_by_date,
    latest_game, sorted_roster, to_csv,
};
use thiserror::Error;

use super::ids::IdGenerator;
use super::storage::{GameRepository, KeyValueStore};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("player name must not be empty")]
    EmptyName,

    #[error("player position must not be empty")]
    EmptyPosition,

    #[error("no game with id '{0}'")]
    GameNotFound(GameId),
}

impl From<PositionError> for StoreError {
    fn from(e: PositionError) -> Self {
        match e {
            PositionError::Empty => StoreError::EmptyPosition,
        }
    }
}

pub struct Store<S> {
    repo: GameRepository<S>,
    ids: Box<dyn IdGenerator>,
    games: GameMap,
    current: Option<GameId>,
    seed_new_games: bool,
}

impl<S: KeyValueStore> Store<S> {
    /// Load persisted games and the current pointer. When there is no usable
    /// current game (first run, or the pointer names a game that no longer
    /// loads) a new one is created and made current.
    pub fn open(repo: GameRepository<S>, ids: Box<dyn IdGenerator>, seed_new_games: bool) -> Self {
        let games = repo.load();
        let current = repo
            .load_current_game_id()
            .filter(|id| games.contains_key(id));
        let mut store = Self {
            repo,
            ids,
            games,
            current,
            seed_new_games,
        };
        if store.current.is_none() {
            let game = store.create_game();
            tracing::info!("started new game '{}' ({})", game.name, game.id);
        }
        store
    }

    // ----- Queries -----

    pub fn games(&self) -> &GameMap {
        &self.games
    }

    pub fn game(&self, id: &str) -> Option<&Game> {
        self.games.get(id)
    }

    /// All games, newest first.
    pub fn all_games(&self) -> Vec<&Game> {
        games_by_date(&self.games)
    }

    pub fn current_game_id(&self) -> Option<&GameId> {
        self.current.as_ref()
    }

    pub fn current_game(&self) -> Option<&Game> {
        self.current.as_ref().and_then(|id| self.games.get(id))
    }

    /// Current game's players in display order.
    pub fn sorted_roster(&self) -> Vec<&Player> {
        self.current_game().map(sorted_roster).unwrap_or_default()
    }

    /// CSV export of the current game.
    pub fn export_csv(&self) -> Option<String> {
        self.current_game().map(to_csv)
    }

    pub fn repository(&self) -> &GameRepository<S> {
        &self.repo
    }

    // ----- Games -----

    /// Create a game, seeding its roster from the latest existing game when
    /// seeding is enabled, and make it current.
    pub fn create_game(&mut self) -> &Game {
        let seed = if self.seed_new_games {
            latest_game(&self.games).map(|g| g.id.clone())
        } else {
            None
        };
        self.create_game_from(seed.as_ref())
    }

    /// Create a game and make it current. Players of `seed_from` (if it names
    /// an existing game) are carried over by name and position only.
    pub fn create_game_from(&mut self, seed_from: Option<&GameId>) -> &Game {
        let created = self.ids.now();
        let id = self.unique_game_id(created);
        let mut game = Game::new(id.clone(), created);

        if let Some(seed) = seed_from.and_then(|id| self.games.get(id)) {
            for player in seed.players.values() {
                let player_id = fresh_player_id(self.ids.as_mut(), &game);
                game.players
                    .insert(player_id.clone(), player.carry_over(player_id));
            }
            tracing::debug!(
                "seeded {} players from game '{}'",
                game.players.len(),
                seed.id
            );
        }

        let (index, _) = self.games.insert_full(id.clone(), game);
        self.current = Some(id);
        self.persist();
        self.persist_current();
        &self.games[index]
    }

    pub fn switch_current_game(&mut self, id: &str) -> Result<(), StoreError> {
        let Some((_, id, _)) = self.games.get_full(id) else {
            return Err(StoreError::GameNotFound(GameId::from(id)));
        };
        self.current = Some(id.clone());
        self.persist_current();
        Ok(())
    }

    // ----- Players -----

    /// Add a benched player with zeroed stats. Rejects a blank name or
    /// position without touching the game.
    pub fn add_player(
        &mut self,
        game_id: &str,
        name: &str,
        position: &str,
    ) -> Result<Player, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let position: Position = position.parse()?;
        let Some(game) = self.games.get_mut(game_id) else {
            return Err(StoreError::GameNotFound(GameId::from(game_id)));
        };

        let id = fresh_player_id(self.ids.as_mut(), game);
        let player = Player::new(id.clone(), name, position);
        game.players.insert(id, player.clone());
        tracing::debug!("added player '{}' ({}) to game '{}'", player.name, player.id, game_id);
        self.persist();
        Ok(player)
    }

    /// Remove a player. Returns false (and changes nothing) when the game or
    /// player does not exist.
    pub fn remove_player(&mut self, game_id: &str, player_id: &str) -> bool {
        let removed = self
            .games
            .get_mut(game_id)
            .and_then(|g| g.players.shift_remove(player_id))
            .is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Add `delta` to a stat, flooring at zero. Returns the new count, or
    /// `None` when the game or player does not exist or the game's schema
    /// does not track `key`.
    pub fn adjust_stat(
        &mut self,
        game_id: &str,
        player_id: &str,
        key: StatKey,
        delta: i64,
    ) -> Option<u32> {
        let game = self.games.get_mut(game_id)?;
        if !game.schema().contains(key) {
            tracing::debug!("'{key}' is not tracked by schema {}", game.schema());
            return None;
        }
        let player = game.player_mut(player_id)?;
        let value = player.stats.adjust(key, delta);
        self.persist();
        Some(value)
    }

    /// Set the playing flag. Returns false when the game or player does not
    /// exist.
    pub fn set_playing(&mut self, game_id: &str, player_id: &str, playing: bool) -> bool {
        let Some(player) = self.player_mut(game_id, player_id) else {
            return false;
        };
        player.playing = playing;
        self.persist();
        true
    }

    fn player_mut(&mut self, game_id: &str, player_id: &str) -> Option<&mut Player> {
        self.games.get_mut(game_id)?.player_mut(player_id)
    }

    // ----- Persistence -----

    fn persist(&mut self) {
        if let Err(e) = self.repo.save(&self.games) {
            tracing::warn!("failed to save games: {e}");
        }
    }

    fn persist_current(&mut self) {
        if let Some(id) = &self.current
            && let Err(e) = self.repo.save_current_game_id(id)
        {
            tracing::warn!("failed to save current game: {e}");
        }
    }

    /// Creation timestamp as id; a suffix disambiguates two games created in
    /// the same millisecond.
    fn unique_game_id(&mut self, created: chrono::DateTime<chrono::Utc>) -> GameId {
        let base = self.ids.game_id(created);
        let mut id = base.clone();
        let mut n = 1;
        while self.games.contains_key(&id) {
            id = GameId::new(format!("{base}-{n}"));
            n += 1;
        }
        id
    }
}

fn fresh_player_id(ids: &mut dyn IdGenerator, game: &Game) -> PlayerId {
    loop {
        let id = ids.player_id();
        if !game.players.contains_key(&id) {
            return id;
        }
    }
}
