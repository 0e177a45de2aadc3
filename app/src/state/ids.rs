//! Clock and id generation for new games and players.

use chrono::{DateTime, Utc};
use rallymetric::{GameId, PlayerId};
use uuid::Uuid;

/// Source of creation timestamps and ids, injected into the `Store`.
pub trait IdGenerator {
    /// Creation instant for a new game.
    fn now(&mut self) -> DateTime<Utc>;

    /// Id for a game created at `created`.
    fn game_id(&mut self, created: DateTime<Utc>) -> GameId {
        GameId::from_timestamp(created)
    }

    /// Fresh player id. Must not repeat within one game, even when many
    /// players are created in the same instant (roster carry-over does that).
    fn player_id(&mut self) -> PlayerId;
}

/// Wall clock plus a random suffix: `"<unix micros>-<8 hex>"`.
#[derive(Debug, Default)]
pub struct SystemIds;

impl IdGenerator for SystemIds {
    fn now(&mut self) -> DateTime<Utc> {
        Utc::now()
    }

    fn player_id(&mut self) -> PlayerId {
        let micros = Utc::now().timestamp_micros();
        let suffix = Uuid::new_v4().simple().to_string();
        PlayerId::new(format!("{micros}-{}", &suffix[..8]))
    }
}

/// Deterministic ids for tests: the clock starts at a fixed instant and
/// advances one second per game; players are numbered `p1`, `p2`, ...
#[cfg(test)]
#[derive(Debug)]
pub struct SequentialIds {
    clock: DateTime<Utc>,
    next_player: u64,
}

#[cfg(test)]
impl SequentialIds {
    pub fn starting_at(clock: DateTime<Utc>) -> Self {
        Self {
            clock,
            next_player: 1,
        }
    }
}

#[cfg(test)]
impl Default for SequentialIds {
    fn default() -> Self {
        use chrono::TimeZone;
        Self::starting_at(Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap())
    }
}

#[cfg(test)]
impl IdGenerator for SequentialIds {
    fn now(&mut self) -> DateTime<Utc> {
        let now = self.clock;
        self.clock += chrono::Duration::seconds(1);
        now
    }

    fn player_id(&mut self) -> PlayerId {
        let id = PlayerId::new(format!("p{}", self.next_player));
        self.next_player += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_system_player_ids_do_not_collide_in_a_tight_loop() {
        let mut ids = SystemIds;
        let generated: HashSet<PlayerId> = (0..500).map(|_| ids.player_id()).collect();
        assert_eq!(generated.len(), 500);
    }

    #[test]
    fn test_system_player_id_shape() {
        let id = SystemIds.player_id();
        let (micros, suffix) = id.as_str().split_once('-').unwrap();
        assert!(micros.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_game_id_is_creation_timestamp() {
        let mut ids = SequentialIds::default();
        let now = ids.now();
        assert_eq!(ids.game_id(now).as_str(), "2025-03-01T18:00:00.000Z");
    }

    #[test]
    fn test_sequential_ids_advance() {
        let mut ids = SequentialIds::default();
        let a = ids.now();
        let b = ids.now();
        assert!(b > a);
        assert_eq!(ids.player_id().as_str(), "p1");
        assert_eq!(ids.player_id().as_str(), "p2");
    }
}
