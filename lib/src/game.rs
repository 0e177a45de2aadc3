//! Game and player records: the persisted shape of a scoresheet.

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{StatLine, StatSchema};

/// All games, keyed by id.
pub type GameMap = IndexMap<GameId, Game>;

/// Game identifier. New games use their creation instant in RFC 3339 form
/// with millisecond precision (`"2025-03-01T18:30:00.000Z"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_timestamp(created: DateTime<Utc>) -> Self {
        Self(created.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Player identifier, unique within its game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_id_impls {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl Borrow<str> for $ty {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id_impls!(GameId);
string_id_impls!(PlayerId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("position must not be empty")]
    Empty,
}

/// Court position.
///
/// The three named positions have a fixed roster precedence; any other label
/// is accepted verbatim and sorts after them. Serializes as the plain label:
/// `"Setter"`, `"Hitter"`, `"DS"`, or the custom text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Position {
    Setter,
    Hitter,
    Ds,
    Other(String),
}

impl Position {
    /// Roster precedence: Setter 1, Hitter 2, DS 3, anything else 4.
    pub fn rank(&self) -> u8 {
        match self {
            Position::Setter => 1,
            Position::Hitter => 2,
            Position::Ds => 3,
            Position::Other(_) => 4,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Position::Setter => "Setter",
            Position::Hitter => "Hitter",
            Position::Ds => "DS",
            Position::Other(s) => s,
        }
    }

    /// Map typed input to a position without validation. Known labels match
    /// case-insensitively and surrounding whitespace is dropped.
    fn from_input(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case("setter") {
            Position::Setter
        } else if s.eq_ignore_ascii_case("hitter") {
            Position::Hitter
        } else if s.eq_ignore_ascii_case("ds") {
            Position::Ds
        } else {
            Position::Other(s.to_string())
        }
    }
}

impl std::str::FromStr for Position {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(PositionError::Empty);
        }
        Ok(Position::from_input(s))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Position {
    // Stored labels match exactly; anything else, blank included, loads back
    // verbatim as `Other`.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "Setter" => Position::Setter,
            "Hitter" => Position::Hitter,
            "DS" => Position::Ds,
            _ => Position::Other(s),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub playing: bool,
    #[serde(default)]
    pub stats: StatLine,
}

impl Player {
    /// New bench player with every current-schema stat at zero.
    pub fn new(id: PlayerId, name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            playing: false,
            stats: StatLine::zeroed(StatSchema::CURRENT),
        }
    }

    /// Copy name and position into a fresh player; stats and the playing
    /// flag are not carried over.
    pub fn carry_over(&self, id: PlayerId) -> Self {
        Player::new(id, self.name.clone(), self.position.clone())
    }
}

/// Outcome of `Game::upgrade`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaUpgrade {
    pub from: StatSchema,
    pub backfilled: usize,
}

impl SchemaUpgrade {
    pub fn changed(&self) -> bool {
        self.from != StatSchema::CURRENT || self.backfilled > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub date: DateTime<Utc>,
    /// Stat schema the game's players carry. Absent in games saved before
    /// schemas were tagged; `upgrade()` infers and fills it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<StatSchema>,
    #[serde(default)]
    pub players: IndexMap<PlayerId, Player>,
}

impl Game {
    /// Empty game created at `date`, named after the local date and time.
    pub fn new(id: GameId, date: DateTime<Utc>) -> Self {
        Self {
            id,
            name: display_name(&date.with_timezone(&Local)),
            date,
            schema: Some(StatSchema::CURRENT),
            players: IndexMap::new(),
        }
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn schema(&self) -> StatSchema {
        self.schema.unwrap_or_else(|| {
            StatSchema::infer(self.players.values().map(|p| &p.stats)).unwrap_or_default()
        })
    }

    /// Bring every player's stats up to the current schema, zero-filling
    /// missing keys. Counts already recorded, including legacy keys, are kept.
    pub fn upgrade(&mut self) -> SchemaUpgrade {
        let from = self.schema();
        let backfilled = self
            .players
            .values_mut()
            .map(|p| p.stats.backfill(StatSchema::CURRENT))
            .sum();
        self.schema = Some(StatSchema::CURRENT);
        SchemaUpgrade { from, backfilled }
    }
}

/// Display name for a game created at `date`: `"3/1/2025 06:30 PM"`.
pub fn display_name<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    date.format("%-m/%-d/%Y %I:%M %p").to_string()
}

/// Games newest first, the order a game picker lists them in.
pub fn games_by_date(games: &GameMap) -> Vec<&Game> {
    let mut sorted: Vec<&Game> = games.values().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    sorted
}

/// Most recently created game.
pub fn latest_game(games: &GameMap) -> Option<&Game> {
    games_by_date(games).into_iter().next()
}
