//! Stat schema: the versioned set of per-player counters.
//!
//! The counters a player carries changed over time: the first release kept a
//! coarse set (aces, serves, digs, ...), the current one tracks pass quality
//! buckets and attempt/error pairs per skill. Persisted games are never
//! rewritten in place, so an old game can surface with only the V1 keys.
//! `StatLine` keys are therefore plain strings and every lookup treats a
//! missing key as zero.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Every stat key any schema version has used.
///
/// Variants serialize to their persisted names (`"aces"`, `"setAttempts"`,
/// etc.). `Display` returns the same name. `from_code()` parses
/// case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatKey {
    #[serde(rename = "aces")]
    Aces,
    #[serde(rename = "serves")]
    Serves,
    #[serde(rename = "digs")]
    Digs,
    #[serde(rename = "sets")]
    Sets,
    #[serde(rename = "hits")]
    Hits,
    #[serde(rename = "kills")]
    Kills,
    #[serde(rename = "blocks")]
    Blocks,
    #[serde(rename = "pass3")]
    Pass3,
    #[serde(rename = "pass2")]
    Pass2,
    #[serde(rename = "pass1")]
    Pass1,
    #[serde(rename = "pass0")]
    Pass0,
    #[serde(rename = "setAttempts")]
    SetAttempts,
    #[serde(rename = "setAssists")]
    SetAssists,
    #[serde(rename = "setErrors")]
    SetErrors,
    #[serde(rename = "hitAttempts")]
    HitAttempts,
    #[serde(rename = "hitErrors")]
    HitErrors,
    #[serde(rename = "digErrors")]
    DigErrors,
    #[serde(rename = "blockAssists")]
    BlockAssists,
    #[serde(rename = "blockErrors")]
    BlockErrors,
    #[serde(rename = "serveErrors")]
    ServeErrors,
}

impl StatKey {
    pub const ALL: &[StatKey] = &[
        StatKey::Aces,
        StatKey::Serves,
        StatKey::Digs,
        StatKey::Sets,
        StatKey::Hits,
        StatKey::Kills,
        StatKey::Blocks,
        StatKey::Pass3,
        StatKey::Pass2,
        StatKey::Pass1,
        StatKey::Pass0,
        StatKey::SetAttempts,
        StatKey::SetAssists,
        StatKey::SetErrors,
        StatKey::HitAttempts,
        StatKey::HitErrors,
        StatKey::DigErrors,
        StatKey::BlockAssists,
        StatKey::BlockErrors,
        StatKey::ServeErrors,
    ];

    /// Persisted key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKey::Aces => "aces",
            StatKey::Serves => "serves",
            StatKey::Digs => "digs",
            StatKey::Sets => "sets",
            StatKey::Hits => "hits",
            StatKey::Kills => "kills",
            StatKey::Blocks => "blocks",
            StatKey::Pass3 => "pass3",
            StatKey::Pass2 => "pass2",
            StatKey::Pass1 => "pass1",
            StatKey::Pass0 => "pass0",
            StatKey::SetAttempts => "setAttempts",
            StatKey::SetAssists => "setAssists",
            StatKey::SetErrors => "setErrors",
            StatKey::HitAttempts => "hitAttempts",
            StatKey::HitErrors => "hitErrors",
            StatKey::DigErrors => "digErrors",
            StatKey::BlockAssists => "blockAssists",
            StatKey::BlockErrors => "blockErrors",
            StatKey::ServeErrors => "serveErrors",
        }
    }

    /// Column header used in exports.
    pub fn label(&self) -> &'static str {
        match self {
            StatKey::Aces => "Aces",
            StatKey::Serves => "Serves",
            StatKey::Digs => "Digs",
            StatKey::Sets => "Sets",
            StatKey::Hits => "Hits",
            StatKey::Kills => "Kills",
            StatKey::Blocks => "Blocks",
            StatKey::Pass3 => "Pass 3",
            StatKey::Pass2 => "Pass 2",
            StatKey::Pass1 => "Pass 1",
            StatKey::Pass0 => "Pass 0",
            StatKey::SetAttempts => "Set Attempts",
            StatKey::SetAssists => "Assists",
            StatKey::SetErrors => "Set Errors",
            StatKey::HitAttempts => "Hit Attempts",
            StatKey::HitErrors => "Hit Errors",
            StatKey::DigErrors => "Dig Errors",
            StatKey::BlockAssists => "Block Assists",
            StatKey::BlockErrors => "Block Errors",
            StatKey::ServeErrors => "Serve Errors",
        }
    }

    /// Parse a persisted key name case-insensitively. Returns `None` for
    /// unknown names.
    pub fn from_code(s: &str) -> Option<StatKey> {
        let s = s.trim();
        StatKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for StatKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKey::from_code(s).ok_or_else(|| format!("unknown stat key {s:?}"))
    }
}

/// A stat schema version: the fixed, ordered key set new players receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum StatSchema {
    /// Coarse counters from the first release.
    V1,
    /// Pass buckets plus attempt/error pairs per skill.
    V2,
}

impl StatSchema {
    pub const CURRENT: StatSchema = StatSchema::V2;

    /// Keys in declared (column) order.
    pub fn keys(&self) -> &'static [StatKey] {
        match self {
            StatSchema::V1 => &[
                StatKey::Aces,
                StatKey::Serves,
                StatKey::Digs,
                StatKey::Sets,
                StatKey::Hits,
                StatKey::Kills,
                StatKey::Blocks,
            ],
            StatSchema::V2 => &[
                StatKey::Pass3,
                StatKey::Pass2,
                StatKey::Pass1,
                StatKey::Pass0,
                StatKey::SetAttempts,
                StatKey::SetAssists,
                StatKey::SetErrors,
                StatKey::HitAttempts,
                StatKey::Kills,
                StatKey::HitErrors,
                StatKey::Digs,
                StatKey::DigErrors,
                StatKey::Blocks,
                StatKey::BlockAssists,
                StatKey::BlockErrors,
                StatKey::Serves,
                StatKey::Aces,
                StatKey::ServeErrors,
            ],
        }
    }

    pub fn contains(&self, key: StatKey) -> bool {
        self.keys().contains(&key)
    }

    /// Infer the schema a set of stat lines was written under.
    ///
    /// Any key that only V2 declares means V2; otherwise any known key means
    /// V1. Returns `None` when there is nothing to look at.
    pub fn infer<'a>(lines: impl IntoIterator<Item = &'a StatLine>) -> Option<StatSchema> {
        let mut seen_any = false;
        for line in lines {
            for key in line.known_keys() {
                if StatSchema::V2.contains(key) && !StatSchema::V1.contains(key) {
                    return Some(StatSchema::V2);
                }
                seen_any = true;
            }
        }
        seen_any.then_some(StatSchema::V1)
    }
}

impl Default for StatSchema {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for StatSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

/// Per-player counters, keyed by persisted stat name.
///
/// Unknown names read from disk are kept as-is so a round trip never loses
/// data written by another version. Stored counts that are not a
/// non-negative integer (`null`, negative, fractional) load as their floor,
/// clamped at zero. A `null` line loads empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatLine(BTreeMap<String, u32>);

impl<'de> Deserialize<'de> for StatLine {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<BTreeMap<String, StoredCount>>::deserialize(deserializer)?;
        Ok(Self(
            raw.unwrap_or_default()
                .into_iter()
                .map(|(k, StoredCount(v))| (k, v))
                .collect(),
        ))
    }
}

/// One persisted counter, read leniently.
struct StoredCount(u32);

impl<'de> Deserialize<'de> for StoredCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StoredCountVisitor).map(StoredCount)
    }
}

struct StoredCountVisitor;

impl<'de> Visitor<'de> for StoredCountVisitor {
    type Value = u32;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a stat count")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u32, E> {
        Ok(u32::try_from(v).unwrap_or(u32::MAX))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u32, E> {
        Ok(v.clamp(0, i64::from(u32::MAX)) as u32)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<u32, E> {
        // NaN casts to 0; out-of-range floats saturate.
        Ok(v.floor() as u32)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u32, E> {
        Ok(v.trim().parse::<f64>().map_or(0, |n| n.floor() as u32))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<u32, E> {
        Ok(0)
    }

    fn visit_unit<E: de::Error>(self) -> Result<u32, E> {
        Ok(0)
    }

    fn visit_none<E: de::Error>(self) -> Result<u32, E> {
        Ok(0)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<u32, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl StatLine {
    /// Every key of `schema` present at zero.
    pub fn zeroed(schema: StatSchema) -> Self {
        Self(
            schema
                .keys()
                .iter()
                .map(|k| (k.as_str().to_string(), 0))
                .collect(),
        )
    }

    /// Current count; a key this line does not carry reads as zero.
    pub fn get(&self, key: StatKey) -> u32 {
        self.0.get(key.as_str()).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: StatKey) -> bool {
        self.0.contains_key(key.as_str())
    }

    /// Apply `delta` and floor the result at zero. Returns the new count.
    ///
    /// The clamp applies per call: `+2, -5, +1` ends at 1.
    pub fn adjust(&mut self, key: StatKey, delta: i64) -> u32 {
        let next = i64::from(self.get(key))
            .saturating_add(delta)
            .clamp(0, i64::from(u32::MAX)) as u32;
        self.0.insert(key.as_str().to_string(), next);
        next
    }

    /// Insert a zero for every key of `schema` this line lacks. Returns how
    /// many keys were added.
    pub fn backfill(&mut self, schema: StatSchema) -> usize {
        let mut added = 0;
        for key in schema.keys() {
            if !self.contains(*key) {
                self.0.insert(key.as_str().to_string(), 0);
                added += 1;
            }
        }
        added
    }

    /// Keys recognised as a `StatKey`, in persisted-name order.
    pub fn known_keys(&self) -> impl Iterator<Item = StatKey> + '_ {
        self.0.keys().filter_map(|k| StatKey::from_code(k))
    }

    /// Raw `(name, count)` pairs, including names no schema declares.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
