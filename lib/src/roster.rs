//! Roster ordering for display.
//!
//! The on-screen order is derived on every render and never stored: players
//! on court first, then Setter, Hitter, DS, any other position, then name.

use std::cmp::Ordering;

use crate::{Game, Player};

/// Players of `game` in display order.
///
/// Sort key: `playing` (true first), `Position::rank()`, then `name_cmp`.
/// Players that tie on all three keep their insertion order.
pub fn sorted_roster(game: &Game) -> Vec<&Player> {
    let mut players: Vec<&Player> = game.players.values().collect();
    players.sort_by(|a, b| roster_cmp(a, b));
    players
}

pub fn roster_cmp(a: &Player, b: &Player) -> Ordering {
    b.playing
        .cmp(&a.playing)
        .then_with(|| a.position.rank().cmp(&b.position.rank()))
        .then_with(|| name_cmp(&a.name, &b.name))
}

/// Dictionary-style name comparison.
///
/// Letters compare by base letter first (case and common Latin accents
/// ignored), then accented after plain, then lowercase before uppercase.
/// Names that differ only in other code points fall back to code point order,
/// so distinct names never compare equal.
pub fn name_cmp(a: &str, b: &str) -> Ordering {
    let primary = |s: &str| -> Vec<char> {
        s.chars()
            .flat_map(char::to_lowercase)
            .map(fold_accent)
            .collect()
    };
    let secondary = |s: &str| -> Vec<char> { s.chars().flat_map(char::to_lowercase).collect() };
    primary(a)
        .cmp(&primary(b))
        .then_with(|| secondary(a).cmp(&secondary(b)))
        .then_with(|| case_cmp(a, b))
        .then_with(|| a.cmp(b))
}

// First differing letter decides: lowercase sorts before uppercase.
fn case_cmp(a: &str, b: &str) -> Ordering {
    for (x, y) in a.chars().zip(b.chars()) {
        if x == y {
            continue;
        }
        match (x.is_lowercase(), y.is_lowercase()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }
    Ordering::Equal
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
        'ç' | 'č' | 'ć' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'ñ' | 'ń' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => 'o',
        'š' | 'ś' => 's',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => 'u',
        'ý' | 'ÿ' => 'y',
        'ž' | 'ź' | 'ż' => 'z',
        _ => c,
    }
}
