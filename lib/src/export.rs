//! CSV export of a game's player stats.
//!
//! Rows follow the game's stored player order, not the roster display order.
//! Fields are joined with commas and never quoted, so a comma or quote inside
//! a player name shifts the columns of that row.

use crate::{Game, Player, StatSchema};

pub const CSV_MIME: &str = "text/csv";

/// Header row: `Playing,Player,Position` followed by the current schema's
/// stat labels in declared order.
pub fn csv_header() -> String {
    let mut fields = vec!["Playing", "Player", "Position"];
    fields.extend(StatSchema::CURRENT.keys().iter().map(|k| k.label()));
    fields.join(",")
}

pub fn csv_row(player: &Player) -> String {
    let mut fields = vec![
        if player.playing { "Yes" } else { "No" }.to_string(),
        player.name.clone(),
        player.position.to_string(),
    ];
    fields.extend(
        StatSchema::CURRENT
            .keys()
            .iter()
            .map(|k| player.stats.get(*k).to_string()),
    );
    fields.join(",")
}

/// Full CSV document, `\n`-terminated lines, no byte-order mark.
pub fn to_csv(game: &Game) -> String {
    let mut out = csv_header();
    out.push('\n');
    for player in game.players.values() {
        out.push_str(&csv_row(player));
        out.push('\n');
    }
    out
}

/// Export filename: the game's display name with every character that is not
/// an ASCII letter or digit replaced by `_`, plus `.csv`.
pub fn csv_filename(game: &Game) -> String {
    let stem: String = game
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}.csv")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{Position, StatKey};

    fn two_player_game() -> Game {
        let mut game = Game::new("g".into(), Utc.timestamp_opt(0, 0).unwrap());
        game.name = "3/1/2025 06:30 PM".into();
        let mut zed = Player::new("p1".into(), "Zed", Position::Ds);
        zed.stats.adjust(StatKey::Digs, 4);
        let mut amy = Player::new("p2".into(), "Amy", Position::Setter);
        amy.playing = true;
        amy.stats.adjust(StatKey::SetAssists, 7);
        game.players.insert(zed.id.clone(), zed);
        game.players.insert(amy.id.clone(), amy);
        game
    }

    #[test]
    fn test_header_lists_schema_columns_in_order() {
        let header = csv_header();
        let columns: Vec<&str> = header.split(',').collect();
        assert_eq!(&columns[..3], ["Playing", "Player", "Position"]);
        assert_eq!(columns.len(), 3 + StatSchema::CURRENT.keys().len());
        assert_eq!(columns[3], "Pass 3");
        assert_eq!(columns.last(), Some(&"Serve Errors"));
    }

    #[test]
    fn test_rows_follow_insertion_order() {
        // Arrange: display order would put Amy (playing setter) first
        let game = two_player_game();

        // Act
        let csv = to_csv(&game);

        // Assert
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("No,Zed,DS,"));
        assert!(lines[2].starts_with("Yes,Amy,Setter,"));
        assert!(csv.ends_with('\n'));
        assert!(!csv.contains('\r'));
    }

    #[test]
    fn test_row_values_line_up_with_header() {
        let game = two_player_game();
        let csv = to_csv(&game);
        let mut lines = csv.lines();
        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        let zed: Vec<&str> = lines.next().unwrap().split(',').collect();

        assert_eq!(header.len(), zed.len());
        let digs = header.iter().position(|h| *h == "Digs").unwrap();
        assert_eq!(zed[digs], "4");
    }

    #[test]
    fn test_names_are_not_escaped() {
        let mut game = two_player_game();
        game.player_mut("p1").unwrap().name = "Smith, Jo".into();
        let csv = to_csv(&game);
        assert!(csv.contains("No,Smith, Jo,DS,"));
    }

    #[test]
    fn test_empty_game_exports_header_only() {
        let game = Game::new("g".into(), Utc.timestamp_opt(0, 0).unwrap());
        assert_eq!(to_csv(&game), format!("{}\n", csv_header()));
    }

    #[test]
    fn test_filename_replaces_non_alphanumerics() {
        let game = two_player_game();
        assert_eq!(csv_filename(&game), "3_1_2025_06_30_PM.csv");
    }
}
