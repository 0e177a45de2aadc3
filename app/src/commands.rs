//! Command-line front end over the `Store`.
//!
//! Every command acts on the current game. Players can be named by id, by an
//! unambiguous id prefix, or by name (case-insensitive).

use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use clap::Subcommand;
use clap::builder::BoolishValueParser;
use rallymetric::{CSV_MIME, Game, PlayerId, StatKey, StatSchema, csv_filename};

use crate::state::{FileKeyValueStore, KeyValueStore, Store};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start a new game and make it current
    NewGame {
        /// Start with an empty roster instead of copying the latest game's
        #[arg(long)]
        no_seed: bool,
    },
    /// List games, newest first
    Games,
    /// Make another game current
    Switch { id: String },
    /// Add a player to the current game
    Add { name: String, position: String },
    /// Remove a player from the current game
    Remove { player: String },
    /// Change a stat by a delta (negative to take one back)
    Stat {
        player: String,
        stat: StatKey,
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },
    /// Mark a player as playing (yes/no)
    Playing {
        player: String,
        #[arg(value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
        playing: bool,
    },
    /// Show the current game's roster in display order
    Roster,
    /// Write the current game's stats as CSV
    Export {
        /// Output file (default: <export dir>/<game name>.csv)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print to stdout instead of writing a file
        #[arg(long, conflicts_with = "out")]
        stdout: bool,
    },
    /// List the stat keys of a schema version
    Schema {
        #[arg(value_enum, default_value_t = StatSchema::CURRENT)]
        schema: StatSchema,
    },
    /// Show where config, games and exports live
    Paths,
}

/// Locations the commands need beyond the store itself.
pub struct Paths {
    pub config: PathBuf,
    pub export_dir: PathBuf,
}

pub fn run(
    store: &mut Store<FileKeyValueStore>,
    command: Command,
    paths: &Paths,
) -> anyhow::Result<()> {
    match command {
        Command::NewGame { no_seed } => {
            let game = if no_seed {
                store.create_game_from(None)
            } else {
                store.create_game()
            };
            println!(
                "started {} ({}) with {} players",
                game.name,
                game.id,
                game.players.len()
            );
        }
        Command::Games => {
            let current = store.current_game_id().cloned();
            println!("{} games", store.games().len());
            for game in store.all_games() {
                let marker = if Some(&game.id) == current.as_ref() { "*" } else { " " };
                println!(
                    "{marker} {:<26} {:<20} {:>3} players",
                    game.id,
                    game.name,
                    game.players.len()
                );
            }
        }
        Command::Switch { id } => {
            store.switch_current_game(&id)?;
            if let Some(game) = store.game(&id) {
                println!("now on {} ({})", game.name, game.id);
            }
        }
        Command::Add { name, position } => {
            let game_id = current_id(store)?;
            let player = store.add_player(&game_id, &name, &position)?;
            println!("added {} ({}) as {}", player.name, player.position, player.id);
        }
        Command::Remove { player } => {
            let (game_id, player_id) = resolve(store, &player)?;
            if store.remove_player(&game_id, player_id.as_str()) {
                println!("removed {player_id}");
            }
        }
        Command::Stat {
            player,
            stat,
            delta,
        } => {
            let (game_id, player_id) = resolve(store, &player)?;
            let Some(value) = store.adjust_stat(&game_id, player_id.as_str(), stat, delta) else {
                let schema = store.game(&game_id).map(|g| g.schema()).unwrap_or_default();
                bail!("'{stat}' is not tracked by schema {schema}");
            };
            println!("{player_id} {stat} = {value}");
        }
        Command::Playing { player, playing } => {
            let (game_id, player_id) = resolve(store, &player)?;
            if store.set_playing(&game_id, player_id.as_str(), playing) {
                let state = if playing { "playing" } else { "benched" };
                println!("{player_id} {state}");
            }
        }
        Command::Roster => {
            let game = current_game(store)?;
            println!("{} ({})", game.name, game.id);
            print_roster(store);
        }
        Command::Export { out, stdout } => {
            let game = current_game(store)?;
            let csv = store
                .export_csv()
                .ok_or_else(|| anyhow!("no current game"))?;
            if stdout {
                print!("{csv}");
            } else {
                let path = out.unwrap_or_else(|| paths.export_dir.join(csv_filename(game)));
                if let Some(dir) = path.parent()
                    && !dir.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(dir)
                        .with_context(|| format!("creating {}", dir.display()))?;
                }
                std::fs::write(&path, &csv).with_context(|| format!("writing {}", path.display()))?;
                tracing::info!(
                    "exported {} players ({CSV_MIME}) to {}",
                    game.players.len(),
                    path.display()
                );
                println!("{}", path.display());
            }
        }
        Command::Schema { schema } => {
            println!("schema {schema}");
            for key in schema.keys() {
                println!("  {:<14} {}", key.as_str(), key.label());
            }
        }
        Command::Paths => {
            println!("config   {}", paths.config.display());
            println!("data     {}", store.repository().backend().dir().display());
            println!("exports  {}", paths.export_dir.display());
        }
    }
    Ok(())
}

fn current_game<S: KeyValueStore>(store: &Store<S>) -> anyhow::Result<&Game> {
    store.current_game().ok_or_else(|| anyhow!("no current game"))
}

fn current_id<S: KeyValueStore>(store: &Store<S>) -> anyhow::Result<String> {
    Ok(current_game(store)?.id.to_string())
}

/// Find a player of the current game by id, id prefix, or name.
fn resolve<S: KeyValueStore>(store: &Store<S>, query: &str) -> anyhow::Result<(String, PlayerId)> {
    let game = current_game(store)?;
    match find_player(game, query) {
        Some(id) => Ok((game.id.to_string(), id)),
        None => bail!("no single player matching '{query}' in {}", game.name),
    }
}

fn find_player(game: &Game, query: &str) -> Option<PlayerId> {
    let query = query.trim();
    if let Some(player) = game.player(query) {
        return Some(player.id.clone());
    }
    let unique = |mut matches: Vec<&PlayerId>| match matches.len() {
        1 => matches.pop().cloned(),
        _ => None,
    };
    let by_name = game
        .players
        .values()
        .filter(|p| p.name.eq_ignore_ascii_case(query))
        .map(|p| &p.id)
        .collect();
    unique(by_name).or_else(|| {
        let by_prefix = game
            .players
            .keys()
            .filter(|id| id.as_str().starts_with(query))
            .collect();
        unique(by_prefix)
    })
}

fn print_roster<S: KeyValueStore>(store: &Store<S>) {
    let keys = StatSchema::CURRENT.keys();
    let mut header = format!("{:<3} {:<16} {:<10}", "on", "player", "position");
    for key in keys {
        header.push_str(&format!(" {:>5}", short_label(*key)));
    }
    println!("{header}");
    for player in store.sorted_roster() {
        let on = if player.playing { "x" } else { "" };
        let mut row = format!("{:<3} {:<16} {:<10}", on, player.name, player.position);
        for key in keys {
            row.push_str(&format!(" {:>5}", player.stats.get(*key)));
        }
        println!("{row}  [{}]", player.id);
    }
}

// Five-character column headers for the terminal table.
fn short_label(key: StatKey) -> &'static str {
    match key {
        StatKey::Pass3 => "P3",
        StatKey::Pass2 => "P2",
        StatKey::Pass1 => "P1",
        StatKey::Pass0 => "P0",
        StatKey::SetAttempts => "SA",
        StatKey::SetAssists => "AST",
        StatKey::SetErrors => "SE",
        StatKey::HitAttempts => "HA",
        StatKey::Kills => "K",
        StatKey::HitErrors => "HE",
        StatKey::Digs => "D",
        StatKey::DigErrors => "DE",
        StatKey::Blocks => "B",
        StatKey::BlockAssists => "BA",
        StatKey::BlockErrors => "BE",
        StatKey::Serves => "SV",
        StatKey::Aces => "ACE",
        StatKey::ServeErrors => "SVE",
        StatKey::Sets => "SET",
        StatKey::Hits => "HIT",
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rallymetric::{Player, Position};

    use super::*;

    fn game() -> Game {
        let mut game = Game::new("g".into(), Utc.timestamp_opt(0, 0).unwrap());
        for (id, name) in [("1740-aa", "Sam"), ("1741-bb", "Ann"), ("1742-cc", "ann")] {
            game.players
                .insert(id.into(), Player::new(id.into(), name, Position::Hitter));
        }
        game
    }

    #[test]
    fn test_find_player_by_exact_id() {
        assert_eq!(find_player(&game(), "1741-bb"), Some("1741-bb".into()));
    }

    #[test]
    fn test_find_player_by_unique_name() {
        assert_eq!(find_player(&game(), "sam"), Some("1740-aa".into()));
    }

    #[test]
    fn test_find_player_ambiguous_name_falls_through() {
        assert_eq!(find_player(&game(), "ANN"), None);
    }

    #[test]
    fn test_find_player_by_id_prefix() {
        assert_eq!(find_player(&game(), "1742"), Some("1742-cc".into()));
        assert_eq!(find_player(&game(), "174"), None);
    }

    #[test]
    fn test_stat_command_refuses_key_the_game_does_not_track() {
        // Arrange
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = crate::state::open_store(dir.path(), false);
        let paths = Paths {
            config: dir.path().join("config.toml"),
            export_dir: dir.path().to_path_buf(),
        };
        let add = Command::Add {
            name: "Sam".into(),
            position: "Hitter".into(),
        };
        run(&mut store, add, &paths).unwrap();

        // Act
        let stat = |stat| Command::Stat {
            player: "Sam".into(),
            stat,
            delta: 2,
        };
        let refused = run(&mut store, stat(StatKey::Sets), &paths);
        let applied = run(&mut store, stat(StatKey::Kills), &paths);

        // Assert
        assert!(refused.unwrap_err().to_string().contains("sets"));
        assert!(applied.is_ok());
        let player = store.current_game().unwrap().players.values().next().unwrap();
        assert!(!player.stats.contains(StatKey::Sets));
        assert_eq!(player.stats.get(StatKey::Kills), 2);
    }

    #[test]
    fn test_every_stat_has_a_short_label() {
        for key in StatKey::ALL {
            assert!(short_label(*key).len() <= 5);
        }
    }
}
