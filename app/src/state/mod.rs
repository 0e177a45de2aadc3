pub mod config;
mod ids;
mod storage;
mod store;

pub use ids::SystemIds;
pub use storage::{FileKeyValueStore, GameRepository, KeyValueStore};
pub use store::Store;

use std::path::Path;

/// Open the file-backed store rooted at `data_dir`.
pub fn open_store(data_dir: &Path, seed_new_games: bool) -> Store<FileKeyValueStore> {
    tracing::debug!("data dir {}", data_dir.display());
    let repo = GameRepository::new(FileKeyValueStore::new(data_dir));
    Store::open(repo, Box::new(SystemIds), seed_new_games)
}
