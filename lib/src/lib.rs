mod config;
mod export;
mod game;
mod roster;
mod stats;

pub use config::*;
pub use export::*;
pub use game::*;
pub use roster::*;
pub use stats::*;
