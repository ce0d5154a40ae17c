//! Exact solvers for the late stages of a two-player tile-placement word
//! game: an endgame engine (empty bag, perfect information) and a
//! pre-endgame driver that reduces near-empty-bag positions to endgames
//! over every distinguishable opponent draw.

pub mod consts;
pub mod game;
pub mod gcg;
pub mod moves;
pub mod search;
pub mod utils;

pub mod prelude;

pub use game::Game;
pub use moves::Move;
pub use search::{PVLine, SolverError};
pub use utils::cli;
pub use utils::log::init;
