#![allow(unused_imports)]

pub use crate::consts::*;
pub use crate::game::alphabet::{LetterDistribution, letters_from_str};
pub use crate::game::bag::Bag;
pub use crate::game::board::Board;
pub use crate::game::rack::Rack;
pub use crate::game::{BackupMode, Game, PlayState};
pub use crate::moves::move_gen::{
    Lexicon, MoveGenerator, PlayRecorder, SortingParameter, WordListGen,
};
pub use crate::moves::tiny::{SmallMove, TinyMove};
pub use crate::moves::{Move, MoveKind};
pub use crate::search::{PVLine, SolverError, endgame, preendgame};
pub use miette::{self, Context, IntoDiagnostic, Result};
pub use tracing::{Level, debug, error, info, trace, warn};
