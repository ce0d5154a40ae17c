/// Board dimension for the standard crossword layout
pub const BOARD_DIM: usize = 15;

/// Maximum number of tiles a player holds
pub const RACK_SIZE: usize = 7;
/// Rack-count table width: a letter count on a rack ranges over 0..=7
pub const RACK_TILE_LIMIT: usize = 8;

/// Blank tile plus A..Z
pub const ALPHABET_SIZE: usize = 27;
/// Set on a board tile that was played with a blank
pub const BLANK_MASK: u8 = 0x80;

/// Width of the per-square Zobrist key table. Covers regular tiles,
/// blanked tiles (letter | 0x80) and leaves margin.
pub const POS_TABLE_WIDTH: usize = 200;

/// Bonus for playing all seven tiles in one move
pub const BINGO_BONUS: i16 = 50;

/// Consecutive scoreless turns that end a standard game
pub const STANDARD_SCORELESS_LIMIT: u8 = 6;
/// In endgame solving, two consecutive passes end the game
pub const ENDGAME_SCORELESS_LIMIT: u8 = 2;

/// Sentinel "infinity" for the negamax window
pub const HUGE_NUMBER: i16 = i16::MAX;
/// Longest principal variation we track
pub const MAX_VARIANT_LENGTH: usize = 25;

/// Move-ordering bonus for the transposition-table hash move
pub const HASH_MOVE_OFFSET: i16 = 6000;
/// Move-ordering bonus for a pass replying to a pass
pub const EARLY_PASS_OFFSET: i16 = 21000;
