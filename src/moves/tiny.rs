//! Compact move encodings.
//!
//! [`TinyMove`] packs a tile placement into one `u64`: seven 6-bit slots
//! for the placed tiles (letter plus blank bit; played-through squares are
//! not stored), the origin square, a direction bit and the play count.
//! Decoding walks the board from the origin, consuming a slot for every
//! empty square and skipping occupied ones. [`SmallMove`] pairs a
//! `TinyMove` with its score and the ordering estimate; it is the
//! canonical type inside the search, with the rich [`Move`] materialized
//! only at PV and driver boundaries.

use crate::consts::BLANK_MASK;
use crate::game::board::Board;
use crate::moves::{Move, MoveKind};
use crate::search::SolverError;

const TILE_BITS: u64 = 6;
const TILE_SLOT_MASK: u64 = 0x3f;
const SLOT_BLANK_BIT: u64 = 0x20;
const SLOT_LETTER_MASK: u64 = 0x1f;
const ROW_SHIFT: u64 = 42;
const COL_SHIFT: u64 = 46;
const VERTICAL_BIT: u64 = 1 << 50;
const COUNT_SHIFT: u64 = 51;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TinyMove(u64);

impl TinyMove {
    /// The pass move: no tiles, no origin.
    pub const PASS: TinyMove = TinyMove(0);
    /// Sentinel for table entries that carry no move.
    pub const INVALID: TinyMove = TinyMove(u64::MAX);

    /// Packs a placement. `placed` holds only the tiles coming off the
    /// rack, in span order.
    pub fn from_placement(row: u8, col: u8, vertical: bool, placed: &[u8]) -> Self {
        debug_assert!(!placed.is_empty() && placed.len() <= 7);
        let mut bits = 0u64;
        for (i, &tile) in placed.iter().enumerate() {
            let slot = if tile & BLANK_MASK != 0 {
                (tile & !BLANK_MASK) as u64 | SLOT_BLANK_BIT
            } else {
                tile as u64
            };
            bits |= slot << (TILE_BITS * i as u64);
        }
        bits |= (row as u64) << ROW_SHIFT;
        bits |= (col as u64) << COL_SHIFT;
        if vertical {
            bits |= VERTICAL_BIT;
        }
        bits |= (placed.len() as u64) << COUNT_SHIFT;
        TinyMove(bits)
    }

    #[inline(always)]
    pub fn is_pass(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }

    #[inline(always)]
    pub fn raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub fn row(self) -> u8 {
        ((self.0 >> ROW_SHIFT) & 0xf) as u8
    }

    #[inline(always)]
    pub fn col(self) -> u8 {
        ((self.0 >> COL_SHIFT) & 0xf) as u8
    }

    #[inline(always)]
    pub fn vertical(self) -> bool {
        self.0 & VERTICAL_BIT != 0
    }

    #[inline(always)]
    pub fn tiles_played(self) -> u8 {
        ((self.0 >> COUNT_SHIFT) & 0x7) as u8
    }

    #[inline]
    fn slot(self, i: u8) -> u8 {
        let slot = (self.0 >> (TILE_BITS * i as u64)) & TILE_SLOT_MASK;
        if slot & SLOT_BLANK_BIT != 0 {
            (slot & SLOT_LETTER_MASK) as u8 | BLANK_MASK
        } else {
            slot as u8
        }
    }

    /// Walks the placement against `board`, yielding (row, col, tile) for
    /// every placed tile. Fails when the move does not fit the board.
    pub fn for_each_placed(
        self,
        board: &Board,
        mut f: impl FnMut(usize, usize, u8),
    ) -> Result<(), SolverError> {
        if self.is_invalid() {
            return Err(SolverError::MoveDecode);
        }
        let count = self.tiles_played();
        let (dr, dc) = if self.vertical() { (1, 0) } else { (0, 1) };
        let (mut r, mut c) = (self.row() as usize, self.col() as usize);
        let mut consumed = 0u8;
        while consumed < count {
            if r >= board.dim() || c >= board.dim() {
                return Err(SolverError::MoveDecode);
            }
            if board.is_empty_at(r, c) {
                let tile = self.slot(consumed);
                if tile == 0 {
                    return Err(SolverError::MoveDecode);
                }
                f(r, c, tile);
                consumed += 1;
            }
            r += dr;
            c += dc;
        }
        Ok(())
    }
}

/// A `TinyMove` plus the fields the search orders and scores by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmallMove {
    tiny: TinyMove,
    score: i16,
    estimated_value: i16,
    tiles_played: u8,
}

impl SmallMove {
    pub fn pass() -> Self {
        Self {
            tiny: TinyMove::PASS,
            score: 0,
            estimated_value: 0,
            tiles_played: 0,
        }
    }

    pub fn new(tiny: TinyMove, score: i16) -> Self {
        Self {
            tiny,
            score,
            estimated_value: 0,
            tiles_played: tiny.tiles_played(),
        }
    }

    /// Compacts a rich move. Passes become [`TinyMove::PASS`].
    pub fn from_move(m: &Move) -> Self {
        match m.kind {
            MoveKind::Pass => Self::pass(),
            MoveKind::TilePlacement => {
                let placed: Vec<u8> = m.tiles.iter().copied().filter(|&t| t != 0).collect();
                Self::new(
                    TinyMove::from_placement(m.row, m.col, m.vertical, &placed),
                    m.score,
                )
            }
        }
    }

    #[inline(always)]
    pub fn tiny(&self) -> TinyMove {
        self.tiny
    }

    #[inline(always)]
    pub fn score(&self) -> i16 {
        self.score
    }

    #[inline(always)]
    pub fn is_pass(&self) -> bool {
        self.tiny.is_pass()
    }

    #[inline(always)]
    pub fn tiles_played(&self) -> u8 {
        self.tiles_played
    }

    #[inline(always)]
    pub fn estimated_value(&self) -> i16 {
        self.estimated_value
    }

    #[inline(always)]
    pub fn set_estimated_value(&mut self, v: i16) {
        self.estimated_value = v;
    }

    #[inline(always)]
    pub fn add_estimated_value(&mut self, v: i16) {
        self.estimated_value += v;
    }

    /// Expands back into a rich move against the current board.
    pub fn to_move(&self, board: &Board) -> Result<Move, SolverError> {
        expand_tiny(self.tiny, board, Some(self.score))
    }

    pub fn short_description(&self, board: &Board) -> String {
        self.to_move(board)
            .map(|m| m.short_description())
            .unwrap_or_else(|_| "<undecodable>".into())
    }
}

/// Rebuilds a rich move from a table-stored tiny move, rescoring it
/// against the board. Fails with [`SolverError::MoveDecode`] when the move
/// does not reconstruct on this board.
pub fn tiny_to_move(
    tiny: TinyMove,
    board: &Board,
    ld: &crate::game::alphabet::LetterDistribution,
) -> Result<Move, SolverError> {
    if tiny.is_pass() {
        return Ok(Move::pass());
    }
    let mut m = expand_tiny(tiny, board, None)?;
    m.score = board.score_placement(
        m.row as usize,
        m.col as usize,
        m.vertical,
        &m.tiles,
        ld,
    );
    Ok(m)
}

fn expand_tiny(tiny: TinyMove, board: &Board, score: Option<i16>) -> Result<Move, SolverError> {
    if tiny.is_pass() {
        return Ok(Move::pass());
    }
    let count = tiny.tiles_played();
    if count == 0 {
        return Err(SolverError::MoveDecode);
    }
    let (row, col, vertical) = (tiny.row() as usize, tiny.col() as usize, tiny.vertical());
    let (dr, dc) = if vertical { (1, 0) } else { (0, 1) };
    // span length: walk until `count` placed tiles are consumed, then
    // absorb any trailing occupied squares into the word
    let mut tiles = Vec::new();
    let (mut r, mut c) = (row, col);
    let mut consumed = 0u8;
    while consumed < count {
        if r >= board.dim() || c >= board.dim() {
            return Err(SolverError::MoveDecode);
        }
        if board.is_empty_at(r, c) {
            let tile = tiny.slot(consumed);
            if tile == 0 {
                return Err(SolverError::MoveDecode);
            }
            tiles.push(tile);
            consumed += 1;
        } else {
            tiles.push(0);
        }
        r += dr;
        c += dc;
    }
    while r < board.dim() && c < board.dim() && !board.is_empty_at(r, c) {
        tiles.push(0);
        r += dr;
        c += dc;
    }
    Ok(Move {
        kind: MoveKind::TilePlacement,
        row: row as u8,
        col: col as u8,
        vertical,
        tiles,
        score: score.unwrap_or(0),
        tiles_played: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::alphabet::{LetterDistribution, letter_from_char};

    fn fixture_board() -> Board {
        Board::from_rows(&[
            "...............",
            "...............",
            "...............",
            "...............",
            "...............",
            "...............",
            "...............",
            "......CAT......",
        ])
        .unwrap()
    }

    #[test]
    fn placement_round_trips_through_tiny() {
        let board = fixture_board();
        let d = letter_from_char('D').unwrap();
        let o = letter_from_char('O').unwrap();
        let g = letter_from_char('G').unwrap();
        let s = letter_from_char('S').unwrap();
        let m = Move {
            kind: MoveKind::TilePlacement,
            row: 4,
            col: 9,
            vertical: true,
            tiles: vec![d, o, g, s],
            score: 14,
            tiles_played: 4,
        };
        let sm = SmallMove::from_move(&m);
        assert_eq!(sm.tiles_played(), 4);
        assert_eq!(sm.to_move(&board).unwrap(), m);
    }

    #[test]
    fn play_through_squares_are_not_stored() {
        let board = fixture_board();
        let s = letter_from_char('S').unwrap();
        // ...CAT + S: the span crosses three occupied squares
        let m = Move {
            kind: MoveKind::TilePlacement,
            row: 7,
            col: 6,
            vertical: false,
            tiles: vec![0, 0, 0, s],
            score: 6,
            tiles_played: 1,
        };
        let sm = SmallMove::from_move(&m);
        let back = sm.to_move(&board).unwrap();
        assert_eq!(back, m);
        // and rescoring from the tiny form alone agrees
        let ld = LetterDistribution::english();
        let rescored = tiny_to_move(sm.tiny(), &board, &ld).unwrap();
        assert_eq!(rescored.score, 6);
    }

    #[test]
    fn blanks_keep_their_letter_and_flag() {
        let board = fixture_board();
        let blank_s = letter_from_char('s').unwrap();
        let m = Move {
            kind: MoveKind::TilePlacement,
            row: 7,
            col: 6,
            vertical: false,
            tiles: vec![0, 0, 0, blank_s],
            score: 5,
            tiles_played: 1,
        };
        let back = SmallMove::from_move(&m).to_move(&board).unwrap();
        assert_eq!(back.tiles[3], blank_s);
    }

    #[test]
    fn pass_and_invalid_are_distinct() {
        let board = fixture_board();
        assert!(SmallMove::pass().is_pass());
        assert!(!TinyMove::INVALID.is_pass());
        assert!(TinyMove::INVALID.for_each_placed(&board, |_, _, _| {}).is_err());
        assert!(SmallMove::pass().to_move(&board).unwrap().is_pass());
    }

    #[test]
    fn decode_against_wrong_board_fails() {
        let board = fixture_board();
        let s = letter_from_char('S').unwrap();
        let m = Move {
            kind: MoveKind::TilePlacement,
            row: 7,
            col: 6,
            vertical: false,
            tiles: vec![0, 0, 0, s],
            score: 6,
            tiles_played: 1,
        };
        let sm = SmallMove::from_move(&m);
        // same move against an empty board decodes to a different span
        let empty = Board::new();
        let wrong = sm.to_move(&empty).unwrap();
        assert_ne!(wrong, m);
        // walking off the edge is an error
        let off = TinyMove::from_placement(7, 13, false, &[s, s, s]);
        assert!(SmallMove::new(off, 0).to_move(&board).is_err());
    }
}
