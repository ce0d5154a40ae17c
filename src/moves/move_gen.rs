//! Move generation.
//!
//! The search only depends on the [`MoveGenerator`] trait: generate every
//! legal placement (plus optionally a pass) into an internal small-move
//! buffer, or record only the single best full play. [`WordListGen`] is a
//! straightforward word-list-backed implementation: it recurses over
//! placements from every viable start square, validating words and cross
//! words against a prefix-pruned lexicon. Correct rather than clever.

use std::collections::HashSet;
use std::sync::Arc;

use crate::consts::{ALPHABET_SIZE, BLANK_MASK};
use crate::game::Game;
use crate::game::alphabet::{LetterDistribution, intrinsic_tile, letters_from_str};
use crate::game::board::Board;
use crate::game::rack::Rack;
use crate::moves::tiny::{SmallMove, TinyMove};
use crate::moves::{Move, MoveKind};

/// What `gen_all` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayRecorder {
    /// Every legal play, as compact small moves.
    AllSmall,
    /// Only the best-scoring play, as a full move.
    TopOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortingParameter {
    None,
    Score,
}

/// The contract the solvers need from a move generator.
pub trait MoveGenerator {
    /// Generates all legal plays for the player on turn. Exchanges are
    /// never relevant at solver bag levels and are ignored.
    fn gen_all(&mut self, game: &Game, include_exchanges: bool);
    /// The small plays recorded by the last `gen_all`.
    fn small_plays(&self) -> &[SmallMove];
    /// The best full play recorded under [`PlayRecorder::TopOnly`].
    fn top_play(&self) -> Option<&Move>;
    fn set_play_recorder(&mut self, recorder: PlayRecorder);
    fn set_sorting_parameter(&mut self, sorting: SortingParameter);
    fn set_gen_pass(&mut self, gen_pass: bool);
    /// An independent copy for a worker thread.
    fn clone_box(&self) -> Box<dyn MoveGenerator + Send + Sync>;
}

/// Word list with all proper prefixes, in machine letters.
#[derive(Debug, Default)]
pub struct Lexicon {
    words: HashSet<Box<[u8]>>,
    prefixes: HashSet<Box<[u8]>>,
}

impl Lexicon {
    pub fn from_words<S: AsRef<str>>(words: impl IntoIterator<Item = S>) -> miette::Result<Self> {
        let mut lex = Self::default();
        for w in words {
            let letters = letters_from_str(w.as_ref().trim())?;
            miette::ensure!(
                letters.iter().all(|&t| (1..=26).contains(&t)),
                "word has non-letter tiles: {:?}",
                w.as_ref()
            );
            for n in 1..letters.len() {
                lex.prefixes.insert(letters[..n].into());
            }
            lex.words.insert(letters.into());
        }
        Ok(lex)
    }

    /// Loads a newline-separated word list.
    pub fn from_file(path: &std::path::Path) -> miette::Result<Self> {
        use miette::{Context, IntoDiagnostic};
        let text = std::fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("reading word list {}", path.display()))?;
        Self::from_words(text.lines().filter(|l| !l.trim().is_empty()))
    }

    /// `word` is intrinsic letters; blanked tiles must be normalized first.
    pub fn is_word(&self, word: &[u8]) -> bool {
        self.words.contains(word)
    }

    pub fn is_prefix(&self, word: &[u8]) -> bool {
        self.prefixes.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

pub struct WordListGen {
    lexicon: Arc<Lexicon>,
    ld: Arc<LetterDistribution>,
    recorder: PlayRecorder,
    sorting: SortingParameter,
    gen_pass: bool,
    small_plays: Vec<SmallMove>,
    top: Option<Move>,
}

impl WordListGen {
    pub fn new(lexicon: Arc<Lexicon>, ld: Arc<LetterDistribution>) -> Self {
        Self {
            lexicon,
            ld,
            recorder: PlayRecorder::AllSmall,
            sorting: SortingParameter::Score,
            gen_pass: false,
            small_plays: Vec::new(),
            top: None,
        }
    }
}

impl MoveGenerator for WordListGen {
    fn gen_all(&mut self, game: &Game, _include_exchanges: bool) {
        self.small_plays.clear();
        self.top = None;
        let board = game.board();
        let rack = *game.rack_for(game.player_on_turn());
        if rack.num_tiles() > 0 {
            for vertical in [false, true] {
                self.gen_direction(board, &rack, vertical);
            }
        }
        if self.gen_pass && self.recorder == PlayRecorder::AllSmall {
            self.small_plays.push(SmallMove::pass());
        }
        if self.sorting == SortingParameter::Score && self.recorder == PlayRecorder::AllSmall {
            self.small_plays
                .sort_unstable_by_key(|m| std::cmp::Reverse(m.score()));
        }
    }

    fn small_plays(&self) -> &[SmallMove] {
        &self.small_plays
    }

    fn top_play(&self) -> Option<&Move> {
        self.top.as_ref()
    }

    fn set_play_recorder(&mut self, recorder: PlayRecorder) {
        self.recorder = recorder;
    }

    fn set_sorting_parameter(&mut self, sorting: SortingParameter) {
        self.sorting = sorting;
    }

    fn set_gen_pass(&mut self, gen_pass: bool) {
        self.gen_pass = gen_pass;
    }

    fn clone_box(&self) -> Box<dyn MoveGenerator + Send + Sync> {
        Box::new(Self {
            lexicon: Arc::clone(&self.lexicon),
            ld: Arc::clone(&self.ld),
            recorder: self.recorder,
            sorting: self.sorting,
            gen_pass: self.gen_pass,
            small_plays: Vec::new(),
            top: None,
        })
    }
}

/// In-flight placement state for the recursive extension.
struct Placement {
    start_row: usize,
    start_col: usize,
    vertical: bool,
    word: Vec<u8>,
    placed: Vec<u8>,
    connected: bool,
}

impl WordListGen {
    fn gen_direction(&mut self, board: &Board, rack: &Rack, vertical: bool) {
        let dim = board.dim();
        let (dr, dc) = if vertical { (1, 0) } else { (0, 1) };
        for line in 0..dim {
            for start in 0..dim {
                let (row, col) = if vertical { (start, line) } else { (line, start) };
                // a word cannot begin right after another tile
                if start > 0 && !board.is_empty_at(row - dr, col - dc) {
                    continue;
                }
                let mut placement = Placement {
                    start_row: row,
                    start_col: col,
                    vertical,
                    word: Vec::with_capacity(dim),
                    placed: Vec::with_capacity(7),
                    connected: false,
                };
                let mut rack = *rack;
                self.extend(board, &mut rack, &mut placement, row, col);
            }
        }
    }

    /// Extends the current placement at (row, col): absorb an occupied
    /// square, or try every rack tile, recording complete legal words.
    fn extend(
        &mut self,
        board: &Board,
        rack: &mut Rack,
        placement: &mut Placement,
        row: usize,
        col: usize,
    ) {
        let dim = board.dim();
        let (dr, dc) = if placement.vertical { (1, 0) } else { (0, 1) };
        let off_board = row >= dim || col >= dim;
        if !off_board && !board.is_empty_at(row, col) {
            placement.word.push(intrinsic_tile(board.letter_at(row, col)));
            placement.connected = true;
            self.extend(board, rack, placement, row + dr, col + dc);
            placement.word.pop();
            return;
        }
        // the word may end just before this square
        self.maybe_record(board, placement);
        if off_board || rack.is_empty() {
            return;
        }
        if !placement.word.is_empty() && !self.lexicon.is_prefix(&placement.word) {
            return;
        }
        for letter in 0..ALPHABET_SIZE as u8 {
            if rack.count(letter) == 0 {
                continue;
            }
            if letter > 0 {
                self.try_tile(board, rack, placement, row, col, letter, letter);
            } else {
                // a blank can stand for any letter
                for as_letter in 1..=26 {
                    self.try_tile(board, rack, placement, row, col, letter, as_letter);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn try_tile(
        &mut self,
        board: &Board,
        rack: &mut Rack,
        placement: &mut Placement,
        row: usize,
        col: usize,
        rack_tile: u8,
        as_letter: u8,
    ) {
        let board_tile = if rack_tile == 0 {
            as_letter | BLANK_MASK
        } else {
            as_letter
        };
        let cross = board.cross_word(row, col, placement.vertical, board_tile);
        let mut connected = placement.connected;
        if !cross.is_empty() {
            let normalized: Vec<u8> = cross.iter().map(|&t| intrinsic_tile(t)).collect();
            if !self.lexicon.is_word(&normalized) {
                return;
            }
            connected = true;
        }
        let was_connected = placement.connected;
        rack.take_tile(rack_tile);
        placement.word.push(as_letter);
        placement.placed.push(board_tile);
        placement.connected = connected;
        let (dr, dc) = if placement.vertical { (1, 0) } else { (0, 1) };
        self.extend(board, rack, placement, row + dr, col + dc);
        placement.connected = was_connected;
        placement.placed.pop();
        placement.word.pop();
        rack.add_tile(rack_tile);
    }

    fn maybe_record(&mut self, board: &Board, placement: &Placement) {
        if placement.placed.is_empty() || placement.word.len() < 2 {
            return;
        }
        let connected = placement.connected
            || (board.is_blank() && self.covers_center(board, placement));
        if !connected || !self.lexicon.is_word(&placement.word) {
            return;
        }
        // one-tile plays read identically in both directions; keep the
        // horizontal rendering when the tile extends a horizontal word
        if placement.vertical && placement.placed.len() == 1 {
            let (r, c) = self.single_tile_square(board, placement);
            let dim = board.dim();
            let has_horizontal_neighbor = (c > 0 && !board.is_empty_at(r, c - 1))
                || (c + 1 < dim && !board.is_empty_at(r, c + 1));
            if has_horizontal_neighbor {
                return;
            }
        }
        let span = self.span_tiles(board, placement);
        let score = board.score_placement(
            placement.start_row,
            placement.start_col,
            placement.vertical,
            &span,
            &self.ld,
        );
        match self.recorder {
            PlayRecorder::AllSmall => {
                let tiny = TinyMove::from_placement(
                    placement.start_row as u8,
                    placement.start_col as u8,
                    placement.vertical,
                    &placement.placed,
                );
                self.small_plays.push(SmallMove::new(tiny, score));
            }
            PlayRecorder::TopOnly => {
                if self.top.as_ref().is_none_or(|best| score > best.score) {
                    self.top = Some(Move {
                        kind: MoveKind::TilePlacement,
                        row: placement.start_row as u8,
                        col: placement.start_col as u8,
                        vertical: placement.vertical,
                        tiles: span,
                        score,
                        tiles_played: placement.placed.len() as u8,
                    });
                }
            }
        }
    }

    /// Rebuilds the span with 0 markers for absorbed squares.
    fn span_tiles(&self, board: &Board, placement: &Placement) -> Vec<u8> {
        let (dr, dc) = if placement.vertical { (1, 0) } else { (0, 1) };
        let mut span = Vec::with_capacity(placement.word.len());
        let (mut r, mut c) = (placement.start_row, placement.start_col);
        let mut placed_idx = 0;
        for _ in 0..placement.word.len() {
            if board.is_empty_at(r, c) {
                span.push(placement.placed[placed_idx]);
                placed_idx += 1;
            } else {
                span.push(0);
            }
            r += dr;
            c += dc;
        }
        span
    }

    fn single_tile_square(&self, board: &Board, placement: &Placement) -> (usize, usize) {
        let (dr, dc) = if placement.vertical { (1, 0) } else { (0, 1) };
        let (mut r, mut c) = (placement.start_row, placement.start_col);
        while !board.is_empty_at(r, c) {
            r += dr;
            c += dc;
        }
        (r, c)
    }

    fn covers_center(&self, board: &Board, placement: &Placement) -> bool {
        let center = board.dim() / 2;
        let (dr, dc) = if placement.vertical { (1, 0) } else { (0, 1) };
        let (mut r, mut c) = (placement.start_row, placement.start_col);
        for _ in 0..placement.word.len() {
            if (r, c) == (center, center) {
                return true;
            }
            r += dr;
            c += dc;
        }
        false
    }
}
