//! Game state: board, bag, racks, scores, turn and scoreless-turn
//! accounting, and play/unplay with a fixed-capacity undo stack.

pub mod alphabet;
pub mod bag;
pub mod board;
pub mod rack;

use std::sync::Arc;

use crate::consts::{ENDGAME_SCORELESS_LIMIT, RACK_SIZE, STANDARD_SCORELESS_LIMIT};
use crate::moves::move_gen::Lexicon;
use crate::moves::{Move, MoveKind, tiny::SmallMove};
use crate::search::SolverError;
use alphabet::LetterDistribution;
use bag::Bag;
use board::Board;
use rack::Rack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    GameOver,
}

/// Simulation mode preallocates the undo stack and never shuffles draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode {
    None,
    Simulation,
}

/// One undo frame. Frames are reused in place so deep searches do not
/// allocate per node.
#[derive(Debug, Clone, Default)]
struct Backup {
    mover: usize,
    mover_rack: Rack,
    scores: [i16; 2],
    scoreless_turns: u8,
    last_scoreless_turns: u8,
    placed: Vec<(usize, usize, u8)>,
    drawn: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Game {
    ld: Arc<LetterDistribution>,
    lexicon: Arc<Lexicon>,
    board: Board,
    bag: Bag,
    racks: [Rack; 2],
    scores: [i16; 2],
    on_turn: usize,
    scoreless_turns: u8,
    last_scoreless_turns: u8,
    scoreless_limit: u8,
    play_state: PlayState,
    backup_mode: BackupMode,
    backups: Vec<Backup>,
    stack_len: usize,
}

impl Game {
    pub fn new(ld: Arc<LetterDistribution>, lexicon: Arc<Lexicon>) -> Self {
        let bag = Bag::full(&ld);
        Self {
            ld,
            lexicon,
            board: Board::new(),
            bag,
            racks: [Rack::empty(), Rack::empty()],
            scores: [0, 0],
            on_turn: 0,
            scoreless_turns: 0,
            last_scoreless_turns: 0,
            scoreless_limit: STANDARD_SCORELESS_LIMIT,
            play_state: PlayState::Playing,
            backup_mode: BackupMode::None,
            backups: Vec::new(),
            stack_len: 0,
        }
    }

    /// Builds a mid-game position from literal board rows, racks and
    /// scores. The bag is reduced by everything on the board and racks.
    pub fn from_position(
        ld: Arc<LetterDistribution>,
        lexicon: Arc<Lexicon>,
        rows: &[&str],
        racks: [&str; 2],
        scores: [i16; 2],
        on_turn: usize,
    ) -> miette::Result<Self> {
        let board = Board::from_rows(rows)?;
        let mut bag = Bag::full(&ld);
        for &tile in board.get_squares() {
            if tile != 0 {
                let intrinsic = alphabet::intrinsic_tile(tile);
                miette::ensure!(
                    bag.remove_tile(intrinsic),
                    "board uses more {:?} tiles than the distribution has",
                    alphabet::letter_to_char(intrinsic)
                );
            }
        }
        let mut game_racks = [Rack::empty(), Rack::empty()];
        for (p, letters) in racks.iter().enumerate() {
            for tile in alphabet::letters_from_str(letters)? {
                let intrinsic = alphabet::intrinsic_tile(tile);
                miette::ensure!(
                    bag.remove_tile(intrinsic),
                    "rack {p} tile unavailable: {letters:?}"
                );
                game_racks[p].add_tile(intrinsic);
            }
        }
        let mut game = Self::new(ld, lexicon);
        game.board = board;
        game.bag = bag;
        game.racks = game_racks;
        game.scores = scores;
        game.on_turn = on_turn;
        Ok(game)
    }

    #[inline(always)]
    pub fn ld(&self) -> &LetterDistribution {
        &self.ld
    }

    #[inline(always)]
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    #[inline(always)]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    #[inline(always)]
    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    pub fn bag_mut(&mut self) -> &mut Bag {
        &mut self.bag
    }

    #[inline(always)]
    pub fn rack_for(&self, player: usize) -> &Rack {
        &self.racks[player]
    }

    #[inline(always)]
    pub fn player_on_turn(&self) -> usize {
        self.on_turn
    }

    #[inline(always)]
    pub fn score_for(&self, player: usize) -> i16 {
        self.scores[player]
    }

    #[inline(always)]
    pub fn spread_for(&self, player: usize) -> i16 {
        self.scores[player] - self.scores[1 - player]
    }

    /// Spread from the perspective of the player on turn.
    #[inline(always)]
    pub fn current_spread(&self) -> i16 {
        self.spread_for(self.on_turn)
    }

    #[inline(always)]
    pub fn scoreless_turns(&self) -> u8 {
        self.scoreless_turns
    }

    #[inline(always)]
    pub fn last_scoreless_turns(&self) -> u8 {
        self.last_scoreless_turns
    }

    #[inline(always)]
    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    /// Endgame mode ends the game after two consecutive scoreless turns.
    pub fn set_endgame_mode(&mut self, on: bool) {
        self.scoreless_limit = if on {
            ENDGAME_SCORELESS_LIMIT
        } else {
            STANDARD_SCORELESS_LIMIT
        };
    }

    pub fn set_backup_mode(&mut self, mode: BackupMode) {
        self.backup_mode = mode;
    }

    /// Preallocates `n` undo frames; the search pushes at most one frame
    /// per ply. Frames already in use are untouched.
    pub fn set_state_stack_length(&mut self, n: usize) {
        if self.backups.len() < n {
            self.backups.resize_with(n, Backup::default);
        }
    }

    /// An independent copy for a worker thread, with a fresh undo stack.
    pub fn copy(&self) -> Self {
        let mut copy = self.clone();
        copy.backups = self.backups.iter().map(|_| Backup::default()).collect();
        copy.stack_len = 0;
        copy
    }

    /// Moves a player's rack back into the bag.
    pub fn throw_racks_in_for(&mut self, player: usize) {
        for tile in self.racks[player].tiles_on() {
            self.bag.push(tile);
        }
        self.racks[player].clear();
    }

    /// Refills a player's rack from the bag. With `Some(tiles)` the named
    /// tiles are pulled from the bag first; the rest (or everything, with
    /// `None`) is drawn from the draw end. The current rack is thrown in
    /// first.
    pub fn set_random_rack(
        &mut self,
        player: usize,
        tiles: Option<&[u8]>,
    ) -> Result<(), SolverError> {
        self.throw_racks_in_for(player);
        if let Some(tiles) = tiles {
            for &t in tiles {
                if !self.bag.remove_tile(t) {
                    return Err(SolverError::InvalidPrecondition(format!(
                        "tile {:?} is not among the unseen tiles",
                        alphabet::letter_to_char(t)
                    )));
                }
                self.racks[player].add_tile(t);
            }
        }
        while self.racks[player].num_tiles() < RACK_SIZE as u8 {
            match self.bag.pop() {
                Some(t) => self.racks[player].add_tile(t),
                None => break,
            }
        }
        Ok(())
    }

    /// Replaces a player's rack with exactly the named tiles, returning
    /// the old rack to the bag. Used when replaying transcripts.
    pub fn set_known_rack(&mut self, player: usize, tiles: &[u8]) -> Result<(), SolverError> {
        self.throw_racks_in_for(player);
        for &t in tiles {
            let intrinsic = alphabet::intrinsic_tile(t);
            if !self.bag.remove_tile(intrinsic) {
                return Err(SolverError::InvalidPrecondition(format!(
                    "rack tile {:?} is not among the unseen tiles",
                    alphabet::letter_to_char(intrinsic)
                )));
            }
            self.racks[player].add_tile(intrinsic);
        }
        Ok(())
    }

    /// Exchanges tiles with the bag as a scoreless turn. Only used while
    /// replaying transcripts; exchanges are never searched.
    pub fn exchange_tiles(&mut self, player: usize, tiles: &[u8]) -> Result<(), SolverError> {
        if self.bag.tiles_remaining() < RACK_SIZE {
            return Err(SolverError::InvalidPrecondition(
                "exchanging needs a full rack's worth of tiles in the bag".into(),
            ));
        }
        for &t in tiles {
            if !self.racks[player].take_tile(t) {
                return Err(SolverError::InvalidPrecondition(format!(
                    "exchanged tile {:?} is not on the rack",
                    alphabet::letter_to_char(alphabet::intrinsic_tile(t))
                )));
            }
        }
        for _ in 0..tiles.len() {
            if let Some(drawn) = self.bag.pop() {
                self.racks[player].add_tile(drawn);
            }
        }
        for &t in tiles {
            self.bag.push(alphabet::intrinsic_tile(t));
        }
        self.last_scoreless_turns = self.scoreless_turns;
        self.scoreless_turns += 1;
        self.on_turn = 1 - player;
        Ok(())
    }

    fn backup_frame(&mut self) -> usize {
        if self.stack_len >= self.backups.len() {
            self.backups.push(Backup::default());
        }
        self.stack_len
    }

    /// Plays a move, drawing replacement tiles and applying end-of-game
    /// adjustments. State is restorable with [`Game::unplay_last_move`].
    pub fn play_move(&mut self, m: &Move) -> Result<(), SolverError> {
        if self.play_state == PlayState::GameOver {
            return Err(SolverError::Internal("move played after game end".into()));
        }
        let frame = self.backup_frame();
        let mover = self.on_turn;
        {
            let b = &mut self.backups[frame];
            b.mover = mover;
            b.mover_rack = self.racks[mover];
            b.scores = self.scores;
            b.scoreless_turns = self.scoreless_turns;
            b.last_scoreless_turns = self.last_scoreless_turns;
            b.placed.clear();
            b.drawn.clear();
        }
        self.stack_len += 1;

        match m.kind {
            MoveKind::Pass => {
                self.last_scoreless_turns = self.scoreless_turns;
                self.scoreless_turns += 1;
            }
            MoveKind::TilePlacement => {
                let (dr, dc) = if m.vertical { (1, 0) } else { (0, 1) };
                for (i, &tile) in m.tiles.iter().enumerate() {
                    if tile == 0 {
                        continue;
                    }
                    let (r, c) = (m.row as usize + dr * i, m.col as usize + dc * i);
                    if !self.board.is_empty_at(r, c) {
                        self.unwind_partial(frame);
                        return Err(SolverError::Internal(format!(
                            "square ({r}, {c}) is already occupied"
                        )));
                    }
                    self.board.place(r, c, tile);
                    self.backups[frame].placed.push((r, c, tile));
                    if !self.racks[mover].take_tile(tile) {
                        self.unwind_partial(frame);
                        return Err(SolverError::Internal(format!(
                            "rack does not hold {:?}",
                            alphabet::letter_to_char(alphabet::intrinsic_tile(tile))
                        )));
                    }
                }
                self.scores[mover] += m.score;
                for _ in 0..m.tiles_played {
                    match self.bag.pop() {
                        Some(t) => {
                            self.racks[mover].add_tile(t);
                            self.backups[frame].drawn.push(t);
                        }
                        None => break,
                    }
                }
                self.last_scoreless_turns = self.scoreless_turns;
                self.scoreless_turns = if m.score == 0 {
                    self.scoreless_turns + 1
                } else {
                    0
                };
                if self.racks[mover].is_empty() && self.bag.is_empty() {
                    // going out: gain twice the opponent's remaining tiles
                    self.play_state = PlayState::GameOver;
                    self.scores[mover] += 2 * self.racks[1 - mover].score_on(&self.ld);
                }
            }
        }
        if self.play_state == PlayState::Playing && self.scoreless_turns >= self.scoreless_limit
        {
            self.play_state = PlayState::GameOver;
            self.scores[0] -= self.racks[0].score_on(&self.ld);
            self.scores[1] -= self.racks[1].score_on(&self.ld);
        }
        self.on_turn = 1 - mover;
        Ok(())
    }

    /// Plays a compact move by decoding it against the current board.
    pub fn play_small(&mut self, sm: &SmallMove) -> Result<(), SolverError> {
        let m = sm.to_move(&self.board)?;
        self.play_move(&m)
    }

    /// Restores the state before the most recent play.
    pub fn unplay_last_move(&mut self) {
        debug_assert!(self.stack_len > 0, "unplay with empty backup stack");
        self.stack_len -= 1;
        let frame = self.stack_len;
        let mover = self.backups[frame].mover;
        for i in (0..self.backups[frame].drawn.len()).rev() {
            let tile = self.backups[frame].drawn[i];
            self.bag.push(tile);
        }
        for i in 0..self.backups[frame].placed.len() {
            let (r, c, _) = self.backups[frame].placed[i];
            self.board.remove(r, c);
        }
        self.racks[mover] = self.backups[frame].mover_rack;
        self.scores = self.backups[frame].scores;
        self.scoreless_turns = self.backups[frame].scoreless_turns;
        self.last_scoreless_turns = self.backups[frame].last_scoreless_turns;
        self.play_state = PlayState::Playing;
        self.on_turn = mover;
    }

    // Rolls back board/rack changes of a half-applied move.
    fn unwind_partial(&mut self, frame: usize) {
        for i in 0..self.backups[frame].placed.len() {
            let (r, c, _) = self.backups[frame].placed[i];
            self.board.remove(r, c);
        }
        self.racks[self.backups[frame].mover] = self.backups[frame].mover_rack;
        self.stack_len -= 1;
    }
}

#[cfg(test)]
mod tests;
