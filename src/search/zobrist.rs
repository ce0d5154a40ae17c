//! Zobrist hashing of a game position.
//!
//! The hash folds together every occupied square, the per-letter counts of
//! both racks, the scoreless-turn counter and the side to move, so that a
//! position reached by different move orders maps to the same key.
//! <https://en.wikipedia.org/wiki/Zobrist_hashing>

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::consts::{ALPHABET_SIZE, POS_TABLE_WIDTH, RACK_TILE_LIMIT};
use crate::game::alphabet::intrinsic_tile;
use crate::game::board::Board;
use crate::game::rack::Rack;
use crate::moves::tiny::SmallMove;
use crate::search::SolverError;

// Keys are uniform in [1, 2^63 - 1]; zero never appears so an XOR of keys
// cannot silently cancel to an "unset" value.
const KEY_MAX: u64 = (1 << 63) - 1;

#[derive(Debug)]
pub struct Zobrist {
    minimizing_player_to_move: u64,
    pos_table: Vec<[u64; POS_TABLE_WIDTH]>,
    max_rack_table: [[u64; RACK_TILE_LIMIT]; ALPHABET_SIZE],
    min_rack_table: [[u64; RACK_TILE_LIMIT]; ALPHABET_SIZE],
    scoreless_turns: [u64; 3],
    dim: usize,
}

impl Zobrist {
    /// Fresh keys for a `dim` x `dim` board, seeded from the OS CSPRNG.
    pub fn new(dim: usize) -> Self {
        let mut rng = StdRng::from_os_rng();
        let mut key = || rng.random_range(1..=KEY_MAX);
        let mut pos_table = Vec::with_capacity(dim * dim);
        for _ in 0..dim * dim {
            let mut square = [0u64; POS_TABLE_WIDTH];
            square.iter_mut().for_each(|k| *k = key());
            pos_table.push(square);
        }
        let mut max_rack_table = [[0u64; RACK_TILE_LIMIT]; ALPHABET_SIZE];
        let mut min_rack_table = [[0u64; RACK_TILE_LIMIT]; ALPHABET_SIZE];
        for letter in 0..ALPHABET_SIZE {
            for ct in 0..RACK_TILE_LIMIT {
                max_rack_table[letter][ct] = key();
                min_rack_table[letter][ct] = key();
            }
        }
        Self {
            minimizing_player_to_move: key(),
            pos_table,
            max_rack_table,
            min_rack_table,
            scoreless_turns: [key(), key(), key()],
            dim,
        }
    }

    #[inline(always)]
    fn scoreless_key(&self, turns: u8) -> u64 {
        self.scoreless_turns[(turns as usize).min(2)]
    }

    /// Full fold over a position. The maximizing player is the one the
    /// search is solving for.
    pub fn hash(
        &self,
        squares: &[u8],
        max_player_rack: &Rack,
        min_player_rack: &Rack,
        min_player_to_move: bool,
        scoreless_turns: u8,
    ) -> u64 {
        let mut key = 0u64;
        for (i, &tile) in squares.iter().enumerate() {
            if tile == 0 {
                continue;
            }
            key ^= self.pos_table[i][tile as usize];
        }
        for (letter, &ct) in max_player_rack.counts().iter().enumerate() {
            key ^= self.max_rack_table[letter][ct as usize];
        }
        for (letter, &ct) in min_player_rack.counts().iter().enumerate() {
            key ^= self.min_rack_table[letter][ct as usize];
        }
        if min_player_to_move {
            key ^= self.minimizing_player_to_move;
        }
        key ^= self.scoreless_key(scoreless_turns);
        key
    }

    /// Incrementally applies a move to a position key, before the move is
    /// played on `board`. `rack_before` is the mover's rack and `drew` the
    /// tiles the mover draws afterwards. Satisfies
    /// `hash(after) == add_move(hash(before), ..)`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_move(
        &self,
        key: u64,
        m: &SmallMove,
        board: &Board,
        rack_before: &Rack,
        drew: &[u8],
        max_player_moved: bool,
        new_scoreless: u8,
        old_scoreless: u8,
    ) -> Result<u64, SolverError> {
        let mut key = key;
        let rack_table = if max_player_moved {
            &self.max_rack_table
        } else {
            &self.min_rack_table
        };
        if !m.is_pass() {
            let mut counts = *rack_before.counts();
            let dim = self.dim;
            let mut walk_err = None;
            m.tiny().for_each_placed(board, |r, c, tile| {
                key ^= self.pos_table[r * dim + c][tile as usize];
                let letter = intrinsic_tile(tile) as usize;
                if counts[letter] == 0 {
                    walk_err = Some(SolverError::Internal(
                        "move plays tiles the rack does not hold".into(),
                    ));
                    return;
                }
                let ct = counts[letter] as usize;
                key ^= rack_table[letter][ct];
                counts[letter] -= 1;
                key ^= rack_table[letter][ct - 1];
            })?;
            if let Some(e) = walk_err {
                return Err(e);
            }
            for &tile in drew {
                let letter = intrinsic_tile(tile) as usize;
                let ct = counts[letter] as usize;
                key ^= rack_table[letter][ct];
                counts[letter] += 1;
                key ^= rack_table[letter][ct + 1];
            }
        }
        key ^= self.scoreless_key(old_scoreless);
        key ^= self.scoreless_key(new_scoreless);
        key ^= self.minimizing_player_to_move;
        Ok(key)
    }
}
