//! The tile bag.
//!
//! Tiles are drawn from the *end* of the vector. Solver code arranges
//! deterministic draws by moving chosen tiles to the beginning, where they
//! are drawn last; everything behind them comes off first.

use crate::game::alphabet::LetterDistribution;
use rand::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bag {
    tiles: Vec<u8>,
}

impl Bag {
    /// A full bag, tiles in letter order. Shuffle before live play.
    pub fn full(ld: &LetterDistribution) -> Self {
        let mut tiles = Vec::with_capacity(ld.num_tiles());
        for letter in 0..crate::consts::ALPHABET_SIZE as u8 {
            for _ in 0..ld.freq(letter) {
                tiles.push(letter);
            }
        }
        Self { tiles }
    }

    pub fn empty() -> Self {
        Self { tiles: Vec::new() }
    }

    pub fn from_tiles(tiles: Vec<u8>) -> Self {
        Self { tiles }
    }

    #[inline(always)]
    pub fn tiles_remaining(&self) -> usize {
        self.tiles.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// The unseen tiles in bag order; index 0 is drawn last.
    #[inline(always)]
    pub fn peek(&self) -> &[u8] {
        &self.tiles
    }

    #[inline]
    pub fn pop(&mut self) -> Option<u8> {
        self.tiles.pop()
    }

    pub fn push(&mut self, tile: u8) {
        self.tiles.push(tile);
    }

    pub fn shuffle(&mut self, rng: &mut dyn RngCore) {
        self.tiles.shuffle(rng);
    }

    /// Removes one tile by value. Searches from the draw end so arranged
    /// prefixes stay untouched. Returns false if the tile is not in the bag.
    pub fn remove_tile(&mut self, tile: u8) -> bool {
        match self.tiles.iter().rposition(|&t| t == tile) {
            Some(pos) => {
                self.tiles.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Rearranges the bag so `tiles` occupy the beginning (drawn last).
    /// Returns false when the bag does not contain all of them.
    pub fn move_tiles_to_beginning(&mut self, tiles: &[u8]) -> bool {
        if tiles.len() > self.tiles.len() {
            return false;
        }
        for (i, &want) in tiles.iter().enumerate() {
            let Some(off) = self.tiles[i..].iter().rposition(|&t| t == want) else {
                return false;
            };
            self.tiles.swap(i, i + off);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arranged_tiles_are_drawn_last() {
        let mut bag = Bag::from_tiles(vec![1, 2, 3, 4, 5]);
        assert!(bag.move_tiles_to_beginning(&[5, 3]));
        assert_eq!(&bag.peek()[..2], &[5, 3]);
        // drain: the arranged prefix surfaces at the very end
        let mut drawn = Vec::new();
        while let Some(t) = bag.pop() {
            drawn.push(t);
        }
        assert_eq!(&drawn[3..], &[3, 5]);
    }

    #[test]
    fn move_missing_tile_fails() {
        let mut bag = Bag::from_tiles(vec![1, 2]);
        assert!(!bag.move_tiles_to_beginning(&[9]));
    }

    #[test]
    fn full_bag_matches_distribution() {
        let ld = LetterDistribution::english();
        assert_eq!(Bag::full(&ld).tiles_remaining(), 100);
    }
}
