//! The transposition table.
//!
//! A flat array of 16-byte entries, one per bucket, keyed by
//! `hash mod capacity`. The top five bytes of the hash are stored for
//! verification; a mismatch is a miss, which also rejects any entry a
//! concurrent writer left half-visible. Scores are stored relative to the
//! on-turn spread so entries are reusable from any score baseline.
//!
//! In multi-threaded mode the buckets are guarded by a power-of-two set of
//! stripe locks; in single-threaded mode they are accessed directly. The
//! table owns the Zobrist keys and re-seeds them on every reset so stale
//! entries from a previous search can never verify.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sysinfo::System;
use tracing::debug;

use crate::moves::tiny::TinyMove;
use crate::search::zobrist::Zobrist;

pub const TT_EXACT: u8 = 0;
pub const TT_LOWER: u8 = 1;
pub const TT_UPPER: u8 = 2;
pub const TT_INVALID: u8 = 3;

const NUM_STRIPES: usize = 64;
const MIN_ENTRIES: u64 = 1 << 10;
// assumed when the platform will not report its memory
const FALLBACK_TOTAL_MEMORY: u64 = 4 << 30;

/// One bucket: verification tag, bound flag and depth, spread-relative
/// score, and the best move found at this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    top4: u32,
    fifth: u8,
    flag_and_depth: u8,
    score: i16,
    play: TinyMove,
}

impl TableEntry {
    const EMPTY: TableEntry = TableEntry {
        top4: 0,
        fifth: 0,
        flag_and_depth: TT_INVALID << 6,
        score: 0,
        play: TinyMove::INVALID,
    };

    pub fn new(score: i16, flag: u8, depth: u8, play: TinyMove) -> Self {
        Self {
            top4: 0,
            fifth: 0,
            flag_and_depth: (flag << 6) | (depth & 0x3f),
            score,
            play,
        }
    }

    #[inline(always)]
    pub fn flag(&self) -> u8 {
        self.flag_and_depth >> 6
    }

    #[inline(always)]
    pub fn depth(&self) -> u8 {
        self.flag_and_depth & 0x3f
    }

    #[inline(always)]
    pub fn valid(&self) -> bool {
        self.flag() != TT_INVALID
    }

    /// Spread-relative score; the caller adds the on-turn spread back.
    #[inline(always)]
    pub fn score(&self) -> i16 {
        self.score
    }

    #[inline(always)]
    pub fn tiny_move(&self) -> TinyMove {
        self.play
    }

    #[inline(always)]
    fn matches(&self, hash: u64) -> bool {
        self.top4 == (hash >> 32) as u32 && self.fifth == (hash >> 24) as u8
    }
}

#[derive(Debug)]
pub struct TranspositionTable {
    entries: Box<[UnsafeCell<TableEntry>]>,
    num_entries: u64,
    stripes: Box<[Mutex<()>]>,
    multi_threaded: bool,
    zobrist: Zobrist,

    pub created: AtomicU64,
    pub lookups: AtomicU64,
    pub hits: AtomicU64,
    pub t2_collisions: AtomicU64,
}

// Entries are plain data behind UnsafeCell. Concurrent access only happens
// in multi-threaded mode, where every read and write holds the bucket's
// stripe lock.
unsafe impl Sync for TranspositionTable {}

impl TranspositionTable {
    pub fn new(board_dim: usize) -> Self {
        Self {
            entries: Self::alloc(MIN_ENTRIES),
            num_entries: MIN_ENTRIES,
            stripes: (0..NUM_STRIPES).map(|_| Mutex::new(())).collect(),
            multi_threaded: false,
            zobrist: Zobrist::new(board_dim),
            created: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            t2_collisions: AtomicU64::new(0),
        }
    }

    fn alloc(num_entries: u64) -> Box<[UnsafeCell<TableEntry>]> {
        (0..num_entries)
            .map(|_| UnsafeCell::new(TableEntry::EMPTY))
            .collect()
    }

    /// Reallocates to `fraction` of process-visible memory and re-seeds
    /// the Zobrist keys.
    pub fn reset(&mut self, fraction_of_mem: f64, board_dim: usize) {
        let fraction = fraction_of_mem.clamp(f64::MIN_POSITIVE, 1.0);
        let mut sys = System::new();
        sys.refresh_memory();
        let total = match sys.total_memory() {
            0 => FALLBACK_TOTAL_MEMORY,
            t => t,
        };
        let num_entries = (((total as f64) * fraction) as u64
            / std::mem::size_of::<TableEntry>() as u64)
            .max(MIN_ENTRIES);
        debug!(num_entries, fraction, "resetting transposition table");
        self.entries = Self::alloc(num_entries);
        self.num_entries = num_entries;
        self.zobrist = Zobrist::new(board_dim);
        self.created.store(0, Ordering::Relaxed);
        self.lookups.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.t2_collisions.store(0, Ordering::Relaxed);
    }

    pub fn zobrist(&self) -> &Zobrist {
        &self.zobrist
    }

    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    pub fn set_single_threaded_mode(&mut self) {
        self.multi_threaded = false;
    }

    pub fn set_multi_threaded_mode(&mut self) {
        self.multi_threaded = true;
    }

    #[inline(always)]
    fn bucket(&self, hash: u64) -> usize {
        (hash % self.num_entries) as usize
    }

    /// Returns the entry for `hash` if one is present and verifies.
    pub fn lookup(&self, hash: u64) -> Option<TableEntry> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let idx = self.bucket(hash);
        let entry = if self.multi_threaded {
            let _guard = self.stripes[idx & (NUM_STRIPES - 1)].lock();
            unsafe { *self.entries[idx].get() }
        } else {
            unsafe { *self.entries[idx].get() }
        };
        if !entry.valid() {
            return None;
        }
        if !entry.matches(hash) {
            self.t2_collisions.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry)
    }

    /// Stores an entry, overwriting whatever occupied the bucket.
    pub fn store(&self, hash: u64, mut entry: TableEntry) {
        entry.top4 = (hash >> 32) as u32;
        entry.fifth = (hash >> 24) as u8;
        let idx = self.bucket(hash);
        if self.multi_threaded {
            let _guard = self.stripes[idx & (NUM_STRIPES - 1)].lock();
            unsafe { *self.entries[idx].get() = entry };
        } else {
            unsafe { *self.entries[idx].get() = entry };
        }
        self.created.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> TranspositionTable {
        // keep the default minimum allocation; no reset needed in tests
        TranspositionTable::new(15)
    }

    #[test]
    fn store_then_lookup_round_trips() {
        let tt = small_table();
        let hash = 0xdead_beef_cafe_f00d;
        tt.store(hash, TableEntry::new(42, TT_EXACT, 5, TinyMove::PASS));
        let entry = tt.lookup(hash).expect("stored entry is found");
        assert_eq!(entry.score(), 42);
        assert_eq!(entry.flag(), TT_EXACT);
        assert_eq!(entry.depth(), 5);
        assert_eq!(entry.tiny_move(), TinyMove::PASS);
    }

    #[test]
    fn never_stored_key_misses() {
        let tt = small_table();
        assert!(tt.lookup(0x1234_5678_9abc_def0).is_none());
        // same bucket, different verification bytes
        let a = 0x0101_0101_0000_0000u64;
        let b = 0x0202_0202_0000_0000u64;
        assert_eq!(tt.bucket(a), tt.bucket(b));
        tt.store(a, TableEntry::new(7, TT_LOWER, 3, TinyMove::PASS));
        assert!(tt.lookup(b).is_none());
        assert_eq!(tt.t2_collisions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn later_store_wins_the_bucket() {
        let tt = small_table();
        let a = 0x0101_0101_0000_0000u64;
        let b = 0x0202_0202_0000_0000u64;
        tt.store(a, TableEntry::new(1, TT_EXACT, 2, TinyMove::PASS));
        tt.store(b, TableEntry::new(2, TT_UPPER, 4, TinyMove::PASS));
        assert!(tt.lookup(a).is_none());
        assert_eq!(tt.lookup(b).unwrap().score(), 2);
    }

    #[test]
    fn flags_and_depth_share_a_byte() {
        let e = TableEntry::new(-100, TT_UPPER, 63, TinyMove::INVALID);
        assert_eq!(e.flag(), TT_UPPER);
        assert_eq!(e.depth(), 63);
        assert!(e.valid());
        assert!(!TableEntry::EMPTY.valid());
    }

    #[test]
    fn multi_threaded_stress_never_returns_torn_entries() {
        let mut tt = small_table();
        tt.set_multi_threaded_mode();
        let tt = &tt;
        std::thread::scope(|s| {
            for t in 0..4u64 {
                s.spawn(move || {
                    for i in 0..20_000u64 {
                        let hash = (i << 24) ^ (t << 56) ^ 0x55aa;
                        let score = (hash >> 32) as i16 ^ (hash >> 24) as i16;
                        tt.store(hash, TableEntry::new(score, TT_EXACT, 1, TinyMove::PASS));
                        if let Some(e) = tt.lookup(hash) {
                            // a verified entry always carries the payload
                            // its writer stored with those hash bytes
                            assert_eq!(
                                e.score(),
                                (hash >> 32) as i16 ^ (hash >> 24) as i16
                            );
                        }
                    }
                });
            }
        });
    }
}
