//! The exact endgame solver.
//!
//! Iterative-deepening negamax with alpha-beta pruning over empty-bag
//! positions. The evaluator is the exact on-turn spread at the leaf, so at
//! sufficient depth the root value is the true optimal spread delta. A
//! transposition table keyed by incremental Zobrist hashes accelerates the
//! search, and with two or more threads a Lazy-SMP scheme runs helper
//! searches at staggered depths with perturbed root orderings to warm the
//! shared table for the main thread.

use std::cmp::Reverse;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::consts::{EARLY_PASS_OFFSET, HASH_MOVE_OFFSET, HUGE_NUMBER};
use crate::game::{BackupMode, Game, PlayState};
use crate::moves::Move;
use crate::moves::move_gen::{MoveGenerator, PlayRecorder, SortingParameter};
use crate::moves::tiny::{SmallMove, TinyMove, tiny_to_move};
use crate::search::tt::{TT_EXACT, TT_LOWER, TT_UPPER, TableEntry, TranspositionTable};
use crate::search::{PVLine, SolverError};

/// Result of a [`Solver::solve`] call. A canceled search still reports the
/// best line completed before cancellation.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub value: i16,
    pub pv: Vec<Move>,
    pub canceled: bool,
}

/// Shared references every search thread needs. Copyable so each helper
/// closure gets its own.
#[derive(Clone, Copy)]
struct SearchShared<'a> {
    tt: &'a TranspositionTable,
    tt_enabled: bool,
    early_pass: bool,
    solving_player: usize,
    initial_spread: i16,
    nodes: &'a AtomicU64,
    canceled: &'a AtomicBool,
    helper_stop: Option<&'a AtomicBool>,
}

impl SearchShared<'_> {
    #[inline(always)]
    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
            || self.helper_stop.is_some_and(|h| h.load(Ordering::Relaxed))
    }
}

/// Per-thread search state: an independent game copy, its own generator,
/// and this thread's copy of the root move list.
struct Worker {
    game: Game,
    movegen: Box<dyn MoveGenerator + Send + Sync>,
    initial_moves: Vec<SmallMove>,
    // the ply this thread's current iteration started at; negamax reuses
    // the carried-over root list exactly at this depth
    current_id_depth: i32,
}

pub struct Solver {
    workers: Vec<Worker>,
    tt: TranspositionTable,
    nodes: AtomicU64,
    canceled: Arc<AtomicBool>,

    threads: usize,
    early_pass: bool,
    iterative_deepening: bool,
    first_win: bool,
    transposition_table: bool,
    lazy_smp: bool,
    tt_fraction: f64,

    solving_player: usize,
    initial_spread: i16,
    principal_variation: PVLine,
    best_pv_value: i16,
}

impl Solver {
    pub fn new(game: Game, mut movegen: Box<dyn MoveGenerator + Send + Sync>) -> Self {
        let dim = game.board().dim();
        movegen.set_gen_pass(true);
        movegen.set_play_recorder(PlayRecorder::AllSmall);
        movegen.set_sorting_parameter(SortingParameter::None);
        Self {
            workers: vec![Worker {
                game,
                movegen,
                initial_moves: Vec::new(),
                current_id_depth: -1,
            }],
            tt: TranspositionTable::new(dim),
            nodes: AtomicU64::new(0),
            canceled: Arc::new(AtomicBool::new(false)),
            threads: 1,
            early_pass: true,
            iterative_deepening: true,
            first_win: false,
            transposition_table: true,
            lazy_smp: false,
            tt_fraction: 0.25,
            solving_player: 0,
            initial_spread: 0,
            principal_variation: PVLine::new(),
            best_pv_value: 0,
        }
    }

    /// Two or more threads turn on Lazy-SMP.
    pub fn set_threads(&mut self, threads: usize) {
        if threads < 2 {
            self.threads = 1;
            self.lazy_smp = false;
        } else {
            self.threads = threads;
            self.lazy_smp = true;
        }
    }

    pub fn set_iterative_deepening(&mut self, on: bool) {
        self.iterative_deepening = on;
    }

    pub fn set_transposition_table(&mut self, on: bool) {
        self.transposition_table = on;
    }

    pub fn set_first_win(&mut self, on: bool) {
        self.first_win = on;
    }

    pub fn set_early_pass(&mut self, on: bool) {
        self.early_pass = on;
    }

    pub fn set_tt_fraction_of_mem(&mut self, fraction: f64) {
        self.tt_fraction = fraction;
    }

    /// Flag other threads can set to abort an in-flight solve.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.canceled)
    }

    pub fn game(&self) -> &Game {
        &self.workers[0].game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.workers[0].game
    }

    pub fn set_play_recorder(&mut self, recorder: PlayRecorder) {
        self.workers[0].movegen.set_play_recorder(recorder);
    }

    /// Runs the generator over the solver's current position.
    pub fn generate_plays(&mut self) {
        let w = &mut self.workers[0];
        w.movegen.gen_all(&w.game, false);
    }

    pub fn small_plays(&self) -> &[SmallMove] {
        self.workers[0].movegen.small_plays()
    }

    pub fn top_play(&self) -> Option<&Move> {
        self.workers[0].movegen.top_play()
    }

    pub fn nodes_searched(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    /// Reallocates this solver's table; used by the pre-endgame driver,
    /// which gives each of its workers a slice of the memory budget.
    pub fn reset_table(&mut self, fraction_of_mem: f64) {
        self.tt_fraction = fraction_of_mem;
        let dim = self.workers[0].game.board().dim();
        self.tt.reset(fraction_of_mem, dim);
    }

    fn check_preconditions(&mut self) -> Result<(), SolverError> {
        let game = &mut self.workers[0].game;
        self.solving_player = game.player_on_turn();
        let opponent = 1 - self.solving_player;
        if game.rack_for(opponent).is_empty() {
            game.set_random_rack(opponent, None)?;
            if game.rack_for(opponent).is_empty() {
                return Err(SolverError::InvalidPrecondition(
                    "opponent rack is empty and cannot be filled".into(),
                ));
            }
        }
        if game.bag().tiles_remaining() > 0 {
            return Err(SolverError::InvalidPrecondition(
                "bag is not empty; the endgame solver needs an empty bag".into(),
            ));
        }
        Ok(())
    }

    /// Solves the position to `plies` half-moves, returning the optimal
    /// spread delta for the player on turn and the principal variation.
    pub fn solve(&mut self, plies: u32) -> Result<SolveOutcome, SolverError> {
        self.check_preconditions()?;
        if self.lazy_smp {
            if !self.transposition_table {
                return Err(SolverError::ConfigConflict(
                    "lazy-SMP requires the transposition table".into(),
                ));
            }
            if !self.iterative_deepening {
                return Err(SolverError::ConfigConflict(
                    "lazy-SMP requires iterative deepening".into(),
                ));
            }
            self.tt.set_multi_threaded_mode();
        } else {
            self.tt.set_single_threaded_mode();
        }
        if self.transposition_table {
            let dim = self.workers[0].game.board().dim();
            self.tt.reset(self.tt_fraction, dim);
        }
        let start = std::time::Instant::now();
        self.nodes.store(0, Ordering::Relaxed);
        self.principal_variation = PVLine::new();
        {
            let w = &mut self.workers[0];
            w.game.set_endgame_mode(true);
            w.game.set_backup_mode(BackupMode::Simulation);
            // helpers may search a couple of plies past the request
            w.game.set_state_stack_length(plies as usize + 2);
            w.movegen.set_sorting_parameter(SortingParameter::None);
            w.movegen.set_play_recorder(PlayRecorder::AllSmall);
            w.movegen.set_gen_pass(true);
            self.initial_spread = w.game.current_spread();
        }
        debug!(
            plies,
            spread = self.initial_spread,
            player = self.solving_player,
            "starting endgame solve"
        );
        let result = if self.lazy_smp {
            self.iteratively_deepen_lazy_smp(plies)
        } else {
            self.iteratively_deepen(plies)
        };
        let w = &mut self.workers[0];
        w.movegen.set_sorting_parameter(SortingParameter::Score);
        w.game.set_endgame_mode(false);
        let canceled = match result {
            Ok(()) => false,
            Err(SolverError::Canceled) => true,
            Err(e) => return Err(e),
        };
        info!(
            value = self.best_pv_value,
            nodes = self.nodes.load(Ordering::Relaxed),
            tt_lookups = self.tt.lookups.load(Ordering::Relaxed),
            tt_hits = self.tt.hits.load(Ordering::Relaxed),
            tt_stores = self.tt.created.load(Ordering::Relaxed),
            tt_collisions = self.tt.t2_collisions.load(Ordering::Relaxed),
            elapsed_ms = start.elapsed().as_millis() as u64,
            canceled,
            "endgame solve finished"
        );
        Ok(SolveOutcome {
            value: self.best_pv_value,
            pv: self.principal_variation.moves().to_vec(),
            canceled,
        })
    }

    /// Single-shot solve at exactly `plies`, reusing whatever is already
    /// in this solver's table. The pre-endgame driver calls this once per
    /// drawn-tile arrangement.
    pub fn quick_solve(&mut self, plies: u32) -> Result<(i16, Vec<Move>), SolverError> {
        self.check_preconditions()?;
        let shared = SearchShared {
            tt: &self.tt,
            tt_enabled: self.transposition_table,
            early_pass: self.early_pass,
            solving_player: self.solving_player,
            initial_spread: 0,
            nodes: &self.nodes,
            canceled: &*self.canceled,
            helper_stop: None,
        };
        let w = &mut self.workers[0];
        w.movegen.set_sorting_parameter(SortingParameter::None);
        w.movegen.set_play_recorder(PlayRecorder::AllSmall);
        w.movegen.set_gen_pass(true);
        w.game.set_endgame_mode(true);
        let initial_spread = w.game.current_spread();
        let shared = SearchShared {
            initial_spread,
            ..shared
        };
        let initial_hash = if self.transposition_table {
            self.tt.zobrist().hash(
                w.game.board().get_squares(),
                w.game.rack_for(self.solving_player),
                w.game.rack_for(1 - self.solving_player),
                false,
                w.game.scoreless_turns(),
            )
        } else {
            0
        };
        let (alpha, beta) = if self.first_win {
            (-1, 1)
        } else {
            (-HUGE_NUMBER, HUGE_NUMBER)
        };
        w.current_id_depth = -1;
        let mut pv = PVLine::new();
        let result = w.negamax(&shared, initial_hash, plies, alpha, beta, &mut pv);
        w.movegen.set_sorting_parameter(SortingParameter::Score);
        let val = result?;
        Ok((val - initial_spread, pv.moves().to_vec()))
    }

    fn root_hash(&self, w: &Worker) -> u64 {
        if !self.transposition_table {
            return 0;
        }
        self.tt.zobrist().hash(
            w.game.board().get_squares(),
            w.game.rack_for(self.solving_player),
            w.game.rack_for(1 - self.solving_player),
            false,
            w.game.scoreless_turns(),
        )
    }

    fn window(&self) -> (i16, i16) {
        if self.first_win {
            // probe for any winning move, magnitude ignored
            (-1, 1)
        } else {
            (-HUGE_NUMBER, HUGE_NUMBER)
        }
    }

    fn iteratively_deepen(&mut self, plies: u32) -> Result<(), SolverError> {
        let initial_hash = self.root_hash(&self.workers[0]);
        let (alpha, beta) = self.window();
        let shared = SearchShared {
            tt: &self.tt,
            tt_enabled: self.transposition_table,
            early_pass: self.early_pass,
            solving_player: self.solving_player,
            initial_spread: self.initial_spread,
            nodes: &self.nodes,
            canceled: &*self.canceled,
            helper_stop: None,
        };
        let w = &mut self.workers[0];
        w.current_id_depth = -1;
        w.movegen.gen_all(&w.game, false);
        w.initial_moves = w.movegen.small_plays().to_vec();
        w.assign_estimates_initial(shared.early_pass);
        let start = if self.iterative_deepening { 1 } else { plies };
        for p in start..=plies {
            debug!(ply = p, "deepening iteratively");
            w.current_id_depth = p as i32;
            let mut pv = PVLine::new();
            let val = w.negamax(&shared, initial_hash, p, alpha, beta, &mut pv)?;
            w.initial_moves
                .sort_unstable_by_key(|m| Reverse(m.estimated_value()));
            self.best_pv_value = val - shared.initial_spread;
            self.principal_variation = pv;
            info!(spread = val, ply = p, pv = %self.principal_variation, "best value");
        }
        Ok(())
    }

    fn iteratively_deepen_lazy_smp(&mut self, plies: u32) -> Result<(), SolverError> {
        if plies < 2 {
            return Err(SolverError::InvalidPrecondition(
                "lazy-SMP needs at least 2 plies".into(),
            ));
        }
        info!(threads = self.threads, "using lazy-SMP");
        self.workers.truncate(1);
        for _ in 1..self.threads {
            let game = self.workers[0].game.copy();
            let movegen = self.workers[0].movegen.clone_box();
            self.workers.push(Worker {
                game,
                movegen,
                initial_moves: Vec::new(),
                current_id_depth: -1,
            });
        }
        let shared = SearchShared {
            tt: &self.tt,
            tt_enabled: self.transposition_table,
            early_pass: self.early_pass,
            solving_player: self.solving_player,
            initial_spread: self.initial_spread,
            nodes: &self.nodes,
            canceled: &*self.canceled,
            helper_stop: None,
        };
        let initial_hash = {
            let w = &self.workers[0];
            self.tt.zobrist().hash(
                w.game.board().get_squares(),
                w.game.rack_for(self.solving_player),
                w.game.rack_for(1 - self.solving_player),
                false,
                w.game.scoreless_turns(),
            )
        };
        let (alpha, beta) = self.window();

        // seed estimates with a 1-ply pass before the deepening loop
        {
            let w = &mut self.workers[0];
            w.current_id_depth = -1;
            w.movegen.gen_all(&w.game, false);
            w.initial_moves = w.movegen.small_plays().to_vec();
            w.assign_estimates_initial(shared.early_pass);
            w.current_id_depth = 1;
            let mut pv = PVLine::new();
            w.negamax(&shared, initial_hash, 1, alpha, beta, &mut pv)?;
            w.initial_moves
                .sort_unstable_by_key(|m| Reverse(m.estimated_value()));
        }
        {
            let (w0, rest) = self.workers.split_first_mut().expect("worker 0 exists");
            for w in rest.iter_mut() {
                w.initial_moves = w0.initial_moves.clone();
            }
        }

        let mut best: Option<(i16, PVLine)> = None;
        for p in 2..=plies {
            debug!(ply = p, "deepening iteratively");
            let helper_stop = AtomicBool::new(false);
            let (w0, helpers) = self.workers.split_first_mut().expect("worker 0 exists");
            w0.current_id_depth = p as i32;
            let mut main_result: Result<i16, SolverError> = Err(SolverError::Canceled);
            let mut main_pv = PVLine::new();
            std::thread::scope(|s| {
                for (i, w) in helpers.iter_mut().enumerate() {
                    let t = i + 1;
                    let helper_depth = p + (t as u32) % 3;
                    w.current_id_depth = helper_depth as i32;
                    let helper_shared = SearchShared {
                        helper_stop: Some(&helper_stop),
                        ..shared
                    };
                    s.spawn(move || {
                        // helper results never reach the PV; they exist to
                        // warm the shared table
                        let mut pv = PVLine::new();
                        if let Err(e) = w.negamax(
                            &helper_shared,
                            initial_hash,
                            helper_depth,
                            alpha,
                            beta,
                            &mut pv,
                        ) {
                            debug!(thread = t, error = %e, "helper thread exited");
                        }
                        w.reorder_root_moves(t);
                    });
                }
                main_result = w0.negamax(&shared, initial_hash, p, alpha, beta, &mut main_pv);
                // stop helpers at the depth boundary; the scope joins them
                helper_stop.store(true, Ordering::Release);
            });
            match main_result {
                Ok(val) => {
                    w0.initial_moves
                        .sort_unstable_by_key(|m| Reverse(m.estimated_value()));
                    info!(spread = val, ply = p, pv = %main_pv, "best value");
                    best = Some((val - shared.initial_spread, main_pv));
                }
                Err(e) => {
                    if let Some((val, pv)) = best {
                        self.best_pv_value = val;
                        self.principal_variation = pv;
                    }
                    return Err(e);
                }
            }
        }
        if let Some((val, pv)) = best {
            self.best_pv_value = val;
            self.principal_variation = pv;
        }
        Ok(())
    }
}

impl Worker {
    /// Orders the root list for the first iteration, before any child
    /// values exist.
    fn assign_estimates_initial(&mut self, early_pass: bool) {
        let mut moves = std::mem::take(&mut self.initial_moves);
        self.assign_estimates(&mut moves, 0, TinyMove::INVALID, early_pass);
        self.initial_moves = moves;
    }

    /// Ordering heuristic: outplays get credit for the opponent's stuck
    /// tiles, otherwise favor score and (away from the horizon) tile
    /// turnover; the table's hash move and pass-after-pass jump the queue.
    fn assign_estimates(
        &mut self,
        moves: &mut [SmallMove],
        depth: u32,
        tt_move: TinyMove,
        early_pass: bool,
    ) {
        let g = &self.game;
        let stm = g.player_on_turn();
        let num_tiles_on_rack = g.rack_for(stm).num_tiles();
        let other_rack_score = g.rack_for(1 - stm).score_on(g.ld());
        let last_move_was_pass = g.scoreless_turns() > g.last_scoreless_turns();
        for m in moves.iter_mut() {
            if m.tiles_played() == num_tiles_on_rack {
                m.set_estimated_value(m.score() + 2 * other_rack_score);
            } else if depth > 2 {
                m.set_estimated_value(m.score() + 3 * m.tiles_played() as i16);
            } else {
                m.set_estimated_value(m.score());
            }
            if !tt_move.is_invalid() && m.tiny() == tt_move {
                m.add_estimated_value(HASH_MOVE_OFFSET);
            }
            if early_pass && last_move_was_pass && m.is_pass() {
                m.add_estimated_value(EARLY_PASS_OFFSET);
            }
        }
        moves.sort_unstable_by_key(|m| Reverse(m.estimated_value()));
    }

    fn generate_moves(&mut self, depth: u32) -> Vec<SmallMove> {
        if self.current_id_depth == depth as i32 {
            self.initial_moves.clone()
        } else {
            self.movegen.gen_all(&self.game, false);
            self.movegen.small_plays().to_vec()
        }
    }

    /// Post-iteration reordering schemes, by thread index. Divergent root
    /// orders are the point: they push threads into different subtrees.
    fn reorder_root_moves(&mut self, t: usize) {
        let mut rng = rand::rng();
        match t {
            1 => self
                .initial_moves
                .sort_unstable_by_key(|m| Reverse(m.estimated_value())),
            2 => {}
            3..=7 => self.initial_moves.shuffle(&mut rng),
            _ => {
                let top_few = self.initial_moves.len() / 3;
                self.initial_moves[..top_few].shuffle(&mut rng);
                self.initial_moves[top_few..].shuffle(&mut rng);
            }
        }
    }

    /// Materializes a table move into an empty PV so a cutoff at this
    /// node still surfaces a best move. A move that no longer decodes is
    /// a stale entry; report it as a miss.
    fn try_tt_return(
        &self,
        entry: &TableEntry,
        score: i16,
        pv: &mut PVLine,
    ) -> Result<bool, SolverError> {
        if !pv.is_empty() {
            return Ok(true);
        }
        match tiny_to_move(entry.tiny_move(), self.game.board(), self.game.ld()) {
            Ok(m) => {
                pv.update(m, &PVLine::new(), score);
                Ok(true)
            }
            Err(SolverError::MoveDecode) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn negamax(
        &mut self,
        shared: &SearchShared<'_>,
        key: u64,
        depth: u32,
        mut alpha: i16,
        mut beta: i16,
        pv: &mut PVLine,
    ) -> Result<i16, SolverError> {
        if shared.is_canceled() {
            return Err(SolverError::Canceled);
        }
        let on_turn = self.game.player_on_turn();
        let our_spread = self.game.spread_for(on_turn);
        let alpha_orig = alpha;
        let mut tt_move = TinyMove::INVALID;
        if shared.tt_enabled {
            if let Some(entry) = shared.tt.lookup(key) {
                tt_move = entry.tiny_move();
                if entry.depth() >= depth.min(63) as u8 {
                    // stored scores are spread-relative; rebase them here
                    let score = entry.score() + our_spread;
                    match entry.flag() {
                        TT_EXACT => {
                            if self.try_tt_return(&entry, score, pv)? {
                                return Ok(score);
                            }
                        }
                        TT_LOWER => alpha = alpha.max(score),
                        TT_UPPER => beta = beta.min(score),
                        _ => {}
                    }
                    if alpha >= beta && self.try_tt_return(&entry, score, pv)? {
                        return Ok(score);
                    }
                }
            }
        }
        if depth == 0 || self.game.play_state() == PlayState::GameOver {
            // exact evaluation: the spread for whoever is on turn
            return Ok(self.game.current_spread());
        }
        let mut children = self.generate_moves(depth);
        let at_top_layer = self.current_id_depth == depth as i32;
        if !at_top_layer {
            self.assign_estimates(&mut children, depth, tt_move, shared.early_pass);
        }
        let stm_rack = *self.game.rack_for(on_turn);
        let old_scoreless = self.game.scoreless_turns();
        let max_player_moved = on_turn == shared.solving_player;

        let mut best_value = -HUGE_NUMBER;
        let mut best_move = SmallMove::pass();
        let mut child_pv = PVLine::new();
        for idx in 0..children.len() {
            let child = children[idx];
            let child_key = if shared.tt_enabled {
                let new_scoreless = if child.is_pass() || child.score() == 0 {
                    old_scoreless + 1
                } else {
                    0
                };
                shared.tt.zobrist().add_move(
                    key,
                    &child,
                    self.game.board(),
                    &stm_rack,
                    &[],
                    max_player_moved,
                    new_scoreless,
                    old_scoreless,
                )?
            } else {
                0
            };
            self.game.play_small(&child)?;
            shared.nodes.fetch_add(1, Ordering::Relaxed);
            let value = match self.negamax(shared, child_key, depth - 1, -beta, -alpha, &mut child_pv)
            {
                Ok(v) => v,
                Err(e) => {
                    self.game.unplay_last_move();
                    return Err(e);
                }
            };
            self.game.unplay_last_move();
            if -value > best_value {
                best_value = -value;
                best_move = child;
                let m = child.to_move(self.game.board())?;
                pv.update(m, &child_pv, best_value - shared.initial_spread);
            }
            if at_top_layer {
                children[idx].set_estimated_value(-value);
            }
            alpha = alpha.max(best_value);
            if best_value >= beta {
                break;
            }
            child_pv.clear();
        }
        if at_top_layer {
            // persist the root valuations for the next iteration's ordering
            self.initial_moves = children;
        }
        if shared.tt_enabled {
            let flag = if best_value <= alpha_orig {
                TT_UPPER
            } else if best_value >= beta {
                TT_LOWER
            } else {
                TT_EXACT
            };
            // store without our spread so the entry is baseline-independent
            let entry = TableEntry::new(
                best_value - our_spread,
                flag,
                depth.min(63) as u8,
                best_move.tiny(),
            );
            shared.tt.store(key, entry);
        }
        Ok(best_value)
    }
}
