//! The pre-endgame (PEG) driver.
//!
//! With a handful of tiles left in the bag, every candidate first move is
//! judged by enumerating each distinguishable set of tiles that could
//! remain in the bag, arranging the bag so those draws are deterministic,
//! solving the resulting empty-bag endgames exactly, and tallying
//! win/tie/loss weighted by the number of ordered draws producing each
//! set. Two cross-play cutoffs prune hopeless candidates: skip-loss
//! abandons a play at its first known loss, and early-cutoff abandons any
//! play with more known losses than the best fully-analyzed play.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::consts::{ALPHABET_SIZE, EARLY_PASS_OFFSET, RACK_SIZE};
use crate::game::{BackupMode, Game, PlayState};
use crate::moves::Move;
use crate::moves::move_gen::{MoveGenerator, PlayRecorder};
use crate::moves::tiny::SmallMove;
use crate::search::endgame;
use crate::search::SolverError;

/// Endgame result of one drawn-tile arrangement, for our side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PegOutcome {
    Win,
    Draw,
    Loss,
}

/// Status of one distinguishable in-bag tile set for a candidate play.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub tiles: Vec<u8>,
    pub status: Option<PegOutcome>,
    pub finalized: bool,
}

#[derive(Debug, Default)]
struct PlayStats {
    points: f32,
    found_losses: f32,
    outcomes: Vec<Outcome>,
    stopped: bool,
}

impl PlayStats {
    fn outcome_index(&mut self, tiles: &[u8]) -> usize {
        if let Some(idx) = self.outcomes.iter().position(|o| o.tiles == tiles) {
            return idx;
        }
        self.outcomes.push(Outcome {
            tiles: tiles.to_vec(),
            status: None,
            finalized: false,
        });
        self.outcomes.len() - 1
    }
}

/// A candidate first move with its tally over all analyzed draws.
#[derive(Debug)]
pub struct PreEndgamePlay {
    pub play: Move,
    stats: RwLock<PlayStats>,
}

impl PreEndgamePlay {
    fn new(play: Move) -> Self {
        Self {
            play,
            stats: RwLock::new(PlayStats::default()),
        }
    }

    /// 1 per win and 0.5 per tie, weighted by draw counts; only finalized
    /// outcomes contribute.
    pub fn points(&self) -> f32 {
        self.stats.read().points
    }

    /// Weighted losses seen so far, including provisional ones.
    pub fn found_losses(&self) -> f32 {
        self.stats.read().found_losses
    }

    pub fn stopped(&self) -> bool {
        self.stats.read().stopped
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.stats.read().outcomes.clone()
    }

    fn stop_analyzing(&self) {
        self.stats.write().stopped = true;
    }

    fn has_loss(&self, tiles: &[u8]) -> bool {
        self.stats
            .read()
            .outcomes
            .iter()
            .any(|o| o.tiles == tiles && o.status == Some(PegOutcome::Loss))
    }

    /// Records a settled endgame for a bag-emptying first play.
    fn record_final(&self, result: PegOutcome, count: u32, tiles: &[u8]) {
        let mut stats = self.stats.write();
        let idx = stats.outcome_index(tiles);
        stats.outcomes[idx].status = Some(result);
        stats.outcomes[idx].finalized = true;
        match result {
            PegOutcome::Win => stats.points += count as f32,
            PegOutcome::Draw => stats.points += 0.5 * count as f32,
            PegOutcome::Loss => stats.found_losses += count as f32,
        }
    }

    /// Records a provisional outcome mid-recursion. A drawn-tile set only
    /// ever worsens (win to draw to loss) as more opponent replies are
    /// explored; points stay untouched until finalization.
    fn record_provisional(&self, result: PegOutcome, count: u32, tiles: &[u8]) {
        let mut stats = self.stats.write();
        let idx = stats.outcome_index(tiles);
        let current = stats.outcomes[idx].status;
        let worse = match (current, result) {
            (None, _) => true,
            (Some(PegOutcome::Win), PegOutcome::Draw | PegOutcome::Loss) => true,
            (Some(PegOutcome::Draw), PegOutcome::Loss) => true,
            _ => false,
        };
        if !worse {
            return;
        }
        if current != Some(PegOutcome::Loss) && result == PegOutcome::Loss {
            stats.found_losses += count as f32;
        }
        stats.outcomes[idx].status = Some(result);
    }
}

/// A candidate play annotated with its final tally.
#[derive(Debug, Clone)]
pub struct PegPlayResult {
    pub play: Move,
    pub points: f32,
    pub found_losses: f32,
    pub outcomes: Vec<Outcome>,
    pub stopped: bool,
}

impl std::fmt::Display for PegPlayResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} points {:.1} losses {:.1}{}",
            self.play.short_description(),
            self.points,
            self.found_losses,
            if self.stopped { " (cut off)" } else { "" }
        )
    }
}

/// All candidates, best first, plus how the analysis ended.
#[derive(Debug)]
pub struct PegResponse {
    pub plays: Vec<PegPlayResult>,
    pub canceled_early: bool,
    pub endgames_solved: u64,
    pub cutoffs: u64,
}

/// One distinguishable multiset draw, with the number of ordered draws
/// that produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    pub tiles: Vec<u8>,
    pub count: u32,
}

/// Enumerates every distinct ordered selection of `k` tiles from the
/// multiset `counts`, depth-first over letter indices, so the output order
/// is deterministic for a given input.
pub fn generate_permutations(counts: &[u8; ALPHABET_SIZE], k: usize) -> Vec<Permutation> {
    fn product(orig: &[u8; ALPHABET_SIZE], chosen: &[u8]) -> u32 {
        let mut avail = *orig;
        let mut result = 1u32;
        for &letter in chosen {
            result *= avail[letter as usize] as u32;
            avail[letter as usize] -= 1;
        }
        result
    }
    fn generate(
        avail: &mut [u8; ALPHABET_SIZE],
        orig: &[u8; ALPHABET_SIZE],
        k: usize,
        current: &mut Vec<u8>,
        out: &mut Vec<Permutation>,
    ) {
        if k == 0 {
            out.push(Permutation {
                tiles: current.clone(),
                count: product(orig, current),
            });
            return;
        }
        for letter in 0..ALPHABET_SIZE {
            if avail[letter] > 0 {
                avail[letter] -= 1;
                current.push(letter as u8);
                generate(avail, orig, k - 1, current, out);
                current.pop();
                avail[letter] += 1;
            }
        }
    }
    let mut out = Vec::new();
    let mut avail = *counts;
    generate(&mut avail, counts, k, &mut Vec::with_capacity(k), &mut out);
    out
}

/// Number of ordered draws of `k` tiles from `n` unseen: n! / (n-k)!.
pub fn num_ordered_draws(n: usize, k: usize) -> u64 {
    ((n - k + 1)..=n).map(|x| x as u64).product()
}

struct WorkerShared<'a> {
    solver: &'a Solver,
    winner_tx: Sender<f32>,
}

/// An in-bag arrangement queued for one candidate: the tiles we will
/// draw, the weight, and a rough estimate of the opponent's best reply.
struct InBagOption {
    tiles: Vec<u8>,
    count: u32,
    opp_estimate: f64,
}

pub struct Solver {
    game: Game,
    movegen: Box<dyn MoveGenerator + Send + Sync>,
    threads: usize,
    endgame_plies: u32,
    skip_loss: bool,
    early_cutoff: bool,
    skip_non_emptying: bool,
    known_opp_rack: Option<Vec<u8>>,
    timeout: Option<Duration>,
    tt_fraction: f64,

    num_in_bag: usize,
    solving_player: usize,
    maybe_in_bag: [u8; ALPHABET_SIZE],
    num_combos: f32,

    min_potential_losses: Mutex<f32>,
    num_endgames_solved: AtomicU64,
    num_cutoffs: AtomicU64,
    canceled: Arc<AtomicBool>,
}

impl Solver {
    pub fn new(game: Game, movegen: Box<dyn MoveGenerator + Send + Sync>) -> Self {
        Self {
            game,
            movegen,
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            endgame_plies: 4,
            skip_loss: false,
            early_cutoff: false,
            skip_non_emptying: false,
            known_opp_rack: None,
            timeout: None,
            tt_fraction: 0.25,
            num_in_bag: 0,
            solving_player: 0,
            maybe_in_bag: [0; ALPHABET_SIZE],
            num_combos: 0.0,
            min_potential_losses: Mutex::new(f32::MAX),
            num_endgames_solved: AtomicU64::new(0),
            num_cutoffs: AtomicU64::new(0),
            canceled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_threads(&mut self, threads: usize) {
        self.threads = threads.max(1);
    }

    pub fn set_endgame_plies(&mut self, plies: u32) {
        self.endgame_plies = plies;
    }

    pub fn set_skip_loss(&mut self, on: bool) {
        self.skip_loss = on;
    }

    pub fn set_early_cutoff(&mut self, on: bool) {
        self.early_cutoff = on;
    }

    pub fn set_skip_non_bag_emptying(&mut self, on: bool) {
        self.skip_non_emptying = on;
    }

    pub fn set_known_opp_rack(&mut self, tiles: Option<Vec<u8>>) {
        self.known_opp_rack = tiles;
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn set_tt_fraction_of_mem(&mut self, fraction: f64) {
        self.tt_fraction = fraction;
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.canceled)
    }

    pub fn num_cutoffs(&self) -> u64 {
        self.num_cutoffs.load(Ordering::Relaxed)
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Evaluates every candidate move and returns them sorted by points.
    pub fn solve(&mut self, moves: Vec<Move>) -> Result<PegResponse, SolverError> {
        self.num_in_bag = self.game.bag().tiles_remaining();
        if self.num_in_bag == 0 || self.num_in_bag > RACK_SIZE {
            return Err(SolverError::InvalidPrecondition(format!(
                "pre-endgame needs 1..={RACK_SIZE} tiles in the bag, found {}",
                self.num_in_bag
            )));
        }
        if moves.is_empty() {
            return Err(SolverError::InvalidPrecondition(
                "no candidate moves to evaluate".into(),
            ));
        }
        self.solving_player = self.game.player_on_turn();
        let opponent = 1 - self.solving_player;

        // tiles the opponent might be holding and we might draw later
        let mut maybe_in_bag = [0u8; ALPHABET_SIZE];
        for tile in self.game.rack_for(opponent).tiles_on() {
            maybe_in_bag[tile as usize] += 1;
        }
        for &tile in self.game.bag().peek() {
            maybe_in_bag[tile as usize] += 1;
        }
        if let Some(known) = &self.known_opp_rack {
            for &tile in known {
                if maybe_in_bag[tile as usize] == 0 {
                    return Err(SolverError::InvalidPrecondition(
                        "known opponent tile is not among the unseen tiles".into(),
                    ));
                }
                maybe_in_bag[tile as usize] -= 1;
            }
        }
        self.maybe_in_bag = maybe_in_bag;
        let total_unseen: usize = maybe_in_bag.iter().map(|&c| c as usize).sum();
        self.num_combos = num_ordered_draws(total_unseen, self.num_in_bag) as f32;
        *self.min_potential_losses.lock() = f32::MAX;
        self.num_endgames_solved.store(0, Ordering::Relaxed);
        self.num_cutoffs.store(0, Ordering::Relaxed);

        let plays: Vec<Arc<PreEndgamePlay>> = moves
            .into_iter()
            .map(|m| Arc::new(PreEndgamePlay::new(m)))
            .collect();

        if let Some(timeout) = self.timeout {
            let canceled = Arc::clone(&self.canceled);
            std::thread::spawn(move || {
                std::thread::sleep(timeout);
                canceled.store(true, Ordering::Release);
            });
        }

        let threads = self.threads;
        let (job_tx, job_rx) = bounded::<Arc<PreEndgamePlay>>(threads);
        let (winner_tx, winner_rx) = unbounded::<f32>();
        let mut workers: Vec<endgame::Solver> = (0..threads)
            .map(|_| self.make_endgame_worker())
            .collect();

        info!(
            threads,
            num_in_bag = self.num_in_bag,
            endgame_plies = self.endgame_plies,
            candidates = plays.len(),
            num_combos = self.num_combos as f64,
            "starting pre-endgame analysis"
        );

        std::thread::scope(|s| {
            // tracks the best fully-finalized play seen by any worker
            s.spawn(move || {
                let mut best: Option<f32> = None;
                for points in winner_rx {
                    if best.is_none_or(|b| points > b) {
                        best = Some(points);
                    }
                }
                debug!(best_points = ?best, "winner aggregator done");
            });
            for worker in workers.iter_mut() {
                let shared = WorkerShared {
                    solver: &*self,
                    winner_tx: winner_tx.clone(),
                };
                let rx: Receiver<Arc<PreEndgamePlay>> = job_rx.clone();
                s.spawn(move || {
                    for job in rx.iter() {
                        if let Err(e) = handle_job(&shared, worker, &job) {
                            // keep draining so the channel never deadlocks
                            if e != SolverError::Canceled {
                                warn!(error = %e, play = %job.play, "error handling job");
                            }
                        }
                    }
                });
            }
            drop(winner_tx);
            for play in plays.iter() {
                if job_tx.send(Arc::clone(play)).is_err() {
                    break;
                }
            }
            drop(job_tx);
        });

        let mut results: Vec<PegPlayResult> = plays
            .iter()
            .map(|p| {
                let stats = p.stats.read();
                PegPlayResult {
                    play: p.play.clone(),
                    points: stats.points,
                    found_losses: stats.found_losses,
                    outcomes: stats.outcomes.clone(),
                    stopped: stats.stopped,
                }
            })
            .collect();
        results.sort_by(|a, b| b.points.total_cmp(&a.points));
        let canceled_early = self.canceled.load(Ordering::Acquire);
        if canceled_early {
            info!("timed out or stopped; returning best results so far");
        }
        let response = PegResponse {
            plays: results,
            canceled_early,
            endgames_solved: self.num_endgames_solved.load(Ordering::Relaxed),
            cutoffs: self.num_cutoffs.load(Ordering::Relaxed),
        };
        info!(
            endgames_solved = response.endgames_solved,
            cutoffs = response.cutoffs,
            winner = %response.plays[0],
            "pre-endgame analysis finished"
        );
        Ok(response)
    }

    /// Each worker gets a private game copy and a private single-threaded
    /// endgame solver with its slice of the table budget.
    fn make_endgame_worker(&self) -> endgame::Solver {
        let mut game = self.game.copy();
        game.set_backup_mode(BackupMode::Simulation);
        game.set_endgame_mode(true);
        game.set_state_stack_length(self.endgame_plies as usize + 16);
        let mut solver = endgame::Solver::new(game, self.movegen.clone_box());
        solver.set_threads(1);
        solver.reset_table(self.tt_fraction / self.threads as f64);
        solver
    }
}

fn handle_job(
    shared: &WorkerShared<'_>,
    worker: &mut endgame::Solver,
    job: &Arc<PreEndgamePlay>,
) -> Result<(), SolverError> {
    let s = shared.solver;
    if s.canceled.load(Ordering::Relaxed) {
        return Err(SolverError::Canceled);
    }
    if s.skip_loss || s.early_cutoff {
        let found_losses = job.found_losses();
        if s.skip_loss && found_losses > 0.0 {
            job.stop_analyzing();
            s.num_cutoffs.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        // a play with more losses than any fully analyzed play cannot win
        if s.early_cutoff && found_losses > *s.min_potential_losses.lock() {
            job.stop_analyzing();
            s.num_cutoffs.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
    }

    let permutations = generate_permutations(&s.maybe_in_bag, s.num_in_bag);
    let first_play_empties_bag = job.play.tiles_played as usize >= s.num_in_bag;
    let opponent = 1 - s.solving_player;

    worker.set_play_recorder(PlayRecorder::TopOnly);
    let mut options = Vec::with_capacity(permutations.len());
    for perm in permutations {
        let mut opp_estimate = 0.0;
        if first_play_empties_bag {
            // arrange the bag so these tiles are ours to draw, give the
            // opponent the rest, and ask the generator for their best
            // reply as an ordering estimate
            arrange_bag(worker, opponent, &perm.tiles, s.known_opp_rack.as_deref())?;
            worker.game_mut().play_move(&job.play)?;
            worker.generate_plays();
            opp_estimate = worker.top_play().map(|m| m.score as f64).unwrap_or(0.0);
            worker.game_mut().unplay_last_move();
        } else if s.skip_non_emptying {
            // only bag-emptying plays are of interest
            return Ok(());
        }
        options.push(InBagOption {
            tiles: perm.tiles,
            count: perm.count,
            opp_estimate,
        });
    }
    // losing branches first, so cross-play cutoffs trigger sooner
    if first_play_empties_bag {
        options.sort_by(|a, b| b.opp_estimate.total_cmp(&a.opp_estimate));
    }
    worker.set_play_recorder(PlayRecorder::AllSmall);

    let num_options = options.len();
    for (idx, option) in options.into_iter().enumerate() {
        if s.canceled.load(Ordering::Relaxed) {
            return Err(SolverError::Canceled);
        }
        if s.early_cutoff && job.found_losses() > *s.min_potential_losses.lock() {
            job.stop_analyzing();
            s.num_cutoffs
                .fetch_add((num_options - idx) as u64, Ordering::Relaxed);
            return Ok(());
        }
        arrange_bag(worker, opponent, &option.tiles, s.known_opp_rack.as_deref())?;
        let first_move = SmallMove::from_move(&job.play);
        recursive_solve(
            shared,
            worker,
            job,
            Some(&first_move),
            &option,
            0,
            first_play_empties_bag,
        )?;
    }
    Ok(())
}

/// Throws the opponent's rack into the bag, pins the chosen in-bag tiles
/// at the keep-for-us end, and redraws the opponent from the other end.
fn arrange_bag(
    worker: &mut endgame::Solver,
    opponent: usize,
    in_bag_tiles: &[u8],
    known_opp_rack: Option<&[u8]>,
) -> Result<(), SolverError> {
    let game = worker.game_mut();
    game.throw_racks_in_for(opponent);
    if !game.bag_mut().move_tiles_to_beginning(in_bag_tiles) {
        return Err(SolverError::Internal(
            "in-bag tiles are not all present in the bag".into(),
        ));
    }
    game.set_random_rack(opponent, known_opp_rack)
}

fn recursive_solve(
    shared: &WorkerShared<'_>,
    worker: &mut endgame::Solver,
    peg_play: &Arc<PreEndgamePlay>,
    move_to_make: Option<&SmallMove>,
    option: &InBagOption,
    depth: usize,
    peg_play_empties_bag: bool,
) -> Result<(), SolverError> {
    let s = shared.solver;
    // a drawn-tile set already known lost cannot improve
    if peg_play.has_loss(&option.tiles) {
        return Ok(());
    }
    let game_over = worker.game().play_state() == PlayState::GameOver;
    let bag_empty = worker.game().bag().is_empty();
    if game_over || bag_empty {
        let our_final_spread = if game_over {
            worker.game().spread_for(s.solving_player)
        } else {
            let initial_spread = worker.game().current_spread();
            let on_turn = worker.game().player_on_turn();
            let (val, _seq) = worker.quick_solve(s.endgame_plies)?;
            s.num_endgames_solved.fetch_add(1, Ordering::Relaxed);
            let final_on_turn = val + initial_spread;
            if on_turn == s.solving_player {
                final_on_turn
            } else {
                -final_on_turn
            }
        };
        let result = match our_final_spread {
            x if x > 0 => PegOutcome::Win,
            0 => PegOutcome::Draw,
            _ => PegOutcome::Loss,
        };
        if peg_play_empties_bag {
            peg_play.record_final(result, option.count, &option.tiles);
            // broadcast so the early-cutoff threshold tightens
            let potential_losses = s.num_combos - peg_play.points();
            {
                let mut min = s.min_potential_losses.lock();
                if potential_losses < *min {
                    debug!(
                        potential_losses = potential_losses as f64,
                        play = %peg_play.play,
                        "new fewest potential losses"
                    );
                    *min = potential_losses;
                }
            }
            let _ = shared.winner_tx.send(peg_play.points());
        } else {
            peg_play.record_provisional(result, option.count, &option.tiles);
        }
        return Ok(());
    }

    // bag not yet empty: play the pending move and iterate the replies
    let Some(sm) = move_to_make else {
        return Err(SolverError::Internal(
            "non-empty bag with no move to make".into(),
        ));
    };
    worker.game_mut().play_small(sm)?;
    let result = (|| {
        if worker.game().bag().is_empty() || worker.game().play_state() == PlayState::GameOver {
            return recursive_solve(
                shared,
                worker,
                peg_play,
                None,
                option,
                depth + 1,
                peg_play_empties_bag,
            );
        }
        worker.generate_plays();
        let mut replies: Vec<SmallMove> = worker.small_plays().to_vec();
        for r in replies.iter_mut() {
            r.set_estimated_value(r.score());
            // a pass answering a pass settles the game fastest
            if sm.is_pass() && r.is_pass() {
                r.add_estimated_value(EARLY_PASS_OFFSET);
            }
        }
        replies.sort_unstable_by_key(|m| std::cmp::Reverse(m.estimated_value()));
        for reply in &replies {
            recursive_solve(
                shared,
                worker,
                peg_play,
                Some(reply),
                option,
                depth + 1,
                peg_play_empties_bag,
            )?;
        }
        Ok(())
    })();
    worker.game_mut().unplay_last_move();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_counts_sum_to_ordered_draws() {
        let mut counts = [0u8; ALPHABET_SIZE];
        counts[5] = 3; // E E E
        counts[11] = 1; // K
        counts[20] = 2; // T T
        let total: usize = 6;
        for k in 1..=3 {
            let perms = generate_permutations(&counts, k);
            let sum: u64 = perms.iter().map(|p| p.count as u64).sum();
            assert_eq!(sum, num_ordered_draws(total, k), "k = {k}");
        }
    }

    #[test]
    fn permutations_are_deterministic_and_distinct() {
        let mut counts = [0u8; ALPHABET_SIZE];
        counts[1] = 2;
        counts[2] = 1;
        let a = generate_permutations(&counts, 2);
        let b = generate_permutations(&counts, 2);
        assert_eq!(a, b);
        // AA, AB, BA with counts 2, 2, 2
        assert_eq!(a.len(), 3);
        for p in &a {
            assert_eq!(p.count, 2);
        }
        let mut tiles: Vec<&[u8]> = a.iter().map(|p| p.tiles.as_slice()).collect();
        tiles.dedup();
        assert_eq!(tiles.len(), 3);
    }

    #[test]
    fn ordered_draw_counts() {
        assert_eq!(num_ordered_draws(8, 1), 8);
        assert_eq!(num_ordered_draws(8, 2), 56);
        assert_eq!(num_ordered_draws(9, 7), 181_440);
    }

    #[test]
    fn provisional_outcomes_only_worsen() {
        let play = PreEndgamePlay::new(Move::pass());
        let tiles = vec![5u8];
        play.record_provisional(PegOutcome::Win, 3, &tiles);
        assert_eq!(play.found_losses(), 0.0);
        play.record_provisional(PegOutcome::Loss, 3, &tiles);
        assert_eq!(play.found_losses(), 3.0);
        // a later, better result cannot undo the loss
        play.record_provisional(PegOutcome::Win, 3, &tiles);
        assert_eq!(play.found_losses(), 3.0);
        assert!(play.has_loss(&tiles));
        // provisional results never add points
        assert_eq!(play.points(), 0.0);
    }

    #[test]
    fn finalized_outcomes_accumulate_points() {
        let play = PreEndgamePlay::new(Move::pass());
        play.record_final(PegOutcome::Win, 4, &[1]);
        play.record_final(PegOutcome::Draw, 2, &[2]);
        play.record_final(PegOutcome::Loss, 1, &[3]);
        assert_eq!(play.points(), 5.0);
        assert_eq!(play.found_losses(), 1.0);
        assert!(play.outcomes().iter().all(|o| o.finalized));
    }
}
