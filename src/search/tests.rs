use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::game::alphabet::{LetterDistribution, letters_from_str};
use crate::game::{BackupMode, Game};
use crate::moves::Move;
use crate::moves::move_gen::{Lexicon, MoveGenerator, WordListGen};
use crate::moves::tiny::SmallMove;
use crate::search::{endgame, preendgame};

fn fixture_game(
    words: &[&str],
    rows: &[&str],
    racks: [&str; 2],
    bag_tiles: &str,
) -> (Game, Box<dyn MoveGenerator + Send + Sync>) {
    let ld = Arc::new(LetterDistribution::english());
    let lexicon = Arc::new(Lexicon::from_words(words.iter().copied()).unwrap());
    let mut game = Game::from_position(
        Arc::clone(&ld),
        Arc::clone(&lexicon),
        rows,
        racks,
        [0, 0],
        0,
    )
    .unwrap();
    let mut tiles = letters_from_str(bag_tiles).unwrap();
    for t in &tiles {
        assert!(
            game.bag_mut().remove_tile(*t),
            "bag fixture tile unavailable"
        );
    }
    let mut bag = crate::game::bag::Bag::from_tiles(std::mem::take(&mut tiles));
    std::mem::swap(game.bag_mut(), &mut bag);
    game.set_backup_mode(BackupMode::Simulation);
    (game, Box::new(WordListGen::new(lexicon, ld)))
}

const CAT_BOARD: [&str; 8] = [
    "...............",
    "...............",
    "...............",
    "...............",
    "...............",
    "...............",
    "...............",
    "......CAT......",
];

/// Our S, D, O, G against a stuck Q, X, J: going out through DOGS (or
/// CATS then DOGS) is worth 14 + 2 x 26 = 66 either way.
fn endgame_fixture() -> endgame::Solver {
    let (game, movegen) = fixture_game(
        &["CAT", "CATS", "DOGS"],
        &CAT_BOARD,
        ["SDOG", "QXJ"],
        "",
    );
    endgame::Solver::new(game, movegen)
}

fn tiny_tt_fraction() -> f64 {
    // keep test tables at the allocator minimum
    1e-12
}

#[test]
fn zobrist_incremental_matches_full_hash() {
    let (mut game, _) = fixture_game(&["CAT", "CATS", "DOGS"], &CAT_BOARD, ["SDOG", "QXJ"], "");
    let game = &mut game;
    game.set_endgame_mode(true);
    // drive the hash by hand through a play sequence
    let tt = crate::search::tt::TranspositionTable::new(15);
    let z = tt.zobrist();
    let full = |g: &Game| {
        z.hash(
            g.board().get_squares(),
            g.rack_for(0),
            g.rack_for(1),
            g.player_on_turn() == 1,
            g.scoreless_turns(),
        )
    };
    let cats = {
        let s = letters_from_str("S").unwrap()[0];
        Move {
            kind: crate::moves::MoveKind::TilePlacement,
            row: 7,
            col: 6,
            vertical: false,
            tiles: vec![0, 0, 0, s],
            score: 6,
            tiles_played: 1,
        }
    };
    let mut key = full(game);
    let sm = SmallMove::from_move(&cats);
    let rack_before = *game.rack_for(0);
    let old = game.scoreless_turns();
    key = z
        .add_move(key, &sm, game.board(), &rack_before, &[], true, 0, old)
        .unwrap();
    game.play_move(&cats).unwrap();
    assert_eq!(key, full(game), "incremental hash tracks a tile play");

    let pass = SmallMove::pass();
    let rack_before = *game.rack_for(1);
    let old = game.scoreless_turns();
    key = z
        .add_move(key, &pass, game.board(), &rack_before, &[], false, old + 1, old)
        .unwrap();
    game.play_move(&Move::pass()).unwrap();
    assert_eq!(key, full(game), "incremental hash tracks a pass");

    // play then unplay restores the hash bit-exactly
    let before = full(game);
    game.play_move(&Move::pass()).unwrap();
    game.unplay_last_move();
    assert_eq!(before, full(game));
}

#[test]
fn zobrist_hash_is_path_independent() {
    // our two one-tile plays with an opponent pass between them: playing
    // them in either order reaches the same position, which must hash
    // identically even though the intermediate states differ
    let (mut game_a, _) = fixture_game(&["CAT", "CATS"], &CAT_BOARD, ["SB", "QXJ"], "");
    game_a.set_endgame_mode(true);
    let mut game_b = game_a.copy();
    let s = letters_from_str("S").unwrap()[0];
    let b = letters_from_str("B").unwrap()[0];
    let hook_s = Move {
        kind: crate::moves::MoveKind::TilePlacement,
        row: 7,
        col: 6,
        vertical: false,
        tiles: vec![0, 0, 0, s],
        score: 6,
        tiles_played: 1,
    };
    let lone_b = Move {
        kind: crate::moves::MoveKind::TilePlacement,
        row: 0,
        col: 0,
        vertical: false,
        tiles: vec![b],
        score: 9,
        tiles_played: 1,
    };
    let tt = crate::search::tt::TranspositionTable::new(15);
    let z = tt.zobrist();
    let full = |g: &Game| {
        z.hash(
            g.board().get_squares(),
            g.rack_for(0),
            g.rack_for(1),
            g.player_on_turn() == 1,
            g.scoreless_turns(),
        )
    };
    game_a.play_move(&hook_s).unwrap();
    game_a.play_move(&Move::pass()).unwrap();
    game_a.play_move(&lone_b).unwrap();
    game_b.play_move(&lone_b).unwrap();
    game_b.play_move(&Move::pass()).unwrap();
    game_b.play_move(&hook_s).unwrap();
    assert_eq!(full(&game_a), full(&game_b));
    // and both differ from the pre-play position
    let (game_c, _) = fixture_game(&["CAT", "CATS"], &CAT_BOARD, ["SB", "QXJ"], "");
    assert_ne!(full(&game_a), full(&game_c));
}

#[test]
fn two_ply_forced_win_has_exact_spread() {
    let mut solver = endgame_fixture();
    solver.set_threads(1);
    solver.set_tt_fraction_of_mem(tiny_tt_fraction());
    let outcome = solver.solve(2).unwrap();
    assert!(!outcome.canceled);
    assert_eq!(outcome.value, 66);
    assert!(!outcome.pv.is_empty() && outcome.pv.len() <= 7);
}

#[test]
fn deeper_searches_agree_on_the_forced_win() {
    for plies in [1, 3, 5] {
        let mut solver = endgame_fixture();
        solver.set_tt_fraction_of_mem(tiny_tt_fraction());
        let outcome = solver.solve(plies).unwrap();
        assert_eq!(outcome.value, 66, "plies = {plies}");
    }
}

#[test]
fn single_threaded_search_is_deterministic() {
    let run = || {
        let mut solver = endgame_fixture();
        solver.set_transposition_table(false);
        let outcome = solver.solve(3).unwrap();
        (
            outcome.value,
            outcome
                .pv
                .iter()
                .map(|m| m.short_description())
                .collect::<Vec<_>>(),
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn transposition_table_does_not_change_the_root_score() {
    let mut with_tt = endgame_fixture();
    with_tt.set_tt_fraction_of_mem(tiny_tt_fraction());
    let mut without_tt = endgame_fixture();
    without_tt.set_transposition_table(false);
    let a = with_tt.solve(4).unwrap();
    let b = without_tt.solve(4).unwrap();
    assert_eq!(a.value, b.value);
    assert_eq!(
        a.pv.first().map(|m| m.short_description()),
        b.pv.first().map(|m| m.short_description())
    );
}

#[test]
fn solving_twice_with_reset_is_consistent() {
    let mut solver = endgame_fixture();
    solver.set_tt_fraction_of_mem(tiny_tt_fraction());
    let first = solver.solve(3).unwrap();
    let second = solver.solve(3).unwrap();
    assert_eq!(first.value, second.value);
    assert_eq!(
        first.pv.iter().map(|m| m.short_description()).collect::<Vec<_>>(),
        second.pv.iter().map(|m| m.short_description()).collect::<Vec<_>>()
    );
}

#[test]
fn lazy_smp_matches_the_single_threaded_value() {
    let mut single = endgame_fixture();
    single.set_threads(1);
    single.set_tt_fraction_of_mem(tiny_tt_fraction());
    let mut smp = endgame_fixture();
    smp.set_threads(3);
    smp.set_tt_fraction_of_mem(tiny_tt_fraction());
    let a = single.solve(4).unwrap();
    let b = smp.solve(4).unwrap();
    assert_eq!(a.value, b.value);
}

#[test]
fn lazy_smp_without_tt_is_a_config_conflict() {
    let mut solver = endgame_fixture();
    solver.set_threads(2);
    solver.set_transposition_table(false);
    match solver.solve(3) {
        Err(crate::search::SolverError::ConfigConflict(_)) => {}
        other => panic!("expected a config conflict, got {other:?}"),
    }
}

#[test]
fn endgame_requires_an_empty_bag() {
    let (game, movegen) = fixture_game(
        &["CAT", "CATS"],
        &CAT_BOARD,
        ["SDOG", "QXJ"],
        "EE",
    );
    let mut solver = endgame::Solver::new(game, movegen);
    match solver.solve(2) {
        Err(crate::search::SolverError::InvalidPrecondition(_)) => {}
        other => panic!("expected a precondition error, got {other:?}"),
    }
}

#[test]
fn first_win_mode_still_finds_a_winning_line() {
    let mut solver = endgame_fixture();
    solver.set_first_win(true);
    solver.set_tt_fraction_of_mem(tiny_tt_fraction());
    let outcome = solver.solve(2).unwrap();
    // value is only a bound in the narrowed window; it must show a win
    assert!(outcome.value >= 1);
    assert!(!outcome.pv.is_empty());
}

#[test]
fn hash_move_from_the_table_leads_the_pv() {
    let mut solver = endgame_fixture();
    solver.set_tt_fraction_of_mem(tiny_tt_fraction());
    let deep = solver.solve(4).unwrap();
    let deep_first = deep.pv[0].short_description();
    // re-enter shallower without resetting: the stored best move must
    // come out of the table first
    let (val, seq) = solver.quick_solve(2).unwrap();
    assert_eq!(val, 66);
    assert_eq!(seq[0].short_description(), deep_first);
}

#[test]
fn cancellation_preserves_the_best_line_so_far() {
    // a branchy position whose full tree is far too large to exhaust
    let (game, movegen) = fixture_game(
        &[
            "CAT", "CATS", "AT", "TA", "AS", "AN", "NA", "AE", "AR", "RE", "ER", "ES",
            "IT", "TI", "IN", "AI", "NE", "SI", "AIT", "ANE", "ANI", "ANT", "ARE",
            "ARS", "ART", "AIS", "AIN", "AIR", "EAR", "EAT", "ERA", "ERN", "ERS",
            "ETA", "NAE", "NIT", "NET", "TEN", "TIN", "TIE", "SIT", "SET", "SEA",
            "SAT", "TAS", "RAT", "TAR", "EAST", "SEAT", "TEAS", "RATE", "TEAR",
            "STIR", "REST", "NEST", "EARN", "NEAR", "ANTE", "SANE", "RAIN", "STAIN",
        ],
        &CAT_BOARD,
        ["AEINRST", "AEINRST"],
        "",
    );
    let mut solver = endgame::Solver::new(game, movegen);
    solver.set_tt_fraction_of_mem(tiny_tt_fraction());
    let cancel = solver.cancel_handle();
    std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(500));
        cancel.store(true, Ordering::Release);
    });
    let outcome = solver.solve(25).unwrap();
    assert!(outcome.canceled);
    assert!(
        !outcome.pv.is_empty(),
        "at least one completed depth retains its PV"
    );
    // the line must replay legally from the root
    let mut game = solver.game().copy();
    game.set_endgame_mode(true);
    for m in &outcome.pv {
        game.play_move(m).unwrap();
    }
}

/// PEG fixture: one tile in the bag. Candidate B blocks the only hook
/// square and wins every draw; candidate A leaves it open and loses
/// every draw where the opponent holds the K.
mod peg {
    use super::*;
    use crate::search::preendgame::PegOutcome;

    const PEG_BOARD: [&str; 10] = [
        "......P........",
        "......I........",
        "...............",
        "...............",
        "...............",
        "...............",
        "...............",
        "...............",
        "...............",
        "...BO..........",
    ];

    fn peg_fixture() -> preendgame::Solver {
        // our rack X A E E T T O; unseen: K E E E T T O O (bag holds one)
        let (game, movegen) = fixture_game(
            &["BO", "BOA", "XI", "KI"],
            &PEG_BOARD,
            ["XAEETTO", "KEETTOO"],
            "E",
        );
        let mut solver = preendgame::Solver::new(game, movegen);
        solver.set_threads(1);
        solver.set_endgame_plies(4);
        solver.set_tt_fraction_of_mem(super::tiny_tt_fraction());
        solver
    }

    fn xi_block() -> Move {
        let x = letters_from_str("X").unwrap()[0];
        Move {
            kind: crate::moves::MoveKind::TilePlacement,
            row: 1,
            col: 5,
            vertical: false,
            tiles: vec![x, 0],
            score: 25,
            tiles_played: 1,
        }
    }

    fn boa_hook() -> Move {
        let a = letters_from_str("A").unwrap()[0];
        Move {
            kind: crate::moves::MoveKind::TilePlacement,
            row: 9,
            col: 3,
            vertical: false,
            tiles: vec![0, 0, a],
            score: 7,
            tiles_played: 1,
        }
    }

    #[test]
    fn one_tile_in_bag_outcomes_are_fully_finalized() {
        let mut solver = peg_fixture();
        let response = solver.solve(vec![xi_block()]).unwrap();
        assert!(!response.canceled_early);
        let play = &response.plays[0];
        // four distinguishable draws: K, E, T, O
        assert_eq!(play.outcomes.len(), 4);
        assert!(play.outcomes.iter().all(|o| o.finalized));
        let total: u32 = play
            .outcomes
            .iter()
            .map(|o| {
                // recompute each draw's weight from the unseen multiset
                match o.tiles[0] {
                    11 => 1u32, // K
                    5 => 3,     // E: three unseen
                    20 => 2,    // T
                    15 => 2,    // O
                    other => panic!("unexpected drawn tile {other}"),
                }
            })
            .sum();
        assert_eq!(total, 8);
        // blocking the hook wins every endgame
        assert_eq!(play.points, 8.0);
        assert_eq!(play.found_losses, 0.0);
        assert!(
            play.outcomes
                .iter()
                .all(|o| o.status == Some(PegOutcome::Win))
        );
    }

    #[test]
    fn open_hook_loses_when_the_opponent_holds_the_k() {
        let mut solver = peg_fixture();
        let response = solver.solve(vec![boa_hook()]).unwrap();
        let play = &response.plays[0];
        // the K draw (we pull it ourselves) is the only win
        assert_eq!(play.points, 1.0);
        assert_eq!(play.found_losses, 7.0);
        for o in &play.outcomes {
            let expected = if o.tiles[0] == 11 {
                PegOutcome::Win
            } else {
                PegOutcome::Loss
            };
            assert_eq!(o.status, Some(expected), "draw {:?}", o.tiles);
        }
    }

    #[test]
    fn early_cutoff_stops_hopeless_plays() {
        let mut solver = peg_fixture();
        solver.set_early_cutoff(true);
        let response = solver.solve(vec![xi_block(), boa_hook()]).unwrap();
        // the blocker is fully analyzed first and sets the bar at zero
        // losses; the open hook is abandoned at its first loss
        assert_eq!(response.plays[0].play.short_description(), xi_block().short_description());
        assert_eq!(response.plays[0].points, 8.0);
        let loser = &response.plays[1];
        assert!(loser.stopped);
        assert!(loser.points < 8.0);
        // three of the four draws never ran: E or T or O hit the loss
        // first (they sort ahead of K), then the rest were cut off
        assert_eq!(response.cutoffs, 3);
    }

    #[test]
    fn skip_loss_combines_with_early_cutoff() {
        let mut solver = peg_fixture();
        solver.set_skip_loss(true);
        solver.set_early_cutoff(true);
        let response = solver.solve(vec![xi_block(), boa_hook()]).unwrap();
        assert!(response.plays[1].stopped);
    }

    #[test]
    fn pass_candidate_is_only_provisionally_scored() {
        let mut solver = peg_fixture();
        let response = solver.solve(vec![Move::pass()]).unwrap();
        let play = &response.plays[0];
        // a pass does not empty the bag, so nothing is ever finalized
        // and no points accrue; losses are still tracked conservatively
        assert_eq!(play.points, 0.0);
        assert!(play.outcomes.iter().all(|o| !o.finalized));
        assert!(!play.outcomes.is_empty());
    }

    #[test]
    fn skip_non_emptying_ignores_passes() {
        let mut solver = peg_fixture();
        solver.set_skip_non_bag_emptying(true);
        let response = solver.solve(vec![Move::pass(), xi_block()]).unwrap();
        let pass_result = response
            .plays
            .iter()
            .find(|p| p.play.is_pass())
            .expect("pass is still reported");
        assert_eq!(pass_result.points, 0.0);
        assert!(pass_result.outcomes.is_empty());
        assert_eq!(response.plays[0].points, 8.0);
    }

    #[test]
    fn peg_requires_tiles_in_the_bag() {
        let (game, movegen) =
            fixture_game(&["BO"], &PEG_BOARD, ["XAEETTO", "KEETTOO"], "");
        let mut solver = preendgame::Solver::new(game, movegen);
        match solver.solve(vec![Move::pass()]) {
            Err(crate::search::SolverError::InvalidPrecondition(_)) => {}
            other => panic!("expected a precondition error, got {other:?}"),
        }
    }
}
