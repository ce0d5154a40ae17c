use std::sync::Arc;

use super::*;
use crate::game::alphabet::letter_from_char;
use crate::moves::move_gen::Lexicon;

pub(crate) fn cat_game(racks: [&str; 2]) -> Game {
    let ld = Arc::new(LetterDistribution::english());
    let lexicon =
        Arc::new(Lexicon::from_words(["CAT", "CATS", "DOGS"]).unwrap());
    let mut game = Game::from_position(
        ld,
        lexicon,
        &[
            "...............",
            "...............",
            "...............",
            "...............",
            "...............",
            "...............",
            "...............",
            "......CAT......",
        ],
        racks,
        [0, 0],
        0,
    )
    .unwrap();
    // endgame fixtures keep the bag empty
    let mut bag = bag::Bag::empty();
    std::mem::swap(game.bag_mut(), &mut bag);
    game
}

fn cats_hook() -> Move {
    let s = letter_from_char('S').unwrap();
    Move {
        kind: crate::moves::MoveKind::TilePlacement,
        row: 7,
        col: 6,
        vertical: false,
        tiles: vec![0, 0, 0, s],
        score: 6,
        tiles_played: 1,
    }
}

#[test]
fn play_and_unplay_restore_state_exactly() {
    let mut game = cat_game(["SDOG", "QXJ"]);
    game.set_backup_mode(BackupMode::Simulation);
    game.set_state_stack_length(4);
    let before = game.clone();
    game.play_move(&cats_hook()).unwrap();
    assert_eq!(game.player_on_turn(), 1);
    assert_eq!(game.score_for(0), 6);
    assert_eq!(game.board().letter_at(7, 9), letter_from_char('S').unwrap());
    game.unplay_last_move();
    assert_eq!(game.board().get_squares(), before.board().get_squares());
    assert_eq!(game.rack_for(0), before.rack_for(0));
    assert_eq!(game.score_for(0), 0);
    assert_eq!(game.player_on_turn(), 0);
    assert_eq!(game.play_state(), PlayState::Playing);
}

#[test]
fn going_out_gains_twice_the_opponent_rack() {
    let mut game = cat_game(["S", "QXJ"]);
    game.play_move(&cats_hook()).unwrap();
    assert_eq!(game.play_state(), PlayState::GameOver);
    // 6 for CATS plus 2 x 26 for Q, X, J left on the opponent's rack
    assert_eq!(game.score_for(0), 58);
    assert_eq!(game.spread_for(0), 58);
}

#[test]
fn two_passes_end_an_endgame() {
    let mut game = cat_game(["SDOG", "QXJ"]);
    game.set_endgame_mode(true);
    game.play_move(&Move::pass()).unwrap();
    assert_eq!(game.scoreless_turns(), 1);
    assert_eq!(game.last_scoreless_turns(), 0);
    assert_eq!(game.play_state(), PlayState::Playing);
    game.play_move(&Move::pass()).unwrap();
    assert_eq!(game.play_state(), PlayState::GameOver);
    // both racks come off their owners' scores
    assert_eq!(game.score_for(0), -6);
    assert_eq!(game.score_for(1), -26);
}

#[test]
fn six_scoreless_turns_end_a_standard_game() {
    let mut game = cat_game(["SDOG", "QXJ"]);
    for _ in 0..5 {
        game.play_move(&Move::pass()).unwrap();
        assert_eq!(game.play_state(), PlayState::Playing);
    }
    game.play_move(&Move::pass()).unwrap();
    assert_eq!(game.play_state(), PlayState::GameOver);
}

#[test]
fn draws_refill_the_rack_in_bag_order() {
    let ld = Arc::new(LetterDistribution::english());
    let lexicon = Arc::new(Lexicon::from_words(["CAT", "CATS"]).unwrap());
    let mut game = Game::from_position(
        Arc::clone(&ld),
        lexicon,
        &[
            "...............",
            "...............",
            "...............",
            "...............",
            "...............",
            "...............",
            "...............",
            "......CAT......",
        ],
        ["S", "QXJ"],
        [0, 0],
        0,
    )
    .unwrap();
    // leave exactly two known tiles in the bag
    let z = letter_from_char('Z').unwrap();
    let e = letter_from_char('E').unwrap();
    let mut bag = bag::Bag::from_tiles(vec![e, z]);
    std::mem::swap(game.bag_mut(), &mut bag);
    game.set_backup_mode(BackupMode::Simulation);
    game.set_state_stack_length(2);
    game.play_move(&cats_hook()).unwrap();
    // played one tile, drew the Z off the end
    assert_eq!(game.rack_for(0).letters(), "Z");
    assert_eq!(game.bag().tiles_remaining(), 1);
    game.unplay_last_move();
    assert_eq!(game.rack_for(0).letters(), "S");
    assert_eq!(game.bag().peek(), &[e, z]);
}

#[test]
fn set_random_rack_honors_known_tiles() {
    let ld = Arc::new(LetterDistribution::english());
    let lexicon = Arc::new(Lexicon::from_words(["CAT"]).unwrap());
    let mut game = Game::new(ld, lexicon);
    let q = letter_from_char('Q').unwrap();
    game.set_random_rack(1, Some(&[q])).unwrap();
    assert_eq!(game.rack_for(1).num_tiles(), 7);
    assert_eq!(game.rack_for(1).count(q), 1);
    let err = game.set_random_rack(1, Some(&[q, q]));
    assert!(err.is_err(), "only one Q exists in the distribution");
}
