use std::hint::black_box;
use std::sync::Arc;

use bagend::game::Game;
use bagend::game::alphabet::LetterDistribution;
use bagend::game::bag::Bag;
use bagend::moves::move_gen::{Lexicon, MoveGenerator, WordListGen};
use bagend::search::endgame;
use criterion::{Criterion, criterion_group, criterion_main};

const BOARD: [&str; 8] = [
    "...............",
    "...............",
    "...............",
    "...............",
    "...............",
    "...............",
    "...............",
    "......CAT......",
];

const WORDS: &[&str] = &[
    "CAT", "CATS", "AT", "TA", "AS", "AN", "NA", "AE", "AR", "RE", "ER", "ES", "IT", "TI",
    "IN", "AI", "NE", "AIT", "ANE", "ANI", "ANT", "ARE", "ARS", "ART", "EAR", "EAT", "ERA",
    "ETA", "NET", "TEN", "TIN", "TIE", "SIT", "SET", "SEA", "SAT", "TAS", "RAT", "TAR",
];

fn endgame_position() -> (Game, Box<dyn MoveGenerator + Send + Sync>) {
    let ld = Arc::new(LetterDistribution::english());
    let lexicon = Arc::new(Lexicon::from_words(WORDS.iter().copied()).unwrap());
    let mut game = Game::from_position(
        Arc::clone(&ld),
        Arc::clone(&lexicon),
        &BOARD,
        ["AEINRST", "AEINRST"],
        [0, 0],
        0,
    )
    .unwrap();
    let mut empty = Bag::empty();
    std::mem::swap(game.bag_mut(), &mut empty);
    (game, Box::new(WordListGen::new(lexicon, ld)))
}

fn bench_move_generation(c: &mut Criterion) {
    let (game, mut movegen) = endgame_position();
    c.bench_function("generate_all_plays", |b| {
        b.iter(|| {
            movegen.gen_all(black_box(&game), false);
            black_box(movegen.small_plays().len());
        })
    });
}

/// Benchmark a short full solve. Dominated by negamax plus the table
/// probe/store path.
fn bench_shallow_endgame_solve(c: &mut Criterion) {
    c.bench_function("endgame_solve_3_plies", |b| {
        b.iter(|| {
            let (game, movegen) = endgame_position();
            let mut solver = endgame::Solver::new(game, movegen);
            solver.set_tt_fraction_of_mem(1e-9);
            black_box(solver.solve(3).unwrap().value);
        })
    });
}

criterion_group!(benches, bench_move_generation, bench_shallow_endgame_solve);
criterion_main!(benches);
