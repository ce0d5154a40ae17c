use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use bagend::cli::{Cli, Commands};
use bagend::game::alphabet::{LetterDistribution, letters_from_str};
use bagend::moves::move_gen::{Lexicon, PlayRecorder, SortingParameter, WordListGen};
use bagend::moves::move_gen::MoveGenerator;
use bagend::search::{endgame, preendgame};
use bagend::utils::log;
use bagend::{gcg, init};
use clap::Parser;
use miette::{Context, IntoDiagnostic};
use tracing::{Level, info};

fn main() -> miette::Result<()> {
    init();
    let cli = Cli::parse();
    let level = Level::from_str(&cli.log_level)
        .into_diagnostic()
        .with_context(|| format!("bad log level {:?}", cli.log_level))?;
    log::set_log_level(level)?;
    if cli.log_file {
        log::toggle_file_logging(true)?;
    }

    match cli.command {
        Commands::Endgame {
            gcg: gcg_path,
            lexicon,
            plies,
            threads,
            first_win,
            no_table,
            no_deepening,
            no_early_pass,
            table_mem_fraction,
            timeout,
        } => {
            let ld = Arc::new(LetterDistribution::english());
            let lexicon = Arc::new(Lexicon::from_file(&lexicon)?);
            let game = gcg::load_game_from_file(&gcg_path, Arc::clone(&ld), Arc::clone(&lexicon))?;
            info!(
                on_turn = game.player_on_turn(),
                spread = game.current_spread(),
                "position loaded"
            );
            println!("{}", game.board());
            let movegen = Box::new(WordListGen::new(lexicon, ld));
            let mut solver = endgame::Solver::new(game, movegen);
            solver.set_threads(threads);
            solver.set_first_win(first_win);
            solver.set_transposition_table(!no_table);
            solver.set_iterative_deepening(!no_deepening);
            solver.set_early_pass(!no_early_pass);
            solver.set_tt_fraction_of_mem(table_mem_fraction);
            if let Some(secs) = timeout {
                let cancel = solver.cancel_handle();
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_secs(secs));
                    cancel.store(true, Ordering::Release);
                });
            }
            let outcome = solver.solve(plies)?;
            if outcome.canceled {
                println!("search canceled early; best line so far:");
            }
            println!("optimal spread delta: {}", outcome.value);
            for (i, m) in outcome.pv.iter().enumerate() {
                println!("  {}: {}", i + 1, m.short_description());
            }
        }
        Commands::Peg {
            gcg: gcg_path,
            lexicon,
            endgame_plies,
            threads,
            opp_rack,
            skip_loss,
            early_cutoff,
            skip_non_emptying,
            table_mem_fraction,
            timeout,
            top,
        } => {
            let ld = Arc::new(LetterDistribution::english());
            let lexicon = Arc::new(Lexicon::from_file(&lexicon)?);
            let game = gcg::load_game_from_file(&gcg_path, Arc::clone(&ld), Arc::clone(&lexicon))?;
            info!(
                on_turn = game.player_on_turn(),
                in_bag = game.bag().tiles_remaining(),
                "position loaded"
            );
            println!("{}", game.board());
            // candidates come from the generator over the current rack
            let mut movegen = WordListGen::new(Arc::clone(&lexicon), Arc::clone(&ld));
            movegen.set_gen_pass(true);
            movegen.set_sorting_parameter(SortingParameter::Score);
            movegen.set_play_recorder(PlayRecorder::AllSmall);
            movegen.gen_all(&game, false);
            let candidates: Vec<_> = movegen
                .small_plays()
                .iter()
                .map(|sm| sm.to_move(game.board()))
                .collect::<Result<_, _>>()?;
            info!(candidates = candidates.len(), "generated candidate plays");
            let mut solver = preendgame::Solver::new(game, Box::new(movegen));
            solver.set_threads(threads);
            solver.set_endgame_plies(endgame_plies);
            solver.set_skip_loss(skip_loss);
            solver.set_early_cutoff(early_cutoff);
            solver.set_skip_non_bag_emptying(skip_non_emptying);
            solver.set_tt_fraction_of_mem(table_mem_fraction);
            solver.set_timeout(timeout.map(Duration::from_secs));
            if let Some(rack) = opp_rack {
                solver.set_known_opp_rack(Some(letters_from_str(&rack)?));
            }
            let response = solver.solve(candidates)?;
            if response.canceled_early {
                println!("analysis ran out of time; best results so far:");
            }
            println!(
                "{} endgames solved, {} plays cut off",
                response.endgames_solved, response.cutoffs
            );
            for result in response.plays.iter().take(top) {
                println!("  {result}");
            }
        }
    }
    Ok(())
}
