use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Also write debug logs to /tmp/bagend_logs
    #[arg(long)]
    pub log_file: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Solve an empty-bag endgame from a transcript position
    Endgame {
        /// GCG transcript leading to the position
        #[arg(short, long)]
        gcg: PathBuf,
        /// Word list, one word per line
        #[arg(short, long)]
        lexicon: PathBuf,
        /// Search depth in half-moves
        #[arg(short, long, default_value = "8")]
        plies: u32,
        /// Worker threads; 2 or more enables lazy-SMP
        #[arg(short, long, default_value = "1")]
        threads: usize,
        /// Stop at the first winning line regardless of magnitude
        #[arg(long)]
        first_win: bool,
        /// Disable the transposition table
        #[arg(long)]
        no_table: bool,
        /// Disable iterative deepening
        #[arg(long)]
        no_deepening: bool,
        /// Disable the pass-answering-pass ordering bonus
        #[arg(long)]
        no_early_pass: bool,
        /// Fraction of memory for the transposition table
        #[arg(long, default_value = "0.25")]
        table_mem_fraction: f64,
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Evaluate pre-endgame candidate plays (1-7 tiles in the bag)
    Peg {
        /// GCG transcript leading to the position
        #[arg(short, long)]
        gcg: PathBuf,
        /// Word list, one word per line
        #[arg(short, long)]
        lexicon: PathBuf,
        /// Ply depth for each endgame solve
        #[arg(short, long, default_value = "4")]
        endgame_plies: u32,
        /// Worker threads
        #[arg(short, long, default_value = "1")]
        threads: usize,
        /// Opponent tiles known from tracking, e.g. "QX"
        #[arg(long)]
        opp_rack: Option<String>,
        /// Abandon a play at its first known loss
        #[arg(long)]
        skip_loss: bool,
        /// Abandon plays with more losses than the best play so far
        #[arg(long)]
        early_cutoff: bool,
        /// Only evaluate plays that empty the bag
        #[arg(long)]
        skip_non_emptying: bool,
        /// Fraction of memory for the transposition tables
        #[arg(long, default_value = "0.25")]
        table_mem_fraction: f64,
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Only report the top N plays
        #[arg(short = 'n', long, default_value = "20")]
        top: usize,
    },
}
