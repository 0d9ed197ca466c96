//! goban-rules: a Go rules engine and referee.
//!
//! ## Usage
//!
//! - `goban-rules` - Show a demo
//! - `goban-rules gtp [--size N] [--rules R] [--komi K]` - Start a GTP referee
//! - `goban-rules score <record.json>` - Estimate dead stones and score a game record
//! - `goban-rules demo` - Play a short game and score it
//!
//! Logs go to stderr and are filtered through `RUST_LOG` (default `warn`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use goban_rules::constants::{DEFAULT_BOARD_SIZE, ESTIMATOR_TRIALS};
use goban_rules::estimator::EstimatorConfig;
use goban_rules::game::{Game, GamePhase, GameRecord, GameSettings};
use goban_rules::gtp::GtpEngine;
use goban_rules::point::{Color, Move, Point};
use goban_rules::rules::Ruleset;

/// goban-rules: Go rules, history and scoring engine
#[derive(Parser)]
#[command(name = "goban-rules")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a GTP (Go Text Protocol) referee on stdin/stdout
    Gtp {
        /// Board size
        #[arg(long, default_value_t = DEFAULT_BOARD_SIZE)]
        size: usize,
        /// Ruleset preset
        #[arg(long, value_enum, default_value_t = Ruleset::Chinese)]
        rules: Ruleset,
        /// Komi; defaults to the ruleset's
        #[arg(long)]
        komi: Option<f64>,
    },
    /// Load a JSON game record, estimate dead stones and print the score
    Score {
        /// Path to the game record
        record: PathBuf,
        /// Estimator trials to vote over
        #[arg(long, default_value_t = ESTIMATOR_TRIALS)]
        trials: usize,
    },
    /// Run a simple demo of the engine
    Demo,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Gtp { size, rules, komi }) => {
            let mut settings = GameSettings::new(size, size, rules).context("invalid GTP settings")?;
            if let Some(komi) = komi {
                settings.komi = komi;
            }
            let mut engine = GtpEngine::new(settings);
            engine.run().context("GTP session failed")?;
        }
        Some(Commands::Score { record, trials }) => score_record(&record, trials)?,
        Some(Commands::Demo) | None => run_demo()?,
    }
    Ok(())
}

fn score_record(path: &Path, trials: usize) -> Result<()> {
    let json = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let record = GameRecord::from_json(&json).with_context(|| format!("failed to parse {}", path.display()))?;

    let mut game = Game::from_record(&record).context("failed to replay game record")?;
    game.set_estimator_config(EstimatorConfig {
        trials,
        ..EstimatorConfig::default()
    });

    if game.phase() == GamePhase::Play {
        game.set_phase(GamePhase::StoneRemoval)?;
    }
    if let Some(removed) = game.wait_estimation() {
        game.set_removed_points(removed)?;
    }
    game.set_phase(GamePhase::Finished)?;

    let position = game.current_position();
    println!("{}", position.board());
    if let Some(scores) = &position.game_scores {
        for (name, score) in [("Black", &scores.black), ("White", &scores.white)] {
            println!(
                "{name}: territory {} stones {} prisoners {} komi {} handicap {} => {}",
                score.territory, score.stones, score.prisoners, score.komi, score.handicap, score.total
            );
        }
        println!("Result: {}", scores.result_string());
    }
    println!("{}", game.status());
    Ok(())
}

fn run_demo() -> Result<()> {
    println!("goban-rules: Go rules engine\n");

    println!("=== Capture Demo ===");
    let mut game = Game::new(GameSettings::new(9, 9, Ruleset::Japanese)?);
    for (row, column) in [(2, 2), (2, 3), (6, 6), (1, 2), (6, 2), (3, 2), (6, 4), (2, 1)] {
        game.make_move(Move::Place(Point::new(row, column)), None)?;
    }
    let position = game.current_position();
    println!("{}", position.board());
    println!(
        "Prisoners: Black {}, White {}",
        position.captures(Color::Black),
        position.captures(Color::White)
    );
    println!("{}\n", game.status());

    println!("=== Scoring Demo ===");
    game.make_move(Move::Pass, None)?;
    game.make_move(Move::Pass, None)?;
    game.set_phase(GamePhase::StoneRemoval)?;
    if let Some(removed) = game.wait_estimation() {
        println!("Estimated removals: {} points", removed.len());
        game.set_removed_points(removed)?;
    }
    println!("{}", game.status());
    game.set_phase(GamePhase::Finished)?;
    println!("{}", game.status());
    Ok(())
}
