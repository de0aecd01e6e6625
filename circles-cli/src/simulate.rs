//! Simulate command - unattended games with the scripted hero
//!
//! - run(): orchestration
//! - game_seeds(), play_all(): one seed per game, optionally in parallel
//! - report_results(): text table or JSON

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use circles_core::{play_game, Catalog, Game, GameConfig, GameSummary};

// ============================================================================
// COMMAND ARGUMENTS
// ============================================================================

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of games to play
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Hero turns per game before giving up
    #[arg(long, default_value = "500")]
    pub max_turns: u32,

    /// Board radius
    #[arg(long, default_value_t = circles_core::DEFAULT_RADIUS)]
    pub radius: i32,

    /// Play games on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    games: usize,
    max_turns: u32,
    elapsed_ms: u64,
    avg_rounds: f64,
    best_round: u32,
    total_kills: u32,
    survivors: usize,
    results: Vec<GameSummary>,
}

// ============================================================================
// ORCHESTRATION
// ============================================================================

/// Run simulate command
pub fn run(args: SimulateArgs, seed: Option<u64>, catalog: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(catalog)?;
    let config = GameConfig::default().with_radius(args.radius);
    config.validate()?;

    tracing::info!(
        "Simulating {} games (max {} turns, radius {})",
        args.games,
        args.max_turns,
        args.radius
    );

    let start = Instant::now();
    let seeds = game_seeds(seed, args.games);
    let results = play_all(&config, &catalog, &seeds, args.max_turns, args.parallel)?;
    let report = summarize(results, args.max_turns, start.elapsed());

    report_results(&report, args.json)
}

fn load_catalog(path: Option<&Path>) -> Result<Arc<Catalog>> {
    let catalog = match path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::default(),
    };
    Ok(Arc::new(catalog))
}

/// Derive one seed per game from the master seed
fn game_seeds(seed: Option<u64>, games: usize) -> Vec<u64> {
    let mut rng = match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    };
    (0..games).map(|_| rng.gen()).collect()
}

fn play_all(
    config: &GameConfig,
    catalog: &Arc<Catalog>,
    seeds: &[u64],
    max_turns: u32,
    parallel: bool,
) -> Result<Vec<GameSummary>> {
    let play = |&seed: &u64| -> Result<GameSummary> {
        let mut game = Game::start(config.clone().with_seed(seed), catalog.clone())
            .with_context(|| format!("starting game with seed {}", seed))?;
        let summary = play_game(&mut game, max_turns);
        tracing::debug!(
            "Seed {}: round {} after {} turns",
            seed,
            summary.rounds,
            summary.turns
        );
        Ok(summary)
    };

    if parallel {
        seeds.par_iter().map(play).collect()
    } else {
        seeds.iter().map(play).collect()
    }
}

fn summarize(results: Vec<GameSummary>, max_turns: u32, elapsed: Duration) -> SimulationReport {
    let games = results.len();
    let total_rounds: u32 = results.iter().map(|r| r.rounds).sum();

    SimulationReport {
        games,
        max_turns,
        elapsed_ms: elapsed.as_millis() as u64,
        avg_rounds: if games == 0 {
            0.0
        } else {
            total_rounds as f64 / games as f64
        },
        best_round: results.iter().map(|r| r.rounds).max().unwrap_or(0),
        total_kills: results.iter().map(|r| r.kills).sum(),
        survivors: results.iter().filter(|r| !r.game_over).count(),
        results,
    }
}

fn report_results(report: &SimulationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("\n=== All Circles Simulation ===");
    println!(
        "{:<22} {:>8} {:>8} {:>8} {:>8}  {}",
        "Seed", "Rounds", "Turns", "Kills", "Health", "Result"
    );
    println!("{}", "-".repeat(72));
    for r in &report.results {
        println!(
            "{:<22} {:>8} {:>8} {:>8} {:>8}  {}",
            r.seed,
            r.rounds,
            r.turns,
            r.kills,
            r.hero_health,
            if r.game_over { "fallen" } else { "turn cap" }
        );
    }
    println!("{}", "-".repeat(72));
    println!(
        "{} games in {}ms: avg round {:.1}, best round {}, {} kills, {} survived",
        report.games,
        report.elapsed_ms,
        report.avg_rounds,
        report.best_round,
        report.total_kills,
        report.survivors
    );

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_seeds_are_reproducible() {
        assert_eq!(game_seeds(Some(3), 5), game_seeds(Some(3), 5));
        assert_ne!(game_seeds(Some(3), 5), game_seeds(Some(4), 5));
        assert_eq!(game_seeds(None, 4).len(), 4);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let catalog = load_catalog(None).unwrap();
        let config = GameConfig::default();
        let seeds = game_seeds(Some(1), 4);

        let sequential = play_all(&config, &catalog, &seeds, 30, false).unwrap();
        let parallel = play_all(&config, &catalog, &seeds, 30, true).unwrap();
        assert_eq!(sequential, parallel);
        assert!(sequential.iter().all(|r| r.turns <= 30));
    }

    #[test]
    fn test_summarize() {
        let results = vec![
            GameSummary {
                seed: 1,
                rounds: 2,
                turns: 10,
                kills: 1,
                hero_health: 0,
                game_over: true,
            },
            GameSummary {
                seed: 2,
                rounds: 4,
                turns: 20,
                kills: 3,
                hero_health: 12,
                game_over: false,
            },
        ];
        let report = summarize(results, 20, Duration::from_millis(5));
        assert_eq!(report.avg_rounds, 3.0);
        assert_eq!(report.best_round, 4);
        assert_eq!(report.total_kills, 4);
        assert_eq!(report.survivors, 1);
    }

    #[test]
    fn test_summarize_empty() {
        let report = summarize(Vec::new(), 10, Duration::ZERO);
        assert_eq!(report.avg_rounds, 0.0);
        assert_eq!(report.best_round, 0);
    }
}
