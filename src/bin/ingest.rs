use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use wnba_predictor::config;
use wnba_predictor::ingest;
use wnba_predictor::store::SqliteStore;

/// Usage: `ingest --stats test.txt --games text.txt [--db PATH]`
fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let stats_path = parse_path_arg("--stats");
    let games_path = parse_path_arg("--games");
    if stats_path.is_none() && games_path.is_none() {
        return Err(anyhow!("nothing to ingest: pass --stats FILE and/or --games FILE"));
    }

    let db_path = parse_path_arg("--db")
        .or_else(config::db_path_from_env)
        .context("unable to resolve sqlite path")?;

    let stats_raw = read_optional(stats_path.as_ref())?;
    let games_raw = read_optional(games_path.as_ref())?;
    let stats = ingest::parse_stat_dump(&stats_raw);
    let games = ingest::parse_game_dump(&games_raw);

    let mut store = SqliteStore::open(&db_path)?;
    let mut summary = ingest::load_into_store(&mut store, &stats, &games)?;
    summary.db_path = Some(db_path);

    println!("Ingest complete");
    if let Some(path) = &summary.db_path {
        println!("DB: {}", path.display());
    }
    println!("Teams: {}", summary.teams);
    println!("Season stats upserted: {}", summary.stats_upserted);
    println!("Games upserted: {}", summary.games_upserted);
    if !summary.errors.is_empty() {
        println!("Errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}

fn read_optional(path: Option<&PathBuf>) -> Result<String> {
    let Some(path) = path else {
        return Ok(String::new());
    };
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
