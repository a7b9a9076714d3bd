use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use wnba_predictor::config::{self, PipelineConfig};
use wnba_predictor::records::Team;
use wnba_predictor::store::{SqliteStore, StatsStore};
use wnba_predictor::{FittedPipeline, Matchup, build_features, predict_matchups, train_and_evaluate};

/// Usage: `predict [--db PATH] [--model PATH] [--retrain] TEAM:OPP[:home] ...`
///
/// Teams may be given by id, abbreviation or full name.
fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = PipelineConfig::from_env();
    let tokens = positional_args();
    if tokens.is_empty() {
        return Err(anyhow!(
            "no matchups given (expected TEAM:OPP or TEAM:OPP:home, e.g. NYL:LVA:home)"
        ));
    }

    let db_path = parse_path_arg("--db")
        .or_else(config::db_path_from_env)
        .context("unable to resolve sqlite path")?;
    let store = SqliteStore::open(&db_path)?;
    let teams = store.list_teams()?;

    let mut matchups = Vec::with_capacity(tokens.len());
    for token in &tokens {
        matchups.push(parse_matchup(token, &teams)?);
    }

    let table = build_features(&store, cfg.window)?;

    let model_path = parse_path_arg("--model").or_else(config::model_path_from_env);
    let saved = match (&model_path, has_flag("--retrain")) {
        (Some(path), false) if path.exists() => match load_for_window(path, cfg.window) {
            Ok(p) => Some(p),
            Err(err) => {
                warn!(error = %err, "saved pipeline unusable, retraining");
                None
            }
        },
        _ => None,
    };
    let pipeline = match saved {
        Some(p) => p,
        None => {
            let run = train_and_evaluate(table.clone(), &cfg)?;
            info!(
                accuracy = run.evaluation.accuracy,
                cutoff_season = run.split.cutoff_season,
                "trained fresh pipeline"
            );
            if let Some(path) = &model_path {
                run.pipeline.save(path)?;
            }
            run.pipeline
        }
    };

    let predictions = predict_matchups(&matchups, &pipeline, &table.rows, &teams)?;

    println!(
        "{:<26} {:<26} {:<5} {:<26} {:>7}",
        "Team", "Opponent", "Home", "Predicted winner", "P(win)"
    );
    for (m, p) in matchups.iter().zip(&predictions) {
        println!(
            "{:<26} {:<26} {:<5} {:<26} {:>6.1}%{}",
            p.team_name,
            p.opponent_name,
            if m.home { "yes" } else { "no" },
            p.predicted_winner_name,
            p.win_probability * 100.0,
            if p.imputed_features > 0 { " (limited history)" } else { "" }
        );
    }

    Ok(())
}

fn load_for_window(path: &Path, window: usize) -> wnba_predictor::Result<FittedPipeline> {
    let pipeline = FittedPipeline::load(path)?;
    pipeline.ensure_window(window)?;
    Ok(pipeline)
}

fn parse_matchup(token: &str, teams: &[Team]) -> Result<Matchup> {
    let parts = token.split(':').map(str::trim).collect::<Vec<_>>();
    let (team, opponent, home) = match parts.as_slice() {
        [t, o] => (*t, *o, false),
        [t, o, flag] => (*t, *o, flag.eq_ignore_ascii_case("home")),
        _ => return Err(anyhow!("invalid matchup {token:?}")),
    };
    // Unknown tokens resolve to an id no team has, so validation reports them
    // together with identical-team requests.
    Ok(Matchup {
        team_id: resolve_team(team, teams).unwrap_or(-1),
        opponent_id: resolve_team(opponent, teams).unwrap_or(-1),
        home,
    })
}

fn resolve_team(token: &str, teams: &[Team]) -> Option<i64> {
    if let Ok(id) = token.parse::<i64>() {
        return Some(id);
    }
    teams
        .iter()
        .find(|t| t.abbreviation.eq_ignore_ascii_case(token) || t.name.eq_ignore_ascii_case(token))
        .map(|t| t.id)
}

fn positional_args() -> Vec<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--db" || arg == "--model" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(arg.clone());
    }
    out
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

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
