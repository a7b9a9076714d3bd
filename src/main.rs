use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use wnba_predictor::config::{self, PipelineConfig};
use wnba_predictor::features::BuildReport;
use wnba_predictor::store::SqliteStore;
use wnba_predictor::{build_features, train_and_evaluate};

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut cfg = PipelineConfig::from_env();
    if let Some(season) = parse_i32_arg("--cutoff") {
        cfg.cutoff_season = Some(season);
    }
    if let Some(folds) = parse_usize_arg("--folds") {
        cfg.folds = folds.max(2);
    }

    let db_path = parse_path_arg("--db")
        .or_else(config::db_path_from_env)
        .context("unable to resolve sqlite path")?;
    let store = SqliteStore::open(&db_path)?;

    let table = build_features(&store, cfg.window)?;
    print_report(&table.report);

    let run = train_and_evaluate(table, &cfg)?;
    let eval = run.evaluation;

    println!();
    println!("=== Logistic Regression ===");
    println!(
        "Holdout season: {} (train={} test={})",
        run.split.cutoff_season,
        run.split.y_train.len(),
        run.split.y_test.len()
    );
    println!("Accuracy: {:.4}", eval.accuracy);
    println!("Cross-validation Accuracy: {:.4}", eval.cv_accuracy);
    match eval.roc_auc {
        Some(auc) => println!("ROC-AUC: {auc:.4}"),
        None => println!("ROC-AUC: n/a (single class in holdout)"),
    }
    println!("Log Loss: {:.4}", eval.log_loss);
    println!(
        "Solver: iterations={} converged={}",
        run.pipeline.classifier().iterations,
        run.pipeline.classifier().converged
    );

    if has_flag("--save-model") {
        let model_path = parse_path_arg("--model")
            .or_else(config::model_path_from_env)
            .context("unable to resolve model path")?;
        run.pipeline.save(&model_path)?;
        println!("Fitted pipeline written: {}", model_path.display());
    }

    Ok(())
}

fn print_report(report: &BuildReport) {
    println!("DB games: {}", report.games_total);
    println!("Feature rows: {}", report.rows);
    println!(
        "Dropped: unresolved_opponent={} missing_stats={} duplicate_stats={} missing_features={}",
        report.unresolved_opponent,
        report.missing_stats,
        report.duplicate_stats,
        report.missing_features
    );
    if report.has_integrity_issues() {
        for err in report.integrity_errors().iter().take(8) {
            println!(" - {err}");
        }
    }
}

fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}=")) {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    arg_value(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_i32_arg(name: &str) -> Option<i32> {
    arg_value(name).and_then(|v| v.parse::<i32>().ok())
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    arg_value(name).and_then(|v| v.parse::<usize>().ok())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
