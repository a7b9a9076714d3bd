use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const CACHE_DIR: &str = "wnba_predictor";

/// Trailing window used by the recency features.
pub const DEFAULT_ROLLING_WINDOW: usize = 3;
pub const DEFAULT_CV_FOLDS: usize = 5;

/// Newton steps; a well-posed fit needs a few dozen at most.
pub const DEFAULT_MAX_ITER: usize = 100;
pub const DEFAULT_TOLERANCE: f64 = 1e-6;
/// Inverse regularization strength, same meaning as scikit-learn's `C`.
pub const DEFAULT_INVERSE_L2: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub max_iter: usize,
    pub tolerance: f64,
    pub inverse_l2: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            inverse_l2: DEFAULT_INVERSE_L2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub window: usize,
    pub folds: usize,
    /// Holdout season. `None` picks the most recent season in the table.
    pub cutoff_season: Option<i32>,
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_ROLLING_WINDOW,
            folds: DEFAULT_CV_FOLDS,
            cutoff_season: None,
            model: ModelConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `WNBA_*` environment variables (`.env.local` and
    /// `.env` are honoured). Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        load_env_files();
        let d = Self::default();
        Self {
            window: env_parse("WNBA_ROLLING_WINDOW")
                .unwrap_or(d.window)
                .max(1),
            folds: env_parse("WNBA_CV_FOLDS").unwrap_or(d.folds).max(2),
            cutoff_season: env_parse("WNBA_CUTOFF_SEASON"),
            model: ModelConfig {
                max_iter: env_parse("WNBA_MAX_ITER")
                    .unwrap_or(d.model.max_iter)
                    .max(1),
                tolerance: d.model.tolerance,
                inverse_l2: env_parse("WNBA_INVERSE_L2")
                    .unwrap_or(d.model.inverse_l2)
                    .max(1e-6),
            },
        }
    }
}

/// `.env.local` first so it wins over `.env`; neither file is required.
pub fn load_env_files() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

/// `WNBA_DB_PATH`, else the cache directory default.
pub fn db_path_from_env() -> Option<PathBuf> {
    load_env_files();
    env_path("WNBA_DB_PATH").or_else(crate::store::default_db_path)
}

/// `WNBA_MODEL_PATH`, else `fitted_pipeline.json` in the cache directory.
pub fn model_path_from_env() -> Option<PathBuf> {
    load_env_files();
    env_path("WNBA_MODEL_PATH").or_else(|| app_cache_dir().map(|d| d.join("fitted_pipeline.json")))
}

fn env_path(key: &str) -> Option<PathBuf> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}
