//! The fitted scaler and classifier travel together with the column manifest
//! they were trained on.

use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{ModelConfig, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::features::{FEATURE_COUNT, FeatureTable, FeatureVector, feature_columns};
use crate::metrics::{self, Evaluation};
use crate::model::LogisticRegression;
use crate::split::{self, SplitData, StandardScaler};

const PIPELINE_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    version: u32,
    manifest: Vec<String>,
    scaler: StandardScaler,
    classifier: LogisticRegression,
    model_config: ModelConfig,
    /// Trailing window the recency columns were computed with.
    rolling_window: usize,
    cutoff_season: i32,
    train_samples: usize,
    trained_at: String,
}

impl FittedPipeline {
    /// Trains the classifier on the already-scaled training partition and
    /// binds it to the scaler that produced that partition.
    pub fn fit(split: &SplitData, cfg: &ModelConfig, rolling_window: usize) -> Result<Self> {
        let classifier = LogisticRegression::fit(&split.x_train, &split.y_train, cfg)?;
        info!(
            cutoff_season = split.cutoff_season,
            train_samples = split.y_train.len(),
            iterations = classifier.iterations,
            converged = classifier.converged,
            "pipeline fitted"
        );
        Ok(Self {
            version: PIPELINE_VERSION,
            manifest: feature_columns(),
            scaler: split.scaler.clone(),
            classifier,
            model_config: *cfg,
            rolling_window,
            cutoff_season: split.cutoff_season,
            train_samples: split.y_train.len(),
            trained_at: Utc::now().to_rfc3339(),
        })
    }

    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.model_config
    }

    pub fn rolling_window(&self) -> usize {
        self.rolling_window
    }

    /// Fails when recency features would be computed with a different window
    /// than the one the model was trained on.
    pub fn ensure_window(&self, configured: usize) -> Result<()> {
        if self.rolling_window == configured {
            Ok(())
        } else {
            Err(PipelineError::WindowMismatch {
                trained: self.rolling_window,
                configured,
            })
        }
    }

    pub fn cutoff_season(&self) -> i32 {
        self.cutoff_season
    }

    pub fn train_samples(&self) -> usize {
        self.train_samples
    }

    pub fn trained_at(&self) -> &str {
        &self.trained_at
    }

    /// Win probability for one unscaled feature vector.
    pub fn predict_probability(&self, raw: &FeatureVector) -> f64 {
        self.classifier
            .predict_probability(&self.scaler.transform_row(raw))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("serialize fitted pipeline")?;
        fs::write(&tmp, json).context("write fitted pipeline")?;
        fs::rename(&tmp, path).context("swap fitted pipeline")?;
        Ok(())
    }

    /// Loads a saved pipeline and rejects it if it was trained on a different
    /// feature layout than the one compiled into this binary.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read fitted pipeline {}", path.display()))?;
        let pipeline: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parse fitted pipeline {}", path.display()))?;
        pipeline.check_manifest()?;
        Ok(pipeline)
    }

    fn check_manifest(&self) -> Result<()> {
        let expected = feature_columns();
        let consistent = self.manifest == expected
            && self.scaler.means.len() == FEATURE_COUNT
            && self.scaler.scales.len() == FEATURE_COUNT
            && self.classifier.weights.len() == FEATURE_COUNT
            && self.rolling_window >= 1;
        if consistent {
            Ok(())
        } else {
            Err(PipelineError::ManifestMismatch {
                expected: expected.len(),
                found: self.manifest.len(),
            })
        }
    }
}

/// Outcome of one training run.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub table: FeatureTable,
    pub split: SplitData,
    pub pipeline: FittedPipeline,
    pub evaluation: Evaluation,
}

/// Split, fit and evaluate. Nothing is returned unless every step succeeds,
/// so a failed run never yields a usable pipeline.
pub fn train_and_evaluate(table: FeatureTable, cfg: &PipelineConfig) -> Result<TrainingRun> {
    let split = split::split_and_scale(&table, cfg.cutoff_season)?;
    let pipeline = FittedPipeline::fit(&split, &cfg.model, cfg.window)?;
    let evaluation = metrics::evaluate(&pipeline, &split, cfg.folds)?;
    Ok(TrainingRun {
        table,
        split,
        pipeline,
        evaluation,
    })
}
