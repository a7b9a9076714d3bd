use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::features::{FEATURE_COUNT, FeatureTable, FeatureVector};

/// Per-column standardization fitted on the training partition only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Population moments. Constant columns get scale 1.0 so they map to 0.
    pub fn fit(rows: &[FeatureVector]) -> Result<Self> {
        if rows.is_empty() {
            return Err(PipelineError::InsufficientData(
                "cannot fit scaler on zero rows".to_string(),
            ));
        }
        let n = rows.len() as f64;
        let mut means = vec![0.0; FEATURE_COUNT];
        for row in rows {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut scales = vec![0.0; FEATURE_COUNT];
        for row in rows {
            for ((s, x), m) in scales.iter_mut().zip(row).zip(&means) {
                let d = x - m;
                *s += d * d;
            }
        }
        for s in &mut scales {
            let std = (*s / n).sqrt();
            *s = if std > 1e-12 { std } else { 1.0 };
        }

        Ok(Self { means, scales })
    }

    pub fn transform_row(&self, row: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = (row[i] - self.means[i]) / self.scales[i];
        }
        out
    }

    pub fn transform(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct SplitData {
    pub cutoff_season: i32,
    pub x_train_raw: Vec<FeatureVector>,
    pub x_test_raw: Vec<FeatureVector>,
    pub x_train: Vec<FeatureVector>,
    pub x_test: Vec<FeatureVector>,
    pub y_train: Vec<u8>,
    pub y_test: Vec<u8>,
    pub scaler: StandardScaler,
}

/// Temporal split: seasons before `cutoff_season` train, `cutoff_season`
/// itself is the holdout. Later seasons are left out entirely. Defaults to
/// the most recent season in the table.
pub fn split_and_scale(table: &FeatureTable, cutoff_season: Option<i32>) -> Result<SplitData> {
    let cutoff_season = match cutoff_season.or_else(|| table.latest_season()) {
        Some(season) => season,
        None => {
            return Err(PipelineError::InsufficientData(
                "feature table has no rows".to_string(),
            ));
        }
    };

    let mut x_train_raw = Vec::new();
    let mut y_train = Vec::new();
    let mut x_test_raw = Vec::new();
    let mut y_test = Vec::new();
    for row in &table.rows {
        if row.season < cutoff_season {
            x_train_raw.push(row.features());
            y_train.push(row.label);
        } else if row.season == cutoff_season {
            x_test_raw.push(row.features());
            y_test.push(row.label);
        }
    }

    if x_train_raw.is_empty() {
        return Err(PipelineError::InsufficientData(format!(
            "no training rows before season {cutoff_season}"
        )));
    }
    if x_test_raw.is_empty() {
        return Err(PipelineError::InsufficientData(format!(
            "no holdout rows for season {cutoff_season}"
        )));
    }

    let scaler = StandardScaler::fit(&x_train_raw)?;
    let x_train = scaler.transform(&x_train_raw);
    let x_test = scaler.transform(&x_test_raw);
    info!(
        cutoff_season,
        train = x_train.len(),
        test = x_test.len(),
        "temporal split"
    );

    Ok(SplitData {
        cutoff_season,
        x_train_raw,
        x_test_raw,
        x_train,
        x_test,
        y_train,
        y_test,
        scaler,
    })
}
