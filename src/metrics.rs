use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ModelConfig;
use crate::error::{PipelineError, Result};
use crate::features::FeatureVector;
use crate::model::LogisticRegression;
use crate::pipeline::FittedPipeline;
use crate::split::{SplitData, StandardScaler};

const LOG_LOSS_EPS: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub samples: usize,
    pub accuracy: f64,
    pub cv_accuracy: f64,
    /// `None` when the holdout contains a single class.
    pub roc_auc: Option<f64>,
    pub log_loss: f64,
}

pub fn accuracy(y_true: &[u8], y_pred: &[u8]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    correct as f64 / y_true.len() as f64
}

/// Mean negative log-likelihood with probabilities clipped away from 0 and 1.
pub fn log_loss(y_true: &[u8], proba: &[f64]) -> f64 {
    if y_true.is_empty() || y_true.len() != proba.len() {
        return 0.0;
    }
    let mut sum = 0.0;
    for (y, p) in y_true.iter().zip(proba) {
        let p = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
        sum += if *y == 1 { -p.ln() } else { -(1.0 - p).ln() };
    }
    sum / y_true.len() as f64
}

/// Area under the ROC curve via the rank-sum statistic; tied scores share
/// their average rank.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Option<f64> {
    if y_true.len() != scores.len() {
        return None;
    }
    let positives = y_true.iter().filter(|y| **y == 1).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| scores[*a].total_cmp(&scores[*b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for idx in &order[i..=j] {
            ranks[*idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(y, _)| **y == 1)
        .map(|(_, r)| r)
        .sum();
    let p = positives as f64;
    let u = pos_rank_sum - p * (p + 1.0) / 2.0;
    Some(u / (p * negatives as f64))
}

/// Fold assignment that keeps the class balance of every fold close to the
/// whole set. Deterministic: no shuffling, samples of each class are dealt
/// round-robin in their original order.
pub fn stratified_folds(y: &[u8], k: usize) -> Vec<Vec<usize>> {
    let k = k.max(1);
    let mut folds = vec![Vec::new(); k];
    let mut next = 0usize;
    for class in [0u8, 1u8] {
        for (idx, label) in y.iter().enumerate() {
            if *label == class {
                folds[next % k].push(idx);
                next += 1;
            }
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}

/// k-fold accuracy over raw (unscaled) training rows. Each fold refits its
/// own scaler and classifier on the remaining folds.
pub fn cross_val_accuracy(
    x_raw: &[FeatureVector],
    y: &[u8],
    k: usize,
    cfg: &ModelConfig,
) -> Result<f64> {
    if k < 2 || x_raw.len() < k || x_raw.len() != y.len() {
        return Err(PipelineError::InsufficientData(format!(
            "{} training rows cannot be split into {k} folds",
            x_raw.len()
        )));
    }

    let folds = stratified_folds(y, k);
    let scores = folds
        .par_iter()
        .map(|held_out| -> Result<f64> {
            let mut in_fold = vec![false; x_raw.len()];
            for idx in held_out {
                in_fold[*idx] = true;
            }
            let mut train_x = Vec::with_capacity(x_raw.len() - held_out.len());
            let mut train_y = Vec::with_capacity(x_raw.len() - held_out.len());
            for (idx, (row, label)) in x_raw.iter().zip(y).enumerate() {
                if !in_fold[idx] {
                    train_x.push(*row);
                    train_y.push(*label);
                }
            }

            let scaler = StandardScaler::fit(&train_x)?;
            let model = LogisticRegression::fit(&scaler.transform(&train_x), &train_y, cfg)?;
            let val_x: Vec<FeatureVector> = held_out
                .iter()
                .map(|idx| scaler.transform_row(&x_raw[*idx]))
                .collect();
            let val_y: Vec<u8> = held_out.iter().map(|idx| y[*idx]).collect();
            Ok(accuracy(&val_y, &model.predict_labels(&val_x)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Holdout metrics for a fitted pipeline plus cross-validated accuracy on
/// the training partition. Holdout rows are never seen by the CV step.
pub fn evaluate(pipeline: &FittedPipeline, split: &SplitData, folds: usize) -> Result<Evaluation> {
    let proba = pipeline.classifier().predict_probabilities(&split.x_test);
    let pred = pipeline.classifier().predict_labels(&split.x_test);
    let cv_accuracy = cross_val_accuracy(
        &split.x_train_raw,
        &split.y_train,
        folds,
        pipeline.model_config(),
    )?;

    let out = Evaluation {
        samples: split.y_test.len(),
        accuracy: accuracy(&split.y_test, &pred),
        cv_accuracy,
        roc_auc: roc_auc(&split.y_test, &proba),
        log_loss: log_loss(&split.y_test, &proba),
    };
    info!(
        accuracy = out.accuracy,
        cv_accuracy = out.cv_accuracy,
        log_loss = out.log_loss,
        "holdout evaluation"
    );
    Ok(out)
}
