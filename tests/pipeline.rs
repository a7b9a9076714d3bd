mod common;

use std::fs;
use std::path::PathBuf;

use wnba_predictor::config::PipelineConfig;
use wnba_predictor::features::FEATURE_COUNT;
use wnba_predictor::{FeatureTable, FittedPipeline, PipelineError, build_features_from, split_and_scale, train_and_evaluate};

fn league_table() -> FeatureTable {
    let store = common::league(&[2022, 2023, 2024], 6);
    build_features_from(&store.teams, &store.games, &store.stats, 3)
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("wnba_predictor_test_{}", std::process::id()))
        .join(name)
}

#[test]
fn split_trains_before_cutoff_and_holds_out_cutoff() {
    let table = league_table();
    let split = split_and_scale(&table, None).unwrap();
    assert_eq!(split.cutoff_season, 2024);

    let train = table.rows.iter().filter(|r| r.season < 2024).count();
    let test = table.rows.iter().filter(|r| r.season == 2024).count();
    assert_eq!(split.x_train.len(), train);
    assert_eq!(split.x_test.len(), test);
    assert_eq!(split.y_train.len() + split.y_test.len(), table.rows.len());
}

#[test]
fn later_seasons_are_left_out_of_an_earlier_holdout() {
    let table = league_table();
    let split = split_and_scale(&table, Some(2023)).unwrap();
    let train = table.rows.iter().filter(|r| r.season < 2023).count();
    let test = table.rows.iter().filter(|r| r.season == 2023).count();
    assert_eq!(split.y_train.len(), train);
    assert_eq!(split.y_test.len(), test);
}

#[test]
fn scaler_standardizes_training_columns_only() {
    let table = league_table();
    let split = split_and_scale(&table, None).unwrap();
    let n = split.x_train.len() as f64;
    for col in 0..FEATURE_COUNT {
        let mean = split.x_train.iter().map(|r| r[col]).sum::<f64>() / n;
        let var = split.x_train.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 1e-9, "column {col} mean {mean}");
        // Constant columns stay at zero variance.
        assert!(var.abs() < 1e-9 || (var - 1.0).abs() < 1e-9, "column {col} var {var}");
    }

    // Holdout is transformed with training moments, not its own.
    let test_n = split.x_test.len() as f64;
    let drift = (0..FEATURE_COUNT)
        .map(|col| (split.x_test.iter().map(|r| r[col]).sum::<f64>() / test_n).abs())
        .fold(0.0, f64::max);
    assert!(drift > 1e-6);
}

#[test]
fn empty_partitions_are_insufficient_data() {
    let table = league_table();
    let err = split_and_scale(&table, Some(2022)).unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientData(_)));
    let err = split_and_scale(&table, Some(2030)).unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientData(_)));

    let empty = build_features_from(&[], &[], &[], 3);
    assert!(empty.is_empty());
    assert!(matches!(
        split_and_scale(&empty, None),
        Err(PipelineError::InsufficientData(_))
    ));
}

#[test]
fn training_run_reports_bounded_metrics() {
    let run = train_and_evaluate(league_table(), &PipelineConfig::default()).unwrap();
    let eval = run.evaluation;
    assert_eq!(eval.samples, run.split.y_test.len());
    assert!((0.0..=1.0).contains(&eval.accuracy));
    assert!((0.0..=1.0).contains(&eval.cv_accuracy));
    let auc = eval.roc_auc.unwrap();
    assert!((0.0..=1.0).contains(&auc));
    assert!(eval.log_loss.is_finite() && eval.log_loss > 0.0);
    assert_eq!(run.pipeline.train_samples(), run.split.y_train.len());
    assert_eq!(run.pipeline.manifest(), run.table.columns.as_slice());
}

#[test]
fn pipeline_probabilities_match_classifier_on_scaled_rows() {
    let run = train_and_evaluate(league_table(), &PipelineConfig::default()).unwrap();
    for (raw, scaled) in run.split.x_test_raw.iter().zip(&run.split.x_test).take(10) {
        let via_pipeline = run.pipeline.predict_probability(raw);
        let direct = run.pipeline.classifier().predict_probability(scaled);
        assert!((via_pipeline - direct).abs() < 1e-12);
    }
}

#[test]
fn saved_pipeline_loads_back_identically() {
    let run = train_and_evaluate(league_table(), &PipelineConfig::default()).unwrap();
    let path = temp_path("round_trip.json");
    run.pipeline.save(&path).unwrap();
    let loaded = FittedPipeline::load(&path).unwrap();
    let _ = fs::remove_file(&path);

    assert_eq!(loaded.manifest(), run.pipeline.manifest());
    assert_eq!(loaded.cutoff_season(), run.pipeline.cutoff_season());
    assert_eq!(loaded.trained_at(), run.pipeline.trained_at());
    for (a, b) in loaded
        .classifier()
        .weights
        .iter()
        .zip(&run.pipeline.classifier().weights)
    {
        assert!((a - b).abs() <= 1e-12 * b.abs().max(1.0));
    }
    for raw in run.split.x_test_raw.iter().take(10) {
        let diff = loaded.predict_probability(raw) - run.pipeline.predict_probability(raw);
        assert!(diff.abs() < 1e-9);
    }
}

#[test]
fn pipeline_with_foreign_manifest_is_rejected() {
    let run = train_and_evaluate(league_table(), &PipelineConfig::default()).unwrap();
    let mut json = serde_json::to_value(&run.pipeline).unwrap();
    json["manifest"].as_array_mut().unwrap().pop();

    let path = temp_path("short_manifest.json");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();
    let err = FittedPipeline::load(&path).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ManifestMismatch {
            expected: FEATURE_COUNT,
            found
        } if found == FEATURE_COUNT - 1
    ));
    let _ = fs::remove_file(&path);
}

#[test]
fn classifier_converges_on_a_noisy_league() {
    for seed in [7, 11, 13, 17] {
        let store = common::noisy_league(&[2021, 2022, 2023, 2024], seed);
        let table = build_features_from(&store.teams, &store.games, &store.stats, 3);
        let run = train_and_evaluate(table, &PipelineConfig::default()).unwrap();
        let model = run.pipeline.classifier();
        assert!(model.converged, "seed {seed} stopped after {} iterations", model.iterations);
        assert!(model.iterations < 50, "seed {seed} took {} iterations", model.iterations);
        assert!((0.0..=1.0).contains(&run.evaluation.cv_accuracy));
    }
}

#[test]
fn pipeline_remembers_its_rolling_window() {
    let store = common::league(&[2022, 2023, 2024], 6);
    let table = build_features_from(&store.teams, &store.games, &store.stats, 5);
    let cfg = PipelineConfig {
        window: 5,
        ..PipelineConfig::default()
    };
    let run = train_and_evaluate(table, &cfg).unwrap();
    assert_eq!(run.pipeline.rolling_window(), 5);
    assert!(run.pipeline.ensure_window(5).is_ok());
    assert!(matches!(
        run.pipeline.ensure_window(3),
        Err(PipelineError::WindowMismatch {
            trained: 5,
            configured: 3
        })
    ));

    let path = temp_path("window.json");
    run.pipeline.save(&path).unwrap();
    let loaded = FittedPipeline::load(&path).unwrap();
    let _ = fs::remove_file(&path);
    assert_eq!(loaded.rolling_window(), 5);
    assert!(loaded.ensure_window(3).is_err());
}
