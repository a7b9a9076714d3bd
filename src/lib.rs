//! Win/loss prediction for WNBA games from team season box-score averages.
//!
//! Pipeline: [`store`] -> [`features`] -> [`split`] -> [`model`] ->
//! [`metrics`] for offline evaluation, or [`projector`] for unplayed games,
//! both through the same [`pipeline::FittedPipeline`].

pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod projector;
pub mod records;
pub mod rolling;
pub mod split;
pub mod store;

pub use error::{PipelineError, Result};
pub use features::{FeatureRow, FeatureTable, build_features, build_features_from};
pub use pipeline::{FittedPipeline, train_and_evaluate};
pub use projector::{Matchup, MatchupPrediction, predict_matchups};
pub use split::split_and_scale;
