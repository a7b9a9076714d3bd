use thiserror::Error;

/// Failures of the feature/prediction pipeline.
///
/// Integrity problems on individual rows are not raised here; they are counted
/// in [`crate::features::BuildReport`] and the affected rows are skipped.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("two different, known teams required (got team {team_id} vs opponent {opponent_id})")]
    UnknownEntity { team_id: i64, opponent_id: i64 },

    #[error("feature manifest mismatch: expected {expected} columns, pipeline has {found}")]
    ManifestMismatch { expected: usize, found: usize },

    #[error("pipeline was trained with a rolling window of {trained}, configured window is {configured}")]
    WindowMismatch { trained: usize, configured: usize },

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
