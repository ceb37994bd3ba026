//! Release-subsystem error type.
//!
//! Every failure is raised synchronously where it is detected (construction,
//! `prepare_for_model_run`, or `initialize_elements`) and propagates to the
//! driver unchanged.  Soft conditions are logged with `tracing::warn!`
//! instead.

use thiserror::Error;

use sp_core::CoreError;
use sp_elements::ElementsError;
use sp_geometry::GeometryError;

#[derive(Debug, Error)]
pub enum ReleaseError {
    /// Mutually exclusive or missing required settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Ordering or geometry invariants violated by the inputs.
    #[error("validation error: {0}")]
    Validation(String),

    #[error(
        "not enough elements: {ratio} elements per timestep over {steps} release steps; \
         need at least one per step"
    )]
    InsufficientElements { ratio: f64, steps: u64 },

    /// A collaborator produced output that contradicts the request.
    #[error("consistency error: {0}")]
    Consistency(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Element-storage failures (a batch larger than the storage, an array of
/// the wrong kind) mean the driver and release disagree about the rows.
impl From<ElementsError> for ReleaseError {
    fn from(e: ElementsError) -> Self {
        ReleaseError::Consistency(e.to_string())
    }
}

pub type ReleaseResult<T> = Result<T, ReleaseError>;
