use sp_core::CoreError;
use sp_elements::ElementsError;
use sp_release::ReleaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver configuration error: {0}")]
    Config(String),

    #[error("release {index} failed: {source}")]
    Release {
        index:  usize,
        #[source]
        source: ReleaseError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("element storage error: {0}")]
    Elements(#[from] ElementsError),
}

pub type DriverResult<T> = Result<T, DriverError>;
