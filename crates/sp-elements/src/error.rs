use thiserror::Error;

use crate::ArrayKind;

#[derive(Debug, Error)]
pub enum ElementsError {
    #[error("requested the last {requested} rows but storage holds {available}")]
    TailOutOfRange { requested: usize, available: usize },

    #[error("array {name:?} is {existing:?}, cannot use it as {requested:?}")]
    KindMismatch {
        name:      String,
        existing:  ArrayKind,
        requested: ArrayKind,
    },

    #[error("array {name:?} has length {got}, expected {expected}")]
    LengthMismatch {
        name:     String,
        expected: usize,
        got:      usize,
    },
}

pub type ElementsResult<T> = Result<T, ElementsError>;
