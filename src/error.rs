use thiserror::Error;

use crate::store::StoreState;

#[derive(Error, Debug)]
pub enum WorkoutError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("no workout with id {id}")]
    NotFound { id: String },
    #[error("workout store is {state}, not ready")]
    NotReady { state: StoreState },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("serializing workouts: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl WorkoutError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("sqlite storage: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Persisted text that could not be turned back into workouts.
///
/// Never escapes `WorkoutStore::restore`; it is logged and the store starts empty.
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("malformed workout list: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PositionError {
    #[error("position unavailable")]
    Unavailable,
    #[error("position access denied")]
    Denied,
    #[error("cannot parse position {input:?}: {reason}")]
    Parse { input: String, reason: String },
}
