//! Running and cycling workout log.
//!
//! [`store::WorkoutStore`] owns the workout list and persists it through a
//! [`storage::KeyValueStorage`]; [`types::Workout`] carries the derived pace or
//! speed. The `mapty` binary is a thin command line on top.

pub mod cli;
pub mod error;
pub mod position;
pub mod storage;
pub mod store;
pub mod types;
pub mod utils;

pub use error::{PositionError, RestoreError, StorageError, WorkoutError};
pub use position::{FixedPosition, PositionProvider};
pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage};
pub use store::{RestoreOutcome, STORAGE_KEY, StoreState, WorkoutStore};
pub use types::{Metric, Position, Workout, WorkoutDetails, WorkoutKind};
