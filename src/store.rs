//! The workout store: sole owner of the workout list.
//!
//! Every new workout goes through [`WorkoutStore::create_workout`], which
//! validates the raw numbers, builds the right variant, appends it and writes
//! the whole list back to storage under [`STORAGE_KEY`].
//!
//! A store starts [`StoreState::Uninitialized`] and only accepts work once
//! [`WorkoutStore::restore`] has loaded whatever was persisted before.

use crate::dlog;
use crate::error::{RestoreError, WorkoutError};
use crate::storage::KeyValueStorage;
use crate::types::{Position, Workout, WorkoutKind, new_id, pace_min_per_km, speed_km_per_hr};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

/// Key the serialized workout list lives under.
pub const STORAGE_KEY: &str = "workout";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Restoring,
    Ready,
}

impl fmt::Display for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Restoring => "restoring",
            Self::Ready => "ready",
        })
    }
}

/// What `restore` found in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing persisted yet.
    Empty,
    Restored { restored: usize, skipped: usize },
    /// The persisted text could not be read; the store starts empty.
    Corrupt { reason: String },
}

/// Validated third field, ready to build a variant from.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TypeValue {
    Cadence(u32),
    Elevation(f64),
}

pub struct WorkoutStore<S> {
    storage: S,
    state: StoreState,
    workouts: Vec<Workout>,
}

impl<S: KeyValueStorage> WorkoutStore<S> {
    pub const fn new(storage: S) -> Self {
        Self {
            storage,
            state: StoreState::Uninitialized,
            workouts: Vec::new(),
        }
    }

    /// New store with the persisted list already restored.
    pub fn open(storage: S) -> Result<Self, WorkoutError> {
        let mut store = Self::new(storage);
        store.restore()?;
        Ok(store)
    }

    pub const fn state(&self) -> StoreState {
        self.state
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    fn ensure_ready(&self) -> Result<(), WorkoutError> {
        if self.state == StoreState::Ready {
            Ok(())
        } else {
            Err(WorkoutError::NotReady { state: self.state })
        }
    }

    pub fn create_workout(
        &mut self,
        kind: WorkoutKind,
        position: Position,
        distance_km: f64,
        duration_min: f64,
        type_field: f64,
    ) -> Result<&Workout, WorkoutError> {
        self.ensure_ready()?;
        let value = validate(kind, position, distance_km, duration_min, type_field)?;

        let created_at = Utc::now();
        let id = self.fresh_id(created_at);
        let workout = match value {
            TypeValue::Cadence(cadence) => {
                Workout::running(id, created_at, position, distance_km, duration_min, cadence)
            }
            TypeValue::Elevation(elevation) => {
                Workout::cycling(id, created_at, position, distance_km, duration_min, elevation)
            }
        };

        let idx = self.workouts.len();
        self.workouts.push(workout);
        if let Err(e) = self.persist() {
            self.workouts.pop();
            return Err(e);
        }

        let created = &self.workouts[idx];
        tracing::info!(
            id = created.id(),
            kind = %created.kind(),
            label = created.label(),
            "workout created"
        );
        Ok(created)
    }

    pub fn list_workouts(&self) -> Result<&[Workout], WorkoutError> {
        self.ensure_ready()?;
        Ok(&self.workouts)
    }

    pub fn find_by_id(&self, id: &str) -> Result<&Workout, WorkoutError> {
        self.ensure_ready()?;
        self.workouts
            .iter()
            .find(|w| w.id() == id)
            .ok_or_else(|| WorkoutError::NotFound { id: id.to_string() })
    }

    /// Bumps the record's click counter. The counter is session-local, so
    /// this does not persist.
    pub fn record_viewed(&mut self, id: &str) -> Result<&Workout, WorkoutError> {
        self.ensure_ready()?;
        let workout = self
            .workouts
            .iter_mut()
            .find(|w| w.id() == id)
            .ok_or_else(|| WorkoutError::NotFound { id: id.to_string() })?;
        workout.click_me();
        dlog!("viewed id={id} clicks={}", workout.click_count());
        Ok(&*workout)
    }

    /// Overwrites the persisted list with the whole in-memory list.
    pub fn persist(&mut self) -> Result<(), WorkoutError> {
        self.ensure_ready()?;
        let text = serde_json::to_string(&self.workouts)?;
        self.storage.set(STORAGE_KEY, &text)?;
        dlog!("persisted workouts={} bytes={}", self.workouts.len(), text.len());
        Ok(())
    }

    /// Loads the persisted list, replacing the in-memory one.
    ///
    /// Derived metrics are recomputed from distance and duration rather than
    /// trusted. Records that do not decode, break the workout invariants or
    /// repeat an id are skipped one by one. Text that is not a JSON list at
    /// all leaves the store empty but usable; only a failing storage read is
    /// an error.
    pub fn restore(&mut self) -> Result<RestoreOutcome, WorkoutError> {
        self.state = StoreState::Restoring;
        self.workouts.clear();

        let raw = match self.storage.get(STORAGE_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                self.state = StoreState::Uninitialized;
                return Err(e.into());
            }
        };

        let outcome = match raw {
            None => RestoreOutcome::Empty,
            Some(text) if text.trim().is_empty() => RestoreOutcome::Empty,
            Some(text) => match decode(&text) {
                Ok(records) => {
                    let (restored, skipped) = self.adopt(records);
                    RestoreOutcome::Restored { restored, skipped }
                }
                Err(e) => {
                    tracing::warn!(err = %e, "persisted workouts unreadable, starting empty");
                    RestoreOutcome::Corrupt {
                        reason: e.to_string(),
                    }
                }
            },
        };

        self.state = StoreState::Ready;
        tracing::info!(workouts = self.workouts.len(), ?outcome, "workouts restored");
        Ok(outcome)
    }

    /// Drops every workout, in memory and in storage.
    pub fn reset(&mut self) -> Result<(), WorkoutError> {
        self.ensure_ready()?;
        self.storage.remove(STORAGE_KEY)?;
        let dropped = self.workouts.len();
        self.workouts.clear();
        tracing::info!(dropped, "workouts reset");
        Ok(())
    }

    fn adopt(&mut self, records: Vec<serde_json::Value>) -> (usize, usize) {
        let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
        let mut skipped = 0usize;

        for (idx, record) in records.into_iter().enumerate() {
            let mut w: Workout = match serde_json::from_value(record) {
                Ok(w) => w,
                Err(e) => {
                    tracing::warn!(idx, err = %e, "skipping undecodable persisted workout");
                    skipped += 1;
                    continue;
                }
            };
            if let Err(e) = validate(
                w.kind(),
                w.position(),
                w.distance_km(),
                w.duration_min(),
                w.details().type_field(),
            ) {
                tracing::warn!(id = w.id(), err = %e, "skipping invalid persisted workout");
                skipped += 1;
                continue;
            }
            if !seen.insert(w.id().to_string()) {
                tracing::warn!(id = w.id(), "skipping persisted workout with duplicate id");
                skipped += 1;
                continue;
            }
            if w.recompute_metric() {
                dlog!("restore_metric_recomputed id={}", w.id());
            }
            self.workouts.push(w);
        }

        (self.workouts.len(), skipped)
    }

    fn fresh_id(&self, created_at: DateTime<Utc>) -> String {
        loop {
            let id = new_id(created_at);
            if self.workouts.iter().all(|w| w.id() != id) {
                return id;
            }
            dlog!("id_collision id={id}");
        }
    }
}

/// Splits the persisted text into one JSON value per record. Only text that
/// is not a JSON array at all is an error; each record is decoded on its own.
fn decode(text: &str) -> Result<Vec<serde_json::Value>, RestoreError> {
    Ok(serde_json::from_str(text)?)
}

fn validate(
    kind: WorkoutKind,
    position: Position,
    distance_km: f64,
    duration_min: f64,
    type_field: f64,
) -> Result<TypeValue, WorkoutError> {
    validate_position(position)?;
    require_positive("distance", distance_km)?;
    require_positive("duration", duration_min)?;

    match kind {
        WorkoutKind::Running => {
            if !pace_min_per_km(distance_km, duration_min).is_finite() {
                return Err(WorkoutError::invalid(
                    "distance",
                    format!("too small for a duration of {duration_min} min"),
                ));
            }
            require_positive("cadence", type_field)?;
            if type_field.fract() != 0.0 || type_field > f64::from(u32::MAX) {
                return Err(WorkoutError::invalid(
                    "cadence",
                    "must be a whole number of steps per minute",
                ));
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let cadence = type_field as u32;
            Ok(TypeValue::Cadence(cadence))
        }
        WorkoutKind::Cycling => {
            if !speed_km_per_hr(distance_km, duration_min).is_finite() {
                return Err(WorkoutError::invalid(
                    "duration",
                    format!("too short for a distance of {distance_km} km"),
                ));
            }
            require_finite("elevation", type_field)?;
            Ok(TypeValue::Elevation(type_field))
        }
    }
}

fn validate_position(position: Position) -> Result<(), WorkoutError> {
    if position.lat.is_finite() && position.lon.is_finite() {
        Ok(())
    } else {
        Err(WorkoutError::invalid("position", "coordinates must be finite"))
    }
}

fn require_finite(field: &'static str, v: f64) -> Result<(), WorkoutError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(WorkoutError::invalid(field, "must be a finite number"))
    }
}

fn require_positive(field: &'static str, v: f64) -> Result<(), WorkoutError> {
    require_finite(field, v)?;
    if v > 0.0 {
        Ok(())
    } else {
        Err(WorkoutError::invalid(field, format!("must be positive, got {v}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::MemoryStorage;
    use crate::types::{WorkoutDetails, describe};
    use chrono::Local;

    const POS: Position = Position::new(76.0, -23.0);

    fn ready() -> WorkoutStore<MemoryStorage> {
        WorkoutStore::open(MemoryStorage::new()).unwrap()
    }

    fn field_of(err: &WorkoutError) -> &'static str {
        match err {
            WorkoutError::Validation { field, .. } => *field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn scenario_running_then_cycling() {
        let mut store = ready();

        let run = store
            .create_workout(WorkoutKind::Running, POS, 56.0, 48.0, 23.0)
            .unwrap()
            .clone();
        assert!((run.metric().value - 48.0 / 56.0).abs() < 1e-12);
        let today = run.created_at().with_timezone(&Local).date_naive();
        assert_eq!(run.label(), describe(WorkoutKind::Running, today));
        assert!(run.label().starts_with("Running on "));

        let ride = store
            .create_workout(WorkoutKind::Cycling, POS, 56.0, 88.0, 56.0)
            .unwrap()
            .clone();
        assert!((ride.metric().value - 38.1818).abs() < 1e-3);
        assert!(ride.label().starts_with("Cycling on "));

        let ids: Vec<&str> = store.list_workouts().unwrap().iter().map(Workout::id).collect();
        assert_eq!(ids, [run.id(), ride.id()]);
        assert_ne!(run.id(), ride.id());
    }

    #[test]
    fn bad_distance_is_rejected_without_side_effects() {
        let mut store = ready();
        for d in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let err = store
                .create_workout(WorkoutKind::Running, POS, d, 25.0, 170.0)
                .unwrap_err();
            assert_eq!(field_of(&err), "distance");
        }
        assert!(store.list_workouts().unwrap().is_empty());
        assert_eq!(store.storage().get(STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn bad_duration_is_rejected() {
        let mut store = ready();
        let err = store
            .create_workout(WorkoutKind::Cycling, POS, 5.0, 0.0, 10.0)
            .unwrap_err();
        assert_eq!(field_of(&err), "duration");
    }

    #[test]
    fn cadence_must_be_positive_but_elevation_may_be_zero() {
        let mut store = ready();
        let err = store
            .create_workout(WorkoutKind::Running, POS, 5.0, 25.0, 0.0)
            .unwrap_err();
        assert_eq!(field_of(&err), "cadence");

        store
            .create_workout(WorkoutKind::Cycling, POS, 5.0, 25.0, 0.0)
            .unwrap();
        store
            .create_workout(WorkoutKind::Cycling, POS, 5.0, 25.0, -120.0)
            .unwrap();
        assert_eq!(store.list_workouts().unwrap().len(), 2);
    }

    #[test]
    fn cadence_must_be_whole_and_elevation_finite() {
        let mut store = ready();
        let err = store
            .create_workout(WorkoutKind::Running, POS, 5.0, 25.0, 170.5)
            .unwrap_err();
        assert_eq!(field_of(&err), "cadence");
        let err = store
            .create_workout(WorkoutKind::Cycling, POS, 5.0, 25.0, f64::NAN)
            .unwrap_err();
        assert_eq!(field_of(&err), "elevation");
    }

    #[test]
    fn any_finite_position_is_accepted() {
        let mut store = ready();
        let wrapped = Position::new(10.0, 190.0);
        let id = store
            .create_workout(WorkoutKind::Running, wrapped, 5.0, 25.0, 170.0)
            .unwrap()
            .id()
            .to_string();

        let err = store
            .create_workout(WorkoutKind::Running, Position::new(f64::NAN, 0.0), 5.0, 25.0, 170.0)
            .unwrap_err();
        assert_eq!(field_of(&err), "position");

        let reopened = WorkoutStore::open(store.into_storage()).unwrap();
        assert_eq!(reopened.find_by_id(&id).unwrap().position(), wrapped);
    }

    #[test]
    fn overflowing_metrics_are_rejected_and_keep_storage_readable() {
        let mut store = ready();
        store
            .create_workout(WorkoutKind::Running, POS, 5.0, 25.0, 170.0)
            .unwrap();

        let err = store
            .create_workout(WorkoutKind::Cycling, Position::new(1.0, 2.0), 1e300, 1e-300, 0.0)
            .unwrap_err();
        assert_eq!(field_of(&err), "duration");
        let err = store
            .create_workout(WorkoutKind::Running, POS, 1e-300, 1e300, 170.0)
            .unwrap_err();
        assert_eq!(field_of(&err), "distance");
        assert_eq!(store.list_workouts().unwrap().len(), 1);

        let mut fresh = WorkoutStore::new(store.into_storage());
        assert_eq!(
            fresh.restore().unwrap(),
            RestoreOutcome::Restored {
                restored: 1,
                skipped: 0
            }
        );
    }

    #[test]
    fn undecodable_record_is_skipped_next_to_good_ones() {
        let mut store = ready();
        let id = store
            .create_workout(WorkoutKind::Running, POS, 5.0, 25.0, 170.0)
            .unwrap()
            .id()
            .to_string();
        let mut storage = store.into_storage();

        let text = storage.get(STORAGE_KEY).unwrap().unwrap();
        let mut records: Vec<serde_json::Value> = serde_json::from_str(&text).unwrap();
        let mut broken = records[0].clone();
        broken["id"] = serde_json::json!("overflowed");
        broken["kind"] = serde_json::json!("cycling");
        broken["elevation_gain_m"] = serde_json::json!(0.0);
        broken["speed_km_per_hr"] = serde_json::Value::Null;
        records.push(broken);
        storage
            .set(STORAGE_KEY, &serde_json::to_string(&records).unwrap())
            .unwrap();

        let mut store = WorkoutStore::new(storage);
        assert_eq!(
            store.restore().unwrap(),
            RestoreOutcome::Restored {
                restored: 1,
                skipped: 1
            }
        );
        assert_eq!(store.list_workouts().unwrap()[0].id(), id);
    }

    #[test]
    fn operations_need_a_restored_store() {
        let mut store = WorkoutStore::new(MemoryStorage::new());
        assert_eq!(store.state(), StoreState::Uninitialized);
        assert!(matches!(
            store.create_workout(WorkoutKind::Running, POS, 5.0, 25.0, 170.0),
            Err(WorkoutError::NotReady {
                state: StoreState::Uninitialized
            })
        ));
        assert!(matches!(store.list_workouts(), Err(WorkoutError::NotReady { .. })));
        assert!(matches!(store.persist(), Err(WorkoutError::NotReady { .. })));
        assert!(matches!(store.reset(), Err(WorkoutError::NotReady { .. })));

        assert_eq!(store.restore().unwrap(), RestoreOutcome::Empty);
        assert_eq!(store.state(), StoreState::Ready);
        assert!(store.list_workouts().unwrap().is_empty());
    }

    #[test]
    fn record_viewed_counts_only_that_record() {
        let mut store = ready();
        let a = store
            .create_workout(WorkoutKind::Running, POS, 5.0, 25.0, 170.0)
            .unwrap()
            .id()
            .to_string();
        let b = store
            .create_workout(WorkoutKind::Cycling, POS, 20.0, 60.0, 100.0)
            .unwrap()
            .id()
            .to_string();

        assert_eq!(store.record_viewed(&a).unwrap().click_count(), 1);
        store.record_viewed(&a).unwrap();
        assert_eq!(store.find_by_id(&a).unwrap().click_count(), 2);
        assert_eq!(store.find_by_id(&b).unwrap().click_count(), 0);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut store = ready();
        assert!(matches!(
            store.find_by_id("nope"),
            Err(WorkoutError::NotFound { id }) if id == "nope"
        ));
        assert!(matches!(
            store.record_viewed("nope"),
            Err(WorkoutError::NotFound { .. })
        ));
    }

    #[test]
    fn views_are_not_persisted_until_the_next_write() {
        let mut store = ready();
        let id = store
            .create_workout(WorkoutKind::Running, POS, 5.0, 25.0, 170.0)
            .unwrap()
            .id()
            .to_string();
        store.record_viewed(&id).unwrap();

        let reopened = WorkoutStore::open(store.storage().clone()).unwrap();
        assert_eq!(reopened.find_by_id(&id).unwrap().click_count(), 0);

        store.persist().unwrap();
        let reopened = WorkoutStore::open(store.into_storage()).unwrap();
        assert_eq!(reopened.find_by_id(&id).unwrap().click_count(), 1);
    }

    #[test]
    fn persist_restore_round_trip_keeps_order_and_values() {
        let mut store = ready();
        store
            .create_workout(WorkoutKind::Running, POS, 56.0, 48.0, 23.0)
            .unwrap();
        store
            .create_workout(WorkoutKind::Cycling, POS, 56.0, 88.0, 56.0)
            .unwrap();
        store
            .create_workout(WorkoutKind::Running, Position::new(-33.9, 18.4), 10.0, 55.5, 180.0)
            .unwrap();
        let before = store.list_workouts().unwrap().to_vec();

        let mut fresh = WorkoutStore::new(store.into_storage());
        assert_eq!(
            fresh.restore().unwrap(),
            RestoreOutcome::Restored {
                restored: 3,
                skipped: 0
            }
        );
        assert_eq!(fresh.list_workouts().unwrap(), before.as_slice());
    }

    #[test]
    fn corrupt_storage_restores_empty_and_stays_usable() {
        let mut storage = MemoryStorage::new();
        storage.set(STORAGE_KEY, "{not json").unwrap();
        let mut store = WorkoutStore::new(storage);

        let outcome = store.restore().unwrap();
        assert!(matches!(outcome, RestoreOutcome::Corrupt { .. }));
        assert_eq!(store.state(), StoreState::Ready);
        assert!(store.list_workouts().unwrap().is_empty());

        store
            .create_workout(WorkoutKind::Cycling, POS, 5.0, 25.0, 0.0)
            .unwrap();
        assert_eq!(store.list_workouts().unwrap().len(), 1);
    }

    #[test]
    fn empty_text_counts_as_nothing_persisted() {
        let mut storage = MemoryStorage::new();
        storage.set(STORAGE_KEY, "  ").unwrap();
        let mut store = WorkoutStore::new(storage);
        assert_eq!(store.restore().unwrap(), RestoreOutcome::Empty);
    }

    #[test]
    fn restore_recomputes_metrics_and_skips_bad_records() {
        let mut store = ready();
        store
            .create_workout(WorkoutKind::Running, POS, 10.0, 50.0, 170.0)
            .unwrap();
        store
            .create_workout(WorkoutKind::Cycling, POS, 30.0, 60.0, 10.0)
            .unwrap();
        let mut storage = store.into_storage();

        let text = storage.get(STORAGE_KEY).unwrap().unwrap();
        let mut records: Vec<serde_json::Value> = serde_json::from_str(&text).unwrap();
        records[0]["pace_min_per_km"] = serde_json::json!(1.0);
        let mut bad = records[1].clone();
        bad["id"] = serde_json::json!("zero-distance");
        bad["distance_km"] = serde_json::json!(0.0);
        let dup = records[0].clone();
        records.push(bad);
        records.push(dup);
        storage
            .set(STORAGE_KEY, &serde_json::to_string(&records).unwrap())
            .unwrap();

        let mut store = WorkoutStore::new(storage);
        assert_eq!(
            store.restore().unwrap(),
            RestoreOutcome::Restored {
                restored: 2,
                skipped: 2
            }
        );
        let list = store.list_workouts().unwrap();
        let WorkoutDetails::Running {
            pace_min_per_km, ..
        } = *list[0].details()
        else {
            panic!("expected running first");
        };
        assert!((pace_min_per_km - 5.0).abs() < 1e-12);
    }

    #[test]
    fn reset_wipes_memory_and_storage() {
        let mut store = ready();
        store
            .create_workout(WorkoutKind::Running, POS, 5.0, 25.0, 170.0)
            .unwrap();
        store.reset().unwrap();

        assert_eq!(store.state(), StoreState::Ready);
        assert!(store.list_workouts().unwrap().is_empty());
        assert_eq!(store.storage().get(STORAGE_KEY).unwrap(), None);

        store
            .create_workout(WorkoutKind::Cycling, POS, 5.0, 25.0, 3.0)
            .unwrap();
        assert_eq!(store.list_workouts().unwrap().len(), 1);
    }

    struct ReadOnlyStorage(MemoryStorage);

    impl KeyValueStorage for ReadOnlyStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        }

        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        }
    }

    #[test]
    fn failed_write_rolls_back_the_append() {
        let mut store = WorkoutStore::open(ReadOnlyStorage(MemoryStorage::new())).unwrap();
        let err = store
            .create_workout(WorkoutKind::Running, POS, 5.0, 25.0, 170.0)
            .unwrap_err();
        assert!(matches!(err, WorkoutError::Storage(_)));
        assert!(store.list_workouts().unwrap().is_empty());
    }

    struct BrokenStorage;

    impl KeyValueStorage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Ok(())
        }

        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn failed_read_leaves_store_uninitialized() {
        let mut store = WorkoutStore::new(BrokenStorage);
        assert!(matches!(store.restore(), Err(WorkoutError::Storage(_))));
        assert_eq!(store.state(), StoreState::Uninitialized);
    }
}
