use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WorkoutError;

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A point on the map, serialized as `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<[f64; 2]> for Position {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<Position> for [f64; 2] {
    fn from(p: Position) -> Self {
        [p.lat, p.lon]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkoutKind {
    Running,
    Cycling,
}

impl WorkoutKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
        }
    }

    /// Capitalized name used at the start of a label.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Cycling => "Cycling",
        }
    }
}

impl fmt::Display for WorkoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkoutKind {
    type Err = WorkoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(Self::Running),
            "cycling" => Ok(Self::Cycling),
            other => Err(WorkoutError::Validation {
                field: "kind",
                reason: format!("unknown workout kind {other:?}, expected running or cycling"),
            }),
        }
    }
}

/// Variant-specific input and its derived metric.
///
/// Flattened into [`Workout`] on the wire, with `kind` as the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkoutDetails {
    Running {
        cadence_spm: u32,
        pace_min_per_km: f64,
    },
    Cycling {
        elevation_gain_m: f64,
        speed_km_per_hr: f64,
    },
}

impl WorkoutDetails {
    pub const fn kind(&self) -> WorkoutKind {
        match self {
            Self::Running { .. } => WorkoutKind::Running,
            Self::Cycling { .. } => WorkoutKind::Cycling,
        }
    }

    /// The third input field as a plain number (cadence or elevation gain).
    pub fn type_field(&self) -> f64 {
        match self {
            Self::Running { cadence_spm, .. } => f64::from(*cadence_spm),
            Self::Cycling {
                elevation_gain_m, ..
            } => *elevation_gain_m,
        }
    }
}

/// Derived metric with its unit, for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub value: f64,
    pub unit: &'static str,
}

/// Minutes per kilometre.
pub fn pace_min_per_km(distance_km: f64, duration_min: f64) -> f64 {
    duration_min / distance_km
}

/// Kilometres per hour.
pub fn speed_km_per_hr(distance_km: f64, duration_min: f64) -> f64 {
    distance_km / (duration_min / 60.0)
}

/// `"Running on March 5"`.
pub fn describe(kind: WorkoutKind, date: NaiveDate) -> String {
    format!(
        "{} on {} {}",
        kind.display_name(),
        MONTHS[date.month0() as usize],
        date.day()
    )
}

/// Last 10 digits of the creation time in milliseconds plus 4 hex digits of entropy.
pub fn new_id(created_at: DateTime<Utc>) -> String {
    let millis = created_at.timestamp_millis().unsigned_abs() % 10_000_000_000;
    let salt: u16 = rand::rng().random();
    format!("{millis:010}{salt:04x}")
}

/// One logged workout.
///
/// Built only through [`Workout::running`] / [`Workout::cycling`], which
/// expect already validated input. Everything except the click counter is
/// fixed once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    id: String,
    created_at: DateTime<Utc>,
    position: Position,
    distance_km: f64,
    duration_min: f64,
    #[serde(default)]
    click_count: u32,
    label: String,
    #[serde(flatten)]
    details: WorkoutDetails,
}

impl Workout {
    pub fn running(
        id: String,
        created_at: DateTime<Utc>,
        position: Position,
        distance_km: f64,
        duration_min: f64,
        cadence_spm: u32,
    ) -> Self {
        let details = WorkoutDetails::Running {
            cadence_spm,
            pace_min_per_km: pace_min_per_km(distance_km, duration_min),
        };
        Self::assemble(id, created_at, position, distance_km, duration_min, details)
    }

    pub fn cycling(
        id: String,
        created_at: DateTime<Utc>,
        position: Position,
        distance_km: f64,
        duration_min: f64,
        elevation_gain_m: f64,
    ) -> Self {
        let details = WorkoutDetails::Cycling {
            elevation_gain_m,
            speed_km_per_hr: speed_km_per_hr(distance_km, duration_min),
        };
        Self::assemble(id, created_at, position, distance_km, duration_min, details)
    }

    fn assemble(
        id: String,
        created_at: DateTime<Utc>,
        position: Position,
        distance_km: f64,
        duration_min: f64,
        details: WorkoutDetails,
    ) -> Self {
        let local_date = created_at.with_timezone(&Local).date_naive();
        Self {
            id,
            created_at,
            position,
            distance_km,
            duration_min,
            click_count: 0,
            label: describe(details.kind(), local_date),
            details,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn position(&self) -> Position {
        self.position
    }

    pub const fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub const fn duration_min(&self) -> f64 {
        self.duration_min
    }

    pub const fn click_count(&self) -> u32 {
        self.click_count
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub const fn kind(&self) -> WorkoutKind {
        self.details.kind()
    }

    pub const fn details(&self) -> &WorkoutDetails {
        &self.details
    }

    pub const fn metric(&self) -> Metric {
        match self.details {
            WorkoutDetails::Running {
                pace_min_per_km, ..
            } => Metric {
                value: pace_min_per_km,
                unit: "min/km",
            },
            WorkoutDetails::Cycling {
                speed_km_per_hr, ..
            } => Metric {
                value: speed_km_per_hr,
                unit: "km/h",
            },
        }
    }

    pub const fn click_me(&mut self) {
        self.click_count = self.click_count.saturating_add(1);
    }

    /// Recomputes the derived metric from distance and duration.
    ///
    /// Returns `true` when the stored value disagreed.
    pub(crate) fn recompute_metric(&mut self) -> bool {
        let (distance, duration) = (self.distance_km, self.duration_min);
        let (stored, fresh) = match &mut self.details {
            WorkoutDetails::Running {
                pace_min_per_km: pace,
                ..
            } => {
                let old = *pace;
                *pace = pace_min_per_km(distance, duration);
                (old, *pace)
            }
            WorkoutDetails::Cycling {
                speed_km_per_hr: speed,
                ..
            } => {
                let old = *speed;
                *speed = speed_km_per_hr(distance, duration);
                (old, *speed)
            }
        };
        stored.to_bits() != fresh.to_bits()
    }
}
