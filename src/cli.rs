use crate::types::{Position, WorkoutKind};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "mapty.sqlite3";

#[derive(Parser, Debug)]
#[command(
    name = "mapty",
    about = "Log running and cycling workouts on a map, with pace and speed worked out for you"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Cmd>,

    /// SQLite file the workout list is kept in.
    #[arg(long, env = "MAPTY_DB", default_value = DEFAULT_DB_PATH, global = true)]
    pub db: PathBuf,

    /// Your current location as LAT,LON. Used when a workout has no --at.
    #[arg(long, env = "MAPTY_HOME", allow_hyphen_values = true, global = true)]
    pub home: Option<Position>,

    /// Refuse to share your location, overriding --home. Workouts then need an explicit --at.
    #[arg(long, global = true)]
    pub deny_location: bool,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Log a new workout.
    Add {
        #[command(subcommand)]
        workout: NewWorkout,
    },
    /// Print logged workouts, oldest first. This is the default command.
    List {
        /// Print every field as a tab-separated row.
        #[arg(long)]
        details: bool,

        /// Only show one kind of workout (running or cycling).
        #[arg(long)]
        kind: Option<WorkoutKind>,

        /// Print at most this many workouts.
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Open a workout: count the view and print where the map centres.
    View { id: String },
    /// Delete every logged workout. There is no undo.
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum NewWorkout {
    Running {
        /// Distance in km.
        #[arg(long)]
        distance: f64,
        /// Duration in minutes.
        #[arg(long)]
        duration: f64,
        /// Steps per minute.
        #[arg(long)]
        cadence: f64,
        /// Where on the map, as LAT,LON.
        #[arg(long, allow_hyphen_values = true)]
        at: Option<Position>,
    },
    Cycling {
        /// Distance in km.
        #[arg(long)]
        distance: f64,
        /// Duration in minutes.
        #[arg(long)]
        duration: f64,
        /// Elevation gain in metres, negative for a descent.
        #[arg(long, allow_hyphen_values = true)]
        elevation: f64,
        /// Where on the map, as LAT,LON.
        #[arg(long, allow_hyphen_values = true)]
        at: Option<Position>,
    },
}

impl NewWorkout {
    /// `(kind, distance, duration, type field, position)` as the store wants them.
    pub const fn parts(&self) -> (WorkoutKind, f64, f64, f64, Option<Position>) {
        match *self {
            Self::Running {
                distance,
                duration,
                cadence,
                at,
            } => (WorkoutKind::Running, distance, duration, cadence, at),
            Self::Cycling {
                distance,
                duration,
                elevation,
                at,
            } => (WorkoutKind::Cycling, distance, duration, elevation, at),
        }
    }
}
