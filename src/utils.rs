use crate::types::{Position, Workout, WorkoutDetails, WorkoutKind};
use tracing_subscriber::{EnvFilter, fmt};

/// Zoom level the map is centred at when a workout is opened.
pub const MAP_ZOOM_LEVEL: u8 = 13;

#[macro_export]
macro_rules! dlog {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*);
    };
}

/// Initialize colorful logging.
///
/// Default level is INFO.
/// - `-v` => DEBUG
/// - `-vv` => TRACE
/// - `-q` => WARN
/// - `-qq` => ERROR
///
/// `RUST_LOG` overrides everything (e.g. `RUST_LOG=trace`).
pub fn init_logging(verbose: u8, quiet: u8) {
    let level = level_for(verbose, quiet);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,mapty={level}")));

    let show_src = matches!(level, "debug" | "trace");

    fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_target(true)
        .with_level(true)
        .with_file(show_src)
        .with_line_number(show_src)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn level_for(verbose: u8, quiet: u8) -> &'static str {
    let net = i16::from(verbose) - i16::from(quiet);
    match net {
        i16::MIN..=-2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        2..=i16::MAX => "trace",
    }
}

pub const fn icon(kind: WorkoutKind) -> &'static str {
    match kind {
        WorkoutKind::Running => "🏃‍♂️",
        WorkoutKind::Cycling => "🚴‍♀️",
    }
}

/// `"170 spm"` or `"56 m"`.
pub fn format_type_field(details: &WorkoutDetails) -> String {
    match details {
        WorkoutDetails::Running { cadence_spm, .. } => format!("{cadence_spm} spm"),
        WorkoutDetails::Cycling {
            elevation_gain_m, ..
        } => format!("{elevation_gain_m} m"),
    }
}

/// One-line summary, e.g. `Running on March 5: 5 km, 25 min, 5.0 min/km, 170 spm`.
pub fn format_summary(w: &Workout) -> String {
    let m = w.metric();
    format!(
        "{}: {} km, {} min, {:.1} {}, {}",
        w.label(),
        w.distance_km(),
        w.duration_min(),
        m.value,
        m.unit,
        format_type_field(w.details())
    )
}

/// Tab-separated row with every field.
pub fn format_row(index: usize, w: &Workout) -> String {
    let m = w.metric();
    format!(
        "{index}\t{}\t{}\t{}\t{}\t{} km\t{} min\t{:.1} {}\t{}\t{}\t{}",
        w.id(),
        w.kind(),
        w.created_at().to_rfc3339(),
        w.label(),
        w.distance_km(),
        w.duration_min(),
        m.value,
        m.unit,
        format_type_field(w.details()),
        w.position(),
        w.click_count()
    )
}

/// Popup text shown on a workout's map marker.
pub fn marker_text(w: &Workout) -> String {
    format!("{} {}", icon(w.kind()), w.label())
}

pub fn map_link(position: Position, zoom: u8) -> String {
    format!(
        "https://www.openstreetmap.org/#map={zoom}/{}/{}",
        position.lat, position.lon
    )
}
