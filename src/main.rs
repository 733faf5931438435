#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::Parser;
use mapty::{
    FixedPosition, PositionProvider, SqliteStorage, WorkoutStore, cli, utils,
    utils::MAP_ZOOM_LEVEL,
};

#[macro_use]
extern crate mapty;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);

    let storage = SqliteStorage::open(&cli.db)
        .with_context(|| format!("Opening workout storage: {}", cli.db.display()))?;
    let mut store = WorkoutStore::open(storage).context("Restoring workouts")?;
    let provider = if cli.deny_location {
        FixedPosition::denied()
    } else {
        FixedPosition::new(cli.home)
    };

    match cli.cmd {
        Some(cli::Cmd::Add { workout }) => {
            let (kind, distance, duration, type_field, at) = workout.parts();
            let position = match at {
                Some(p) => p,
                None => provider
                    .current_position()
                    .context("No position for the workout: pass --at LAT,LON or set --home")?,
            };
            dlog!("mode=add kind={kind} position={position}");

            let created = store.create_workout(kind, position, distance, duration, type_field)?;
            println!("{}", utils::marker_text(created));
            println!("{}\t{}", created.id(), utils::format_summary(created));
            Ok(())
        }
        Some(cli::Cmd::View { id }) => {
            let w = store.record_viewed(&id)?;
            println!("{}", utils::marker_text(w));
            println!("{}", utils::format_summary(w));
            println!("{}", utils::map_link(w.position(), MAP_ZOOM_LEVEL));
            Ok(())
        }
        Some(cli::Cmd::Reset) => {
            store.reset()?;
            println!("All workouts removed.");
            Ok(())
        }
        Some(cli::Cmd::List {
            details,
            kind,
            count,
        }) => print_list(&store, details, kind, count),
        None => print_list(&store, false, None, None),
    }
}

fn print_list(
    store: &WorkoutStore<SqliteStorage>,
    details: bool,
    kind: Option<mapty::WorkoutKind>,
    count: Option<usize>,
) -> Result<()> {
    let workouts = store.list_workouts()?;
    dlog!("mode=list total={} details={details}", workouts.len());

    let mut shown = 0usize;
    for (i, w) in workouts
        .iter()
        .filter(|w| kind.is_none_or(|k| w.kind() == k))
        .take(count.unwrap_or(usize::MAX))
        .enumerate()
    {
        if details {
            println!("{}", utils::format_row(i + 1, w));
        } else {
            println!("{}\t{}", w.id(), utils::format_summary(w));
        }
        shown += 1;
    }

    if shown == 0 {
        println!("No workouts logged yet.");
    }
    Ok(())
}
