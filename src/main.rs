//! CLI entry point for the bike traffic tool.
//!
//! Provides subcommands for computing per-station traffic at one time of
//! day, sweeping the whole day, and inspecting the station list.

use anyhow::Result;
use bike_traffic::{
    filter::TimeFilter,
    output::{append_records, print_json, print_pretty, write_records},
    parser::{load_stations, load_trips},
    pipeline::TrafficContext,
    sweep::{peak, sweep},
};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bike_traffic")]
#[command(about = "Per-station bike-share traffic by time of day", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute arrivals, departures and map encodings for every station
    Traffic {
        /// Station JSON file
        #[arg(short, long, env = "BIKE_TRAFFIC_STATIONS")]
        stations: String,

        /// Trip CSV file (may be .gz)
        #[arg(short, long, env = "BIKE_TRAFFIC_TRIPS")]
        trips: String,

        /// Time of day: -1 or "any" for all trips, minutes since midnight, or HH:MM
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        time: TimeFilter,

        /// CSV file to write station rows to
        #[arg(short, long, default_value = "traffic.csv")]
        output: String,

        /// Also log the full view as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Evaluate traffic at regular intervals across the day
    Sweep {
        /// Station JSON file
        #[arg(short, long, env = "BIKE_TRAFFIC_STATIONS")]
        stations: String,

        /// Trip CSV file (may be .gz)
        #[arg(short, long, env = "BIKE_TRAFFIC_TRIPS")]
        trips: String,

        /// Minutes between evaluated times
        #[arg(long, default_value_t = 60)]
        step: u16,

        /// Maximum number of times evaluated concurrently
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,

        /// CSV file to write the sweep table to
        #[arg(short, long, default_value = "sweep.csv")]
        output: String,

        /// Append rows to an existing sweep table instead of replacing it
        #[arg(long, default_value_t = false)]
        append: bool,
    },
    /// Load and summarize the station list
    Stations {
        /// Station JSON file
        #[arg(short, long, env = "BIKE_TRAFFIC_STATIONS")]
        stations: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bike_traffic.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bike_traffic.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Traffic {
            stations,
            trips,
            time,
            output,
            json,
        } => {
            let context = TrafficContext::new(load_stations(&stations)?, load_trips(&trips)?);
            let view = context.view(time);

            if view.trip_count == 0 {
                warn!(time = %time, "No trips in window");
            }

            match view.busiest() {
                Some(busiest) => info!(
                    time = %time,
                    trips = view.trip_count,
                    active_stations = view.active_stations(),
                    busiest = %busiest.code,
                    busiest_traffic = busiest.total_traffic,
                    "Traffic computed"
                ),
                None => info!(time = %time, "Station list is empty"),
            }

            write_records(&output, &view.stations)?;
            info!(output = %output, rows = view.stations.len(), "Station traffic written");

            if json {
                print_json(&view)?;
            }
        }
        Commands::Sweep {
            stations,
            trips,
            step,
            concurrency,
            output,
            append,
        } => {
            let context = TrafficContext::new(load_stations(&stations)?, load_trips(&trips)?);
            let rows = sweep(Arc::new(context), step, concurrency).await?;

            if let Some(busiest) = peak(&rows) {
                info!(
                    peak_time = %busiest.label,
                    peak_trips = busiest.trips,
                    "Busiest time of day"
                );
            }

            if append {
                append_records(&output, &rows)?;
            } else {
                write_records(&output, &rows)?;
            }
            info!(output = %output, rows = rows.len(), append, "Sweep written");
        }
        Commands::Stations { stations } => {
            let stations = load_stations(&stations)?;

            for station in &stations {
                debug!(
                    code = %station.code,
                    name = station.name.as_deref().unwrap_or(""),
                    longitude = station.longitude,
                    latitude = station.latitude,
                    "Station"
                );
            }

            let unnamed = stations.iter().filter(|s| s.name.is_none()).count();
            info!(total = stations.len(), unnamed, "Station list summary");

            if let Some(first) = stations.first() {
                print_pretty(first);
            }
        }
    }

    Ok(())
}
