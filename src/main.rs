//! CLI entry point for bikewatch.
//!
//! Loads the station list and trip log, then drives the live update
//! controller headlessly: summarizing traffic, replaying slider values, or
//! exporting per-station results.

use anyhow::{Context, Result};
use bikewatch::config::BikewatchConfig;
use bikewatch::controller::{LiveController, Projector, VisualSink};
use bikewatch::fetch::{BasicClient, load_datasets};
use bikewatch::output::{JsonLinesSink, LogSink, TrafficRecord, traffic_records, write_traffic_csv};
use bikewatch::view::MapView;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bikewatch")]
#[command(about = "Bike-share station traffic by time of day", long_about = None)]
struct Cli {
    /// Optional JSON config file (radius presets, map view, HTTP timeouts)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DatasetArgs {
    /// Station JSON file or URL [env: BIKEWATCH_STATIONS]
    #[arg(short, long)]
    stations: Option<String>,

    /// Trip CSV (optionally .gz) file or URL [env: BIKEWATCH_TRIPS]
    #[arg(short, long)]
    trips: Option<String>,
}

impl DatasetArgs {
    fn resolve(&self) -> Result<(String, String)> {
        let stations = match &self.stations {
            Some(s) => s.clone(),
            None => std::env::var("BIKEWATCH_STATIONS")
                .context("--stations not given and BIKEWATCH_STATIONS not set")?,
        };
        let trips = match &self.trips {
            Some(t) => t.clone(),
            None => std::env::var("BIKEWATCH_TRIPS")
                .context("--trips not given and BIKEWATCH_TRIPS not set")?,
        };
        Ok((stations, trips))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Log the busiest stations for a time of day
    Summary {
        #[command(flatten)]
        data: DatasetArgs,

        /// Minute of day (0-1439), or -1 for any time
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        at: i32,

        /// Number of stations to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Replay slider values and emit each update as a JSON line
    Scrub {
        #[command(flatten)]
        data: DatasetArgs,

        /// Slider values to apply in order
        #[arg(long = "at", required = true, num_args = 1.., allow_negative_numbers = true)]
        values: Vec<i32>,

        /// File to write JSON lines to (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Write per-station traffic for a time of day as CSV
    Export {
        #[command(flatten)]
        data: DatasetArgs,

        /// Minute of day (0-1439), or -1 for any time
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        at: i32,

        /// CSV file to write
        #[arg(short, long, default_value = "station_traffic.csv")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bikewatch.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bikewatch.log"));

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

    let config = match &cli.config {
        Some(path) => BikewatchConfig::load(path).with_context(|| format!("Loading config {path}"))?,
        None => BikewatchConfig::default(),
    };

    match cli.command {
        Commands::Summary { data, at, top } => {
            let mut controller = start(&data, &config, LogSink).await?;
            controller.filter_changed(at)?;

            let mut records = current_records(&controller)?;
            records.sort_by(|a, b| b.total_traffic.cmp(&a.total_traffic));

            let filter = controller.filter().unwrap_or_default();
            let departures: u32 = records.iter().map(|r| r.departures).sum();
            info!(filter = %filter, stations = records.len(), departures, "Traffic summary");

            for (rank, r) in records.iter().take(top).enumerate() {
                info!(
                    rank = rank + 1,
                    station_id = %r.short_name,
                    station_name = %r.name,
                    arrivals = r.arrivals,
                    departures = r.departures,
                    total = r.total_traffic,
                    radius = r.radius,
                    flow_ratio = r.flow_ratio,
                    "Station"
                );
            }
        }
        Commands::Scrub {
            data,
            values,
            output,
        } => {
            let writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path).with_context(|| format!("Creating {path}"))?,
                )),
                None => Box::new(BufWriter::new(std::io::stdout())),
            };
            let mut controller = start(&data, &config, JsonLinesSink::new(writer)).await?;

            for value in values {
                if let Err(e) = controller.filter_changed(value) {
                    warn!(value, error = %e, "Skipping slider value");
                }
            }

            controller
                .into_sink()
                .into_inner()
                .context("Writing JSON lines")?
                .flush()?;
        }
        Commands::Export { data, at, output } => {
            let mut controller = start(&data, &config, LogSink).await?;
            controller.filter_changed(at)?;

            let records = current_records(&controller)?;
            let file = File::create(&output).with_context(|| format!("Creating {output}"))?;
            write_traffic_csv(file, &records)?;

            info!(output, rows = records.len(), "Export complete");
        }
    }

    Ok(())
}

/// Loads both datasets concurrently and hands them to a fresh controller.
async fn start<S: VisualSink>(
    data: &DatasetArgs,
    config: &BikewatchConfig,
    sink: S,
) -> Result<LiveController<MapView, S>> {
    let (stations_src, trips_src) = data.resolve()?;
    let client = BasicClient::new(&config.http)?;

    let (stations, trips) = load_datasets(&client, &stations_src, &trips_src).await;

    let mut controller = LiveController::new(config.radius, MapView::new(&config.map), sink);
    let stations_result = controller.stations_loaded(stations);
    let trips_result = controller.trips_loaded(trips.map(|batch| batch.trips));
    stations_result.with_context(|| format!("Loading stations from {stations_src}"))?;
    trips_result.with_context(|| format!("Loading trips from {trips_src}"))?;

    Ok(controller)
}

fn current_records<P: Projector, S: VisualSink>(
    controller: &LiveController<P, S>,
) -> Result<Vec<TrafficRecord>> {
    let stations = controller.stations().context("Datasets not loaded")?;
    let aggregate = controller.current_aggregate().context("Datasets not loaded")?;
    let scales = controller.current_scales().context("Datasets not loaded")?;
    Ok(traffic_records(stations, aggregate, scales))
}
