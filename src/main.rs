use std::path::PathBuf;

use chrono::{Duration, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};

use flight_etl::observability::logging::init_logging;
use flight_etl::pipeline::{
    run_final_merge, run_t100_merge, FinalMergeOptions, MergeOptions,
};
use flight_etl::positions::{
    default_hub_routes, fetch_position_batches, write_json, BatchQueryOptions, Fr24Client,
    PositionFilters,
};
use flight_etl::positions::convert::json_file_to_csv;

#[derive(Parser)]
#[command(name = "flight-etl")]
#[command(about = "Flight data merge pipelines: DOT table merges and historical position queries")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge multi-year T-100 carrier summaries into one table
    T100Merge {
        /// Input CSV files to merge (order preserved)
        #[arg(long, num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,
        /// Output CSV path
        #[arg(long)]
        out: PathBuf,
        /// Keep only AA flights between the hub airports
        #[arg(long)]
        filter_aa: bool,
        /// Comma-separated airport IATA codes overriding the default hubs
        #[arg(long, value_delimiter = ',')]
        airports: Option<Vec<String>>,
        /// Keep only the canonical carrier/route/date columns
        #[arg(long)]
        project_minimal: bool,
        /// Comma-separated column list to dedupe on (keeps first occurrence)
        #[arg(long, value_delimiter = ',')]
        dedupe: Option<Vec<String>>,
        /// Aircraft-type reference CSV mapping codes to descriptions
        #[arg(long)]
        aircraft_types: Option<PathBuf>,
    },
    /// Enrich flight-level test records with aircraft-type data from the merged summary
    FinalMerge {
        /// Flight-level test records CSV
        #[arg(long = "aa_test")]
        aa_test: PathBuf,
        /// Merged T-100 summary CSV carrying AIRCRAFT_TYPE and DESCRIPTION
        #[arg(long)]
        merged: PathBuf,
        /// Output enriched CSV path
        #[arg(long)]
        out: PathBuf,
        /// Aircraft-type reference CSV used to backfill codes from descriptions
        #[arg(long)]
        aircraft_types: Option<PathBuf>,
        /// Keep only flights where origin and destination are both hubs
        #[arg(long)]
        filter_hubs: bool,
        /// Comma-separated hub IATA codes overriding the default list
        #[arg(long, value_delimiter = ',')]
        hubs: Option<Vec<String>>,
    },
    /// Batch-query historical flight positions into one JSON file
    FetchPositions {
        /// Day to query (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Minutes between position snapshots
        #[arg(long, default_value_t = 30)]
        interval_mins: u32,
        /// Comma-separated routes (ORG-DST); defaults to all hub pairs
        #[arg(long, value_delimiter = ',')]
        routes: Option<Vec<String>>,
        /// Routes per request, capped by the API server
        #[arg(long, default_value_t = 15)]
        batch_size: usize,
        /// Record limit per request
        #[arg(long, default_value_t = 1000)]
        limit: u32,
        /// Bounding box filter (lat,lat,lon,lon), continental US by default
        #[arg(long, default_value = "50.000,24.500,-125.000,-66.000")]
        bounds: String,
        /// Operating carrier ICAO filter
        #[arg(long, default_value = "AAL")]
        operating_as: String,
        /// Painted carrier ICAO filter
        #[arg(long, default_value = "AAL")]
        painted_as: String,
        /// Drop repeated (fr24_id, timestamp) records
        #[arg(long)]
        dedupe: bool,
        /// Maximum outbound requests per minute
        #[arg(long, default_value_t = 60)]
        requests_per_minute: u32,
        /// Output JSON path
        #[arg(long, default_value = "outputs/batch_flight_data.json")]
        out: PathBuf,
    },
    /// Convert a JSON position dump to CSV
    JsonToCsv {
        /// Input JSON file (array of position records)
        #[arg(long)]
        input: PathBuf,
        /// Output CSV path
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    init_logging();

    match cli.command {
        Commands::T100Merge {
            inputs,
            out,
            filter_aa,
            airports,
            project_minimal,
            dedupe,
            aircraft_types,
        } => {
            let options = MergeOptions {
                inputs,
                out: out.clone(),
                filter_aa,
                airports,
                project_minimal,
                dedupe_on: dedupe,
                aircraft_types,
            };
            let summary = run_t100_merge(&options)?;
            println!("✅ Merged summaries to {} ({})", out.display(), summary);
        }
        Commands::FinalMerge {
            aa_test,
            merged,
            out,
            aircraft_types,
            filter_hubs,
            hubs,
        } => {
            let options = FinalMergeOptions {
                flight_test: aa_test,
                merged,
                out: out.clone(),
                aircraft_types,
                filter_hubs,
                hubs,
            };
            let summary = run_final_merge(&options)?;
            println!("✅ Wrote enriched file {} ({})", out.display(), summary);
        }
        Commands::FetchPositions {
            date,
            interval_mins,
            routes,
            batch_size,
            limit,
            bounds,
            operating_as,
            painted_as,
            dedupe,
            requests_per_minute,
            out,
        } => {
            let start = date.and_time(NaiveTime::MIN).and_utc();
            let options = BatchQueryOptions {
                start,
                end: start + Duration::seconds(24 * 60 * 60 - 1),
                interval_seconds: i64::from(interval_mins) * 60,
                routes: routes.unwrap_or_else(default_hub_routes),
                batch_size,
                requests_per_minute,
                dedupe,
                filters: PositionFilters {
                    routes: None,
                    bounds: Some(bounds),
                    operating_as: Some(operating_as),
                    painted_as: Some(painted_as),
                    limit: Some(limit),
                },
            };
            let client = Fr24Client::from_env()?;
            let records = fetch_position_batches(&client, &options).await?;
            write_json(&records, &out)?;
            println!("✅ Saved {} position records to {}", records.len(), out.display());
        }
        Commands::JsonToCsv { input, out } => {
            let rows = json_file_to_csv(&input, &out)?;
            println!("✅ Converted {} records to {}", rows, out.display());
        }
    }

    Ok(())
}
