use std::fmt;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::common::error::{EtlError, Result};
use crate::pipeline::aircraft::{attach_descriptions, AircraftTypes};
use crate::pipeline::dedupe::dedupe;
use crate::pipeline::enrich::enrich;
use crate::pipeline::filter::{filter_rows, CarrierFilter};
use crate::pipeline::loader::{load_csv_str, load_many, LoadOptions};
use crate::pipeline::project::{project, project_minimal};
use crate::pipeline::writer::write_csv;
use crate::table::{columns, Table, Value};

/// Options for the T-100 carrier-summary merge.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub inputs: Vec<PathBuf>,
    pub out: PathBuf,
    pub filter_aa: bool,
    pub airports: Option<Vec<String>>,
    pub project_minimal: bool,
    pub dedupe_on: Option<Vec<String>>,
    pub aircraft_types: Option<PathBuf>,
}

impl MergeOptions {
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(EtlError::Config("at least one --inputs path is required".into()));
        }
        if matches!(&self.dedupe_on, Some(key) if key.is_empty()) {
            return Err(EtlError::Config("--dedupe requires a non-empty column list".into()));
        }
        if self.airports.is_some() && !self.filter_aa {
            return Err(EtlError::Config("--airports only applies with --filter-aa".into()));
        }
        Ok(())
    }

    fn airport_set(&self) -> Vec<String> {
        self.airports.clone().unwrap_or_else(|| {
            columns::DEFAULT_HUB_AIRPORTS.iter().map(|s| s.to_string()).collect()
        })
    }
}

/// Options for the final flight-level enrichment merge.
#[derive(Debug, Clone)]
pub struct FinalMergeOptions {
    pub flight_test: PathBuf,
    pub merged: PathBuf,
    pub out: PathBuf,
    pub aircraft_types: Option<PathBuf>,
    pub filter_hubs: bool,
    pub hubs: Option<Vec<String>>,
}

impl FinalMergeOptions {
    pub fn validate(&self) -> Result<()> {
        if self.hubs.is_some() && !self.filter_hubs {
            return Err(EtlError::Config("--hubs only applies with --filter-hubs".into()));
        }
        Ok(())
    }

    fn hub_set(&self) -> Vec<String> {
        self.hubs.clone().unwrap_or_else(|| {
            columns::DEFAULT_HUB_AIRPORTS.iter().map(|s| s.to_string()).collect()
        })
    }
}

/// Row accounting for a completed merge run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    pub skipped_rows: usize,
    pub unmatched: usize,
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows in, {} rows out, {} skipped, {} unmatched",
            self.rows_in, self.rows_out, self.skipped_rows, self.unmatched
        )
    }
}

/// Merge multi-year T-100 carrier summaries into one table:
/// load, optional carrier/hub filter, optional minimal projection, optional
/// dedup, optional aircraft-type description lookup, write.
pub fn run_t100_merge(options: &MergeOptions) -> Result<MergeSummary> {
    options.validate()?;
    info!("starting T-100 merge of {} input file(s)", options.inputs.len());

    let loaded = load_many(&options.inputs, &LoadOptions::default())?;
    let mut summary = MergeSummary {
        rows_in: loaded.table.len(),
        skipped_rows: loaded.skipped_rows,
        ..Default::default()
    };
    let mut table = loaded.table;

    if options.filter_aa {
        let airports = options.airport_set();
        let filter = CarrierFilter::new(&table, "AA", Some(&airports));
        table = filter_rows(&table, |row| filter.matches(row));
        info!("carrier filter kept {} of {} rows", table.len(), summary.rows_in);
    }

    if options.project_minimal {
        table = project_minimal(&table)?;
    }

    if let Some(key) = &options.dedupe_on {
        let before = table.len();
        table = dedupe(&table, key)?;
        info!("dedup on {:?} kept {} of {} rows", key, table.len(), before);
    }

    if let Some(path) = &options.aircraft_types {
        let types = AircraftTypes::load(path)?;
        let report = attach_descriptions(&table, &types);
        table = report.table;
        summary.unmatched = report.unmatched;
    }

    write_csv(&table, &options.out)?;
    summary.rows_out = table.len();
    info!("T-100 merge finished: {}", summary);
    Ok(summary)
}

/// The flight-level identifiers both final-merge inputs must carry.
const JOIN_KEY: [&str; 4] = [columns::ORIGIN, columns::DEST, columns::YEAR, columns::MONTH];

/// Scheduled/actual time columns normalized to 4-digit strings.
const TIME_COLUMNS: [&str; 6] = [
    "CRS_DEP_TIME",
    "DEP_TIME",
    "WHEELS_OFF",
    "CRS_ARR_TIME",
    "ARR_TIME",
    "WHEELS_ON",
];

/// Enrich flight-level test records with the aircraft type and description
/// carried by the merged T-100 summary, joining on origin, destination, year
/// and month.
pub fn run_final_merge(options: &FinalMergeOptions) -> Result<MergeSummary> {
    options.validate()?;

    let raw = std::fs::read_to_string(&options.flight_test)?;
    let repaired = repair_flight_test_text(&raw);
    let flight_label = options.flight_test.display().to_string();
    let loaded = load_csv_str(&repaired, &flight_label, &LoadOptions::untyped())?;
    let mut summary = MergeSummary {
        rows_in: loaded.table.len(),
        skipped_rows: loaded.skipped_rows,
        ..Default::default()
    };

    let mut flights = normalize_time_columns(&loaded.table);
    flights = derive_year_month(&flights, &flight_label)?;

    let merged = load_many(
        std::slice::from_ref(&options.merged),
        &LoadOptions::default(),
    )?;
    summary.skipped_rows += merged.skipped_rows;
    let merged_table = ensure_columns(
        merged.table,
        &[columns::AIRCRAFT_TYPE, columns::DESCRIPTION],
    );

    validate_join_columns(&flights, &flight_label)?;
    validate_join_columns(&merged_table, &options.merged.display().to_string())?;
    if columns::pick_column(flights.columns(), columns::CARRIER_CANDIDATES).is_none() {
        return Err(EtlError::Config(format!(
            "no carrier column found in {}",
            flight_label
        )));
    }

    // one reference row per route/month; the merged summary may repeat keys
    // across aircraft configurations, first occurrence wins
    let mut take_cols: Vec<&str> = JOIN_KEY.to_vec();
    take_cols.push(columns::AIRCRAFT_TYPE);
    take_cols.push(columns::DESCRIPTION);
    let reference = dedupe(&project(&merged_table, &take_cols)?, &JOIN_KEY)?;

    let report = enrich(
        &flights,
        &reference,
        &JOIN_KEY,
        Some(&[columns::AIRCRAFT_TYPE, columns::DESCRIPTION]),
    )?;
    summary.unmatched = report.unmatched;
    let mut table = report.table;

    if let Some(path) = &options.aircraft_types {
        let types = AircraftTypes::load(path)?;
        table = backfill_codes_from_descriptions(&table, &types);
    }

    if options.filter_hubs {
        let hubs: Vec<String> = options.hub_set();
        let hub_filter = |row: crate::table::Row<'_>| {
            let in_hubs = |name: &str| {
                row.get(name)
                    .and_then(|v| v.as_str())
                    .map_or(false, |s| hubs.iter().any(|h| h.eq_ignore_ascii_case(s.trim())))
            };
            in_hubs(columns::ORIGIN) && in_hubs(columns::DEST)
        };
        let before = table.len();
        table = filter_rows(&table, hub_filter);
        info!("hub filter kept {} of {} rows", table.len(), before);
    }

    write_csv(&table, &options.out)?;
    summary.rows_out = table.len();
    info!("final merge finished: {}", summary);
    Ok(summary)
}

fn validate_join_columns(table: &Table, label: &str) -> Result<()> {
    for col in JOIN_KEY {
        if !table.has_column(col) {
            return Err(EtlError::Config(format!(
                "join column {} is missing from {}",
                col, label
            )));
        }
    }
    Ok(())
}

static BROKEN_HEADER_DATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(DIVERTED)[ \t]+(\d{4}/\d{1,2}/\d{1,2})").unwrap());

/// Repair the known defects of the flight-test extract before parsing: a
/// header token split across lines and the first data row glued onto the
/// header line.
pub fn repair_flight_test_text(text: &str) -> String {
    let fixed = text.replace("DEP_\nTIME", "DEP_TIME");
    BROKEN_HEADER_DATA.replacen(&fixed, 1, "$1\n$2").into_owned()
}

static FIRST_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Normalize time-of-day columns to 4-digit zero-padded strings ("730" and
/// "726.0" both become "0730"-style values); cells without digits go null.
pub fn normalize_time_columns(table: &Table) -> Table {
    let time_indexes: Vec<usize> = TIME_COLUMNS
        .iter()
        .filter_map(|c| table.column_index(c))
        .collect();
    if time_indexes.is_empty() {
        return table.clone();
    }

    let mut out = Table::new(table.columns().to_vec());
    for cells in table.cell_rows() {
        let mut row = cells.to_vec();
        for &i in &time_indexes {
            row[i] = match FIRST_DIGITS.find(&row[i].to_string()) {
                Some(m) => Value::Str(format!("{:0>4}", m.as_str())),
                None => Value::Null,
            };
        }
        out.push_row(row);
    }
    out
}

const FL_DATE_FORMATS: [&str; 2] = ["%Y/%m/%d", "%Y-%m-%d"];

/// Derive integer YEAR and MONTH columns from FL_DATE. Rows whose date does
/// not parse keep null year/month and are logged, not dropped.
pub fn derive_year_month(table: &Table, label: &str) -> Result<Table> {
    let date_idx = match table.column_index(columns::FL_DATE) {
        Some(i) => i,
        None => return Ok(table.clone()),
    };

    let mut out_columns = table.columns().to_vec();
    for col in [columns::YEAR, columns::MONTH] {
        if !table.has_column(col) {
            out_columns.push(col.to_string());
        }
    }
    let year_idx = out_columns.iter().position(|c| c == columns::YEAR).ok_or_else(|| {
        EtlError::MissingColumn { column: columns::YEAR.into(), context: label.into() }
    })?;
    let month_idx = out_columns.iter().position(|c| c == columns::MONTH).ok_or_else(|| {
        EtlError::MissingColumn { column: columns::MONTH.into(), context: label.into() }
    })?;
    let mut out = Table::new(out_columns);

    let mut unparsed = 0usize;
    for cells in table.cell_rows() {
        let mut row = cells.to_vec();
        row.resize(out.columns().len(), Value::Null);
        let parsed = cells[date_idx].as_str().and_then(parse_flight_date);
        match parsed {
            Some(date) => {
                row[year_idx] = Value::Int(i64::from(date.year()));
                row[month_idx] = Value::Int(i64::from(date.month()));
            }
            None => {
                unparsed += 1;
                row[year_idx] = Value::Null;
                row[month_idx] = Value::Null;
            }
        }
        out.push_row(row);
    }
    if unparsed > 0 {
        warn!("{}: {} rows had an unparseable FL_DATE", label, unparsed);
    }
    Ok(out)
}

fn parse_flight_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    FL_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Add any missing named columns, filled with nulls.
fn ensure_columns(table: Table, names: &[&str]) -> Table {
    let missing: Vec<&str> = names.iter().copied().filter(|n| !table.has_column(n)).collect();
    if missing.is_empty() {
        return table;
    }
    let mut out_columns = table.columns().to_vec();
    out_columns.extend(missing.iter().map(|n| n.to_string()));
    let mut out = Table::new(out_columns);
    for cells in table.cell_rows() {
        let mut row = cells.to_vec();
        row.extend(missing.iter().map(|_| Value::Null));
        out.push_row(row);
    }
    out
}

/// Where AIRCRAFT_TYPE is missing but a DESCRIPTION matched the reference,
/// recover the code through the reverse lookup.
fn backfill_codes_from_descriptions(table: &Table, types: &AircraftTypes) -> Table {
    let (Some(code_idx), Some(desc_idx)) = (
        table.column_index(columns::AIRCRAFT_TYPE),
        table.column_index(columns::DESCRIPTION),
    ) else {
        return table.clone();
    };

    let mut filled = 0usize;
    let mut out = Table::new(table.columns().to_vec());
    for cells in table.cell_rows() {
        let mut row = cells.to_vec();
        let code_missing = match &row[code_idx] {
            Value::Null => true,
            Value::Str(s) => s.trim().is_empty(),
            _ => false,
        };
        if code_missing {
            if let Some(code) = types.code_for_description(&row[desc_idx]) {
                row[code_idx] = Value::Str(code.to_string());
                filled += 1;
            }
        }
        out.push_row(row);
    }
    if filled > 0 {
        info!("backfilled {} aircraft-type codes from descriptions", filled);
    }
    out
}
