use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::common::error::{EtlError, Result};
use crate::table::{columns, Table, Value};

/// Load-time options. Declared integer columns are coerced to `Value::Int`;
/// rows whose cells fail coercion are skipped, not fatal.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub integer_columns: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            integer_columns: vec![columns::YEAR.to_string(), columns::MONTH.to_string()],
        }
    }
}

impl LoadOptions {
    /// No per-column coercion at all.
    pub fn untyped() -> Self {
        Self { integer_columns: Vec::new() }
    }
}

/// A loaded table plus the number of malformed rows dropped along the way.
#[derive(Debug)]
pub struct LoadReport {
    pub table: Table,
    pub skipped_rows: usize,
}

/// Read one CSV file (header row required) into a Table.
pub fn load_csv(path: &Path, options: &LoadOptions) -> Result<LoadReport> {
    let file = std::fs::File::open(path).map_err(|e| {
        EtlError::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
    })?;
    read_table(file, &path.display().to_string(), options)
}

/// Read CSV text that has already been repaired or generated in memory.
pub fn load_csv_str(text: &str, label: &str, options: &LoadOptions) -> Result<LoadReport> {
    read_table(text.as_bytes(), label, options)
}

/// Read several files sharing one schema into a single table, preserving
/// file-then-row order. Files whose column set differs from the first are a
/// fatal schema mismatch; column order may vary and is mapped back to the
/// first file's order.
pub fn load_many(paths: &[PathBuf], options: &LoadOptions) -> Result<LoadReport> {
    let (first, rest) = paths.split_first().ok_or_else(|| {
        EtlError::Config("at least one input file is required".to_string())
    })?;

    let mut report = load_csv(first, options)?;
    for path in rest {
        let next = load_csv(path, options)?;
        let mapping = schema_mapping(&report.table, &next.table).ok_or_else(|| {
            EtlError::SchemaMismatch {
                first_path: first.display().to_string(),
                path: path.display().to_string(),
            }
        })?;
        for cells in next.table.cell_rows() {
            let row = mapping.iter().map(|&i| cells[i].clone()).collect();
            report.table.push_row(row);
        }
        report.skipped_rows += next.skipped_rows;
    }
    Ok(report)
}

/// For each column of `first`, the index of the same column in `next`.
/// None when the column sets differ.
fn schema_mapping(first: &Table, next: &Table) -> Option<Vec<usize>> {
    if first.columns().len() != next.columns().len() {
        return None;
    }
    first
        .columns()
        .iter()
        .map(|c| next.column_index(c))
        .collect()
}

fn read_table<R: io::Read>(reader: R, label: &str, options: &LoadOptions) -> Result<LoadReport> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let integer_indexes: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| options.integer_columns.iter().any(|c| c == *h))
        .map(|(i, _)| i)
        .collect();

    let mut table = Table::new(headers);
    let mut skipped = 0usize;

    for record in rdr.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!("{}: skipping malformed row: {}", label, e);
                skipped += 1;
                continue;
            }
        };
        if record.len() != table.columns().len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            warn!(
                "{}: skipping line {}: expected {} fields, found {}",
                label,
                line,
                table.columns().len(),
                record.len()
            );
            skipped += 1;
            continue;
        }

        let mut cells: Vec<Value> = record.iter().map(Value::from_field).collect();
        let mut bad_cell = None;
        for &i in &integer_indexes {
            match cells[i].coerce_int() {
                Some(n) => cells[i] = Value::Int(n),
                None if cells[i].is_null() => {}
                None => {
                    bad_cell = Some(i);
                    break;
                }
            }
        }
        if let Some(i) = bad_cell {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            warn!(
                "{}: skipping line {}: column {} is not an integer ({})",
                label,
                line,
                table.columns()[i],
                cells[i]
            );
            skipped += 1;
            continue;
        }
        table.push_row(cells);
    }

    debug!("{}: loaded {} rows, skipped {}", label, table.len(), skipped);
    Ok(LoadReport { table, skipped_rows: skipped })
}
