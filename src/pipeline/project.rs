use crate::common::error::{EtlError, Result};
use crate::table::{columns, Table};

/// Restrict `table` to exactly the named columns, in that order. The column
/// list is validated up front so the stage never fails mid-stream.
pub fn project<S: AsRef<str>>(table: &Table, names: &[S]) -> Result<Table> {
    let indexes = table.require_columns(names, "projection")?;
    let mut out = Table::new(names.iter().map(|n| n.as_ref().to_string()).collect());
    for cells in table.cell_rows() {
        out.push_row(indexes.iter().map(|&i| cells[i].clone()).collect());
    }
    Ok(out)
}

/// Minimal projection for the T-100 merge: resolve the carrier, endpoint and
/// date columns through their synonym lists and rename them to the canonical
/// spelling. The aircraft-type column rides along when the extract has one.
pub fn project_minimal(table: &Table) -> Result<Table> {
    let cols = table.columns();
    let mut selected: Vec<(String, usize)> = Vec::new();
    for (canonical, candidates) in [
        (columns::UNIQUE_CARRIER, columns::CARRIER_CANDIDATES),
        (columns::ORIGIN, columns::ORIGIN_CANDIDATES),
        (columns::DEST, columns::DEST_CANDIDATES),
        (columns::YEAR, columns::YEAR_CANDIDATES),
        (columns::MONTH, columns::MONTH_CANDIDATES),
    ] {
        let index = columns::pick_column_index(cols, candidates).ok_or_else(|| {
            EtlError::MissingColumn {
                column: canonical.to_string(),
                context: "minimal projection".to_string(),
            }
        })?;
        selected.push((canonical.to_string(), index));
    }
    if let Some(index) = columns::pick_column_index(cols, columns::AIRCRAFT_CANDIDATES) {
        selected.push((columns::AIRCRAFT_TYPE.to_string(), index));
    }

    let mut out = Table::new(selected.iter().map(|(name, _)| name.clone()).collect());
    for cells in table.cell_rows() {
        out.push_row(selected.iter().map(|(_, i)| cells[*i].clone()).collect());
    }
    Ok(out)
}
