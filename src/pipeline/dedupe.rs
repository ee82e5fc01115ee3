use std::collections::HashSet;

use crate::common::error::Result;
use crate::table::{Table, Value};

/// Drop rows repeating an already-seen composite key, keeping the earliest
/// occurrence. Single pass, order-stable; the key columns are validated before
/// any row is touched.
pub fn dedupe<S: AsRef<str>>(table: &Table, key: &[S]) -> Result<Table> {
    let indexes = table.require_columns(key, "dedup key")?;
    let mut seen: HashSet<Vec<Value>> = HashSet::new();
    let mut out = Table::new(table.columns().to_vec());
    for cells in table.cell_rows() {
        let k: Vec<Value> = indexes.iter().map(|&i| cells[i].clone()).collect();
        if seen.insert(k) {
            out.push_row(cells.to_vec());
        }
    }
    Ok(out)
}
