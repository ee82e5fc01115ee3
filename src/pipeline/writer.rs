use std::path::Path;

use tracing::info;

use crate::common::error::Result;
use crate::table::Table;

/// Serialize `table` to CSV at `path`: header first, declared column order,
/// UTF-8. An existing file is overwritten.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns())?;
    for cells in table.cell_rows() {
        writer.write_record(cells.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    info!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::loader::{load_csv, LoadOptions};

    #[test]
    fn round_trips_through_the_loader() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("in.csv");
        let copy = dir.path().join("out.csv");
        std::fs::write(
            &original,
            "YEAR,ORIGIN,NOTE\n2023,JFK,\"quoted, comma\"\n2024,LAX,\n",
        )
        .unwrap();

        let loaded = load_csv(&original, &LoadOptions::default()).unwrap();
        write_csv(&loaded.table, &copy).unwrap();
        let reloaded = load_csv(&copy, &LoadOptions::default()).unwrap();

        assert_eq!(loaded.table, reloaded.table);
    }
}
