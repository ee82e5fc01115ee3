use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use crate::common::error::{EtlError, Result};
use crate::pipeline::enrich::EnrichReport;
use crate::pipeline::loader::{load_csv, LoadOptions};
use crate::table::{columns, Table, Value};

/// The DOT aircraft-type reference, indexed once per run.
///
/// Codes are normalized to digits-only, zero-padded to three characters; the
/// reverse map (normalized description to code) backs the final merge's code
/// backfill. One row per normalized code is an invariant of the source table;
/// a repeat is surfaced as a fatal error, never resolved silently.
#[derive(Debug)]
pub struct AircraftTypes {
    by_code: HashMap<String, String>,
    by_description: HashMap<String, String>,
}

impl AircraftTypes {
    pub fn load(path: &Path) -> Result<Self> {
        let report = load_csv(path, &LoadOptions::untyped())?;
        Self::from_table(&report.table, &path.display().to_string())
    }

    /// Build the index from a reference table. The code and description
    /// columns are resolved by name when possible, otherwise the first two
    /// columns are taken, matching the upstream extract's layout.
    pub fn from_table(table: &Table, label: &str) -> Result<Self> {
        let cols = table.columns();
        let code_col = columns::pick_column(cols, &["CODE"])
            .or_else(|| cols.first().map(String::as_str))
            .ok_or_else(|| EtlError::MissingColumn {
                column: "CODE".to_string(),
                context: label.to_string(),
            })?
            .to_string();
        let desc_col = columns::pick_column(cols, &["DESCRIPTION"])
            .or_else(|| cols.get(1).map(String::as_str))
            .ok_or_else(|| EtlError::MissingColumn {
                column: columns::DESCRIPTION.to_string(),
                context: label.to_string(),
            })?
            .to_string();

        let mut by_code = HashMap::new();
        let mut by_description = HashMap::new();
        for row in table.rows() {
            let code = row
                .get(&code_col)
                .map(|v| normalize_code(&v.to_string()))
                .unwrap_or_default();
            if code.is_empty() {
                warn!("{}: skipping reference row without a usable code", label);
                continue;
            }
            let description = row
                .get(&desc_col)
                .map(|v| v.to_string())
                .unwrap_or_default();
            if by_code.insert(code.clone(), description.clone()).is_some() {
                return Err(EtlError::AmbiguousReference { key: code });
            }
            let desc_key = normalize_description(&description);
            if !desc_key.is_empty() {
                by_description.entry(desc_key).or_insert(code);
            }
        }
        Ok(Self { by_code, by_description })
    }

    pub fn description(&self, raw_code: &Value) -> Option<&str> {
        let code = normalize_code(&raw_code.to_string());
        self.by_code.get(&code).map(String::as_str)
    }

    pub fn code_for_description(&self, raw_description: &Value) -> Option<&str> {
        let key = normalize_description(&raw_description.to_string());
        self.by_description.get(&key).map(String::as_str)
    }
}

/// Keep digits only and zero-pad to three characters; empty when the raw
/// value carries no digits at all.
pub fn normalize_code(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        digits
    } else {
        format!("{:0>3}", digits)
    }
}

/// Trim, uppercase, collapse interior whitespace.
pub fn normalize_description(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Attach a DESCRIPTION column by aircraft-type lookup. LEFT JOIN semantics:
/// rows without a match keep a null description and are counted.
///
/// The aircraft-type column is resolved through its synonym list; a table
/// without one passes through unchanged, mirroring extracts that never
/// carried the code. The output always exposes the canonical AIRCRAFT_TYPE
/// name alongside DESCRIPTION.
pub fn attach_descriptions(table: &Table, types: &AircraftTypes) -> EnrichReport {
    let source_idx = match columns::pick_column_index(table.columns(), columns::AIRCRAFT_CANDIDATES)
    {
        Some(i) => i,
        None => {
            warn!("no aircraft-type column found, descriptions not attached");
            return EnrichReport { table: table.clone(), unmatched: 0 };
        }
    };

    let mut out_columns = table.columns().to_vec();
    let add_canonical = !table.has_column(columns::AIRCRAFT_TYPE);
    if add_canonical {
        out_columns.push(columns::AIRCRAFT_TYPE.to_string());
    }
    out_columns.push(columns::DESCRIPTION.to_string());

    let mut out = Table::new(out_columns);
    let mut unmatched = 0usize;
    for cells in table.cell_rows() {
        let code = &cells[source_idx];
        let description = match types.description(code) {
            Some(d) => Value::Str(d.to_string()),
            None => {
                if !code.is_null() {
                    unmatched += 1;
                }
                Value::Null
            }
        };
        let mut row = cells.to_vec();
        if add_canonical {
            row.push(code.clone());
        }
        row.push(description);
        out.push_row(row);
    }
    if unmatched > 0 {
        warn!("{} rows had aircraft-type codes with no reference entry", unmatched);
    }
    EnrichReport { table: out, unmatched }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> Table {
        let mut t = Table::new(vec!["Code".into(), "Description".into()]);
        t.push_row(vec![
            Value::Str("612".into()),
            Value::Str("Boeing 737-800".into()),
        ]);
        t.push_row(vec![
            Value::Str("22".into()),
            Value::Str("Douglas DC-3".into()),
        ]);
        t
    }

    #[test]
    fn codes_are_normalized_to_three_digits() {
        assert_eq!(normalize_code("612"), "612");
        assert_eq!(normalize_code("22"), "022");
        assert_eq!(normalize_code(" 6-1-2 "), "612");
        assert_eq!(normalize_code("N/A"), "");
    }

    #[test]
    fn lookups_use_normalized_forms() {
        let types = AircraftTypes::from_table(&reference(), "test").unwrap();
        assert_eq!(
            types.description(&Value::Str("022".into())),
            Some("Douglas DC-3")
        );
        assert_eq!(
            types.code_for_description(&Value::Str("  boeing   737-800 ".into())),
            Some("612")
        );
        assert_eq!(types.description(&Value::Str("999".into())), None);
    }

    #[test]
    fn repeated_normalized_code_is_fatal() {
        let mut t = reference();
        // "0-2-2" normalizes to the same code as "22"
        t.push_row(vec![
            Value::Str("0-2-2".into()),
            Value::Str("Douglas DC-3 (cargo)".into()),
        ]);
        let err = AircraftTypes::from_table(&t, "test").unwrap_err();
        assert!(matches!(err, EtlError::AmbiguousReference { key } if key == "022"));
    }

    #[test]
    fn attach_descriptions_counts_misses() {
        let types = AircraftTypes::from_table(&reference(), "test").unwrap();
        let mut base = Table::new(vec!["ORIGIN".into(), "AIRCRAFT_CONFIG".into()]);
        base.push_row(vec![Value::Str("JFK".into()), Value::Str("612".into())]);
        base.push_row(vec![Value::Str("LAX".into()), Value::Str("777".into())]);
        base.push_row(vec![Value::Str("ORD".into()), Value::Null]);

        let report = attach_descriptions(&base, &types);
        assert_eq!(report.table.len(), 3);
        assert_eq!(report.unmatched, 1);
        assert_eq!(
            report.table.row(0).get("DESCRIPTION"),
            Some(&Value::Str("Boeing 737-800".into()))
        );
        assert_eq!(report.table.row(1).get("DESCRIPTION"), Some(&Value::Null));
        assert_eq!(
            report.table.row(0).get("AIRCRAFT_TYPE"),
            Some(&Value::Str("612".into()))
        );
    }
}
