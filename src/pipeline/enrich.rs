use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::common::error::{EtlError, Result};
use crate::table::{Table, Value};

/// Result of an enrichment join: the joined table plus the number of base
/// rows that found no reference match.
#[derive(Debug)]
pub struct EnrichReport {
    pub table: Table,
    pub unmatched: usize,
}

/// LEFT JOIN `base` against `reference` on the composite key `on`, appending
/// the `take` columns (all non-key reference columns when `None`).
///
/// Every base row survives; misses get null enrichment cells and are counted.
/// Reference columns already present in the base schema are dropped rather
/// than duplicated, the base values win. A key occurring on more than one
/// reference row is a data-quality failure and aborts the join.
pub fn enrich<S: AsRef<str>>(
    base: &Table,
    reference: &Table,
    on: &[S],
    take: Option<&[&str]>,
) -> Result<EnrichReport> {
    let base_key = base.require_columns(on, "join key (base table)")?;
    let ref_key = reference.require_columns(on, "join key (reference table)")?;

    let taken: Vec<(String, usize)> = match take {
        Some(names) => reference
            .require_columns(names, "enrichment columns")?
            .into_iter()
            .zip(names.iter())
            .map(|(i, name)| (name.to_string(), i))
            .filter(|(name, _)| !base.has_column(name))
            .collect(),
        None => reference
            .columns()
            .iter()
            .enumerate()
            .filter(|(i, name)| !ref_key.contains(i) && !base.has_column(name))
            .map(|(i, name)| (name.clone(), i))
            .collect(),
    };

    let mut index: HashMap<Vec<Value>, usize> = HashMap::with_capacity(reference.len());
    for (row_idx, cells) in reference.cell_rows().enumerate() {
        let key: Vec<Value> = ref_key.iter().map(|&i| cells[i].clone()).collect();
        if index.insert(key.clone(), row_idx).is_some() {
            return Err(EtlError::AmbiguousReference { key: describe_key(&key) });
        }
    }

    let mut out_columns = base.columns().to_vec();
    out_columns.extend(taken.iter().map(|(name, _)| name.clone()));
    let mut out = Table::new(out_columns);

    let mut unmatched = 0usize;
    let mut reported: HashSet<Vec<Value>> = HashSet::new();
    let ref_rows: Vec<&[Value]> = reference.cell_rows().collect();

    for cells in base.cell_rows() {
        let key: Vec<Value> = base_key.iter().map(|&i| cells[i].clone()).collect();
        let mut row = cells.to_vec();
        match index.get(&key) {
            Some(&ref_idx) => {
                let ref_cells = ref_rows[ref_idx];
                row.extend(taken.iter().map(|(_, i)| ref_cells[*i].clone()));
            }
            None => {
                unmatched += 1;
                if reported.insert(key.clone()) {
                    warn!(
                        "no reference row for key {} ({} unmatched so far)",
                        describe_key(&key),
                        unmatched
                    );
                }
                row.extend(taken.iter().map(|_| Value::Null));
            }
        }
        out.push_row(row);
    }

    Ok(EnrichReport { table: out, unmatched })
}

fn describe_key(key: &[Value]) -> String {
    key.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Table {
        let mut t = Table::new(vec!["ORIGIN".into(), "AIRCRAFT_TYPE".into()]);
        t.push_row(vec![Value::Str("JFK".into()), Value::Str("612".into())]);
        t.push_row(vec![Value::Str("LAX".into()), Value::Str("622".into())]);
        t.push_row(vec![Value::Str("ORD".into()), Value::Str("999".into())]);
        t
    }

    fn reference() -> Table {
        let mut t = Table::new(vec!["AIRCRAFT_TYPE".into(), "DESCRIPTION".into()]);
        t.push_row(vec![
            Value::Str("612".into()),
            Value::Str("Boeing 737-800".into()),
        ]);
        t.push_row(vec![
            Value::Str("622".into()),
            Value::Str("Boeing 757-200".into()),
        ]);
        t
    }

    #[test]
    fn left_join_keeps_every_base_row() {
        let report = enrich(&base(), &reference(), &["AIRCRAFT_TYPE"], None).unwrap();
        assert_eq!(report.table.len(), 3);
        assert_eq!(report.unmatched, 1);
        assert_eq!(
            report.table.row(0).get("DESCRIPTION"),
            Some(&Value::Str("Boeing 737-800".into()))
        );
        assert_eq!(report.table.row(2).get("DESCRIPTION"), Some(&Value::Null));
    }

    #[test]
    fn duplicate_reference_key_is_fatal() {
        let mut dup = reference();
        dup.push_row(vec![
            Value::Str("612".into()),
            Value::Str("Boeing 737-800 (pax)".into()),
        ]);
        let err = enrich(&base(), &dup, &["AIRCRAFT_TYPE"], None).unwrap_err();
        match err {
            EtlError::AmbiguousReference { key } => assert_eq!(key, "612"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn base_columns_win_on_name_collision() {
        // reference repeats the ORIGIN name; the base values must survive
        let mut r = Table::new(vec!["AIRCRAFT_TYPE".into(), "ORIGIN".into()]);
        r.push_row(vec![Value::Str("612".into()), Value::Str("XXX".into())]);
        let report = enrich(&base(), &r, &["AIRCRAFT_TYPE"], None).unwrap();
        assert_eq!(report.table.columns(), ["ORIGIN", "AIRCRAFT_TYPE"]);
        assert_eq!(report.table.row(0).get("ORIGIN"), Some(&Value::Str("JFK".into())));
    }

    #[test]
    fn take_list_restricts_added_columns() {
        let mut r = Table::new(vec![
            "AIRCRAFT_TYPE".into(),
            "DESCRIPTION".into(),
            "SEATS".into(),
        ]);
        r.push_row(vec![
            Value::Str("612".into()),
            Value::Str("Boeing 737-800".into()),
            Value::Int(172),
        ]);
        let report =
            enrich(&base(), &r, &["AIRCRAFT_TYPE"], Some(&["DESCRIPTION"])).unwrap();
        assert!(report.table.has_column("DESCRIPTION"));
        assert!(!report.table.has_column("SEATS"));
    }
}
