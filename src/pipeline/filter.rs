use std::collections::HashSet;

use crate::table::{columns, Row, Table};

/// Keep the rows satisfying `pred`, preserving input order.
pub fn filter_rows<F>(table: &Table, pred: F) -> Table
where
    F: Fn(Row<'_>) -> bool,
{
    let mut out = Table::new(table.columns().to_vec());
    for row in table.rows() {
        if pred(row) {
            out.push_row(row.cells().to_vec());
        }
    }
    out
}

/// Carrier filter with an optional endpoint restriction: keep rows operated by
/// one carrier whose origin and destination both fall in the airport set.
///
/// Column names are resolved against the input schema once, through the usual
/// synonym lists. A row whose carrier or endpoint column is missing simply
/// does not match; the filter never fails.
pub struct CarrierFilter {
    carrier: String,
    airports: Option<HashSet<String>>,
    carrier_col: Option<String>,
    origin_col: Option<String>,
    dest_col: Option<String>,
}

impl CarrierFilter {
    pub fn new(table: &Table, carrier: &str, airports: Option<&[String]>) -> Self {
        let cols = table.columns();
        Self {
            carrier: normalize(carrier),
            airports: airports.map(|a| a.iter().map(|s| normalize(s)).collect()),
            carrier_col: columns::pick_column(cols, columns::CARRIER_CANDIDATES).map(String::from),
            origin_col: columns::pick_column(cols, columns::ORIGIN_CANDIDATES).map(String::from),
            dest_col: columns::pick_column(cols, columns::DEST_CANDIDATES).map(String::from),
        }
    }

    pub fn matches(&self, row: Row<'_>) -> bool {
        if !self.cell_equals(row, &self.carrier_col, &self.carrier) {
            return false;
        }
        match &self.airports {
            None => true,
            Some(set) => {
                self.cell_in_set(row, &self.origin_col, set)
                    && self.cell_in_set(row, &self.dest_col, set)
            }
        }
    }

    fn cell_equals(&self, row: Row<'_>, col: &Option<String>, expected: &str) -> bool {
        cell_text(row, col).map_or(false, |v| v == expected)
    }

    fn cell_in_set(&self, row: Row<'_>, col: &Option<String>, set: &HashSet<String>) -> bool {
        cell_text(row, col).map_or(false, |v| set.contains(&v))
    }
}

fn cell_text(row: Row<'_>, col: &Option<String>) -> Option<String> {
    let col = col.as_deref()?;
    let value = row.get(col)?;
    value.as_str().map(normalize)
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn carrier_table() -> Table {
        let mut t = Table::new(vec![
            "UNIQUE_CARRIER".into(),
            "ORIGIN".into(),
            "DEST".into(),
        ]);
        t.push_row(vec![
            Value::Str("AA".into()),
            Value::Str("JFK".into()),
            Value::Str("LAX".into()),
        ]);
        t.push_row(vec![
            Value::Str("DL".into()),
            Value::Str("JFK".into()),
            Value::Str("LAX".into()),
        ]);
        t.push_row(vec![
            Value::Str(" aa ".into()),
            Value::Str("ORD".into()),
            Value::Str("DFW".into()),
        ]);
        t
    }

    #[test]
    fn keeps_only_the_requested_carrier_in_order() {
        let t = carrier_table();
        let f = CarrierFilter::new(&t, "AA", None);
        let out = filter_rows(&t, |r| f.matches(r));
        assert_eq!(out.len(), 2);
        assert_eq!(out.row(0).get("ORIGIN"), Some(&Value::Str("JFK".into())));
        assert_eq!(out.row(1).get("ORIGIN"), Some(&Value::Str("ORD".into())));
    }

    #[test]
    fn airport_set_restricts_both_endpoints() {
        let t = carrier_table();
        let hubs = vec!["JFK".to_string(), "LAX".to_string()];
        let f = CarrierFilter::new(&t, "AA", Some(&hubs));
        let out = filter_rows(&t, |r| f.matches(r));
        assert_eq!(out.len(), 1);
        assert_eq!(out.row(0).get("DEST"), Some(&Value::Str("LAX".into())));
    }

    #[test]
    fn missing_carrier_column_matches_nothing() {
        let mut t = Table::new(vec!["ORIGIN".into()]);
        t.push_row(vec![Value::Str("JFK".into())]);
        let f = CarrierFilter::new(&t, "AA", None);
        let out = filter_rows(&t, |r| f.matches(r));
        assert!(out.is_empty());
    }
}
