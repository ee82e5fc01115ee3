pub mod columns;
pub mod value;

pub use value::Value;

use crate::common::error::{EtlError, Result};

/// An ordered list of named columns and the rows sharing that schema.
///
/// Every row holds exactly one cell per declared column; missing values are
/// `Value::Null`, never omitted. Stages never mutate their input table, they
/// build a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Resolve each name to its column index, failing on the first absent one.
    /// Stages call this before touching any row so a bad column list can never
    /// fail mid-stream.
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S], context: &str) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.column_index(name.as_ref()).ok_or_else(|| EtlError::MissingColumn {
                    column: name.as_ref().to_string(),
                    context: context.to_string(),
                })
            })
            .collect()
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn row(&self, index: usize) -> Row<'_> {
        Row { columns: &self.columns, cells: &self.rows[index] }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row { columns: &self.columns, cells })
    }

    /// Raw cell access for stages that work by column index.
    pub fn cell_rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(|r| r.as_slice())
    }
}

/// Borrowed view of one row, resolving cells by column name.
#[derive(Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    cells: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.columns.iter().position(|c| c == name).map(|i| &self.cells[i])
    }

    pub fn cells(&self) -> &'a [Value] {
        self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new(vec!["YEAR".into(), "ORIGIN".into()]);
        t.push_row(vec![Value::Int(2023), Value::Str("JFK".into())]);
        t.push_row(vec![Value::Null, Value::Str("LAX".into())]);
        t
    }

    #[test]
    fn row_lookup_by_name() {
        let t = sample();
        assert_eq!(t.row(0).get("ORIGIN"), Some(&Value::Str("JFK".into())));
        assert_eq!(t.row(1).get("YEAR"), Some(&Value::Null));
        assert_eq!(t.row(0).get("DEST"), None);
    }

    #[test]
    fn require_columns_names_the_missing_one() {
        let t = sample();
        let err = t.require_columns(&["YEAR", "DEST"], "dedup key").unwrap_err();
        match err {
            EtlError::MissingColumn { column, context } => {
                assert_eq!(column, "DEST");
                assert_eq!(context, "dedup key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
