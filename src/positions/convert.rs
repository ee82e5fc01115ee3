use std::path::Path;

use serde_json::Value as JsonValue;

use crate::common::error::{EtlError, Result};
use crate::pipeline::writer::write_csv;
use crate::table::{Table, Value};

/// Flatten a JSON array of position records into a Table. The schema is the
/// union of record keys in first-seen order; records missing a key get nulls.
pub fn records_to_table(records: &[JsonValue]) -> Result<Table> {
    let objects = records
        .iter()
        .map(|record| {
            record.as_object().ok_or_else(|| EtlError::Api {
                message: "position record is not a JSON object".to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut column_names: Vec<String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !column_names.iter().any(|c| c == key) {
                column_names.push(key.clone());
            }
        }
    }

    let mut table = Table::new(column_names);
    for object in &objects {
        let row = table
            .columns()
            .iter()
            .map(|c| object.get(c).map_or(Value::Null, json_to_value))
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Str(b.to_string()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => Value::Str(s.clone()),
        // nested structures are rare in position payloads, keep them readable
        other => Value::Str(other.to_string()),
    }
}

/// Convert a JSON position dump to CSV. Returns the row count written.
pub fn json_file_to_csv(input: &Path, out: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(input)?;
    let records: Vec<JsonValue> = serde_json::from_str(&text)?;
    let table = records_to_table(&records)?;
    write_csv(&table, out)?;
    Ok(table.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_is_the_key_union_in_first_seen_order() {
        let records = vec![
            json!({"fr24_id": "a1", "lat": 40.6, "lon": -73.7}),
            json!({"fr24_id": "b2", "alt": 35000, "lat": 33.9}),
        ];
        let table = records_to_table(&records).unwrap();
        assert_eq!(table.columns(), ["fr24_id", "lat", "lon", "alt"]);
        assert_eq!(table.row(0).get("alt"), Some(&Value::Null));
        assert_eq!(table.row(1).get("alt"), Some(&Value::Int(35000)));
    }

    #[test]
    fn non_object_records_are_rejected() {
        let err = records_to_table(&[json!([1, 2, 3])]).unwrap_err();
        assert!(matches!(err, EtlError::Api { .. }));
    }
}
