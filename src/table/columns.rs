//! Canonical column names for the DOT extracts and the synonym lists used to
//! resolve them across years of carrier summaries.

pub const UNIQUE_CARRIER: &str = "UNIQUE_CARRIER";
pub const ORIGIN: &str = "ORIGIN";
pub const DEST: &str = "DEST";
pub const YEAR: &str = "YEAR";
pub const MONTH: &str = "MONTH";
pub const AIRCRAFT_TYPE: &str = "AIRCRAFT_TYPE";
pub const DESCRIPTION: &str = "DESCRIPTION";
pub const FL_DATE: &str = "FL_DATE";

pub const CARRIER_CANDIDATES: &[&str] = &[
    "UNIQUE_CARRIER",
    "OP_UNIQUE_CARRIER",
    "MKT_UNIQUE_CARRIER",
    "REPORTING_AIRLINE",
    "CARRIER",
];
pub const ORIGIN_CANDIDATES: &[&str] = &["ORIGIN", "ORIGIN_AIRPORT", "ORIGIN_AIRPORT_ID"];
pub const DEST_CANDIDATES: &[&str] = &["DEST", "DEST_AIRPORT", "DEST_AIRPORT_ID"];
pub const YEAR_CANDIDATES: &[&str] = &["YEAR", "FLIGHT_YEAR"];
pub const MONTH_CANDIDATES: &[&str] = &["MONTH", "MONTH_NUM"];
pub const AIRCRAFT_CANDIDATES: &[&str] = &[
    "AIRCRAFT_TYPE",
    "AIRCRAFT_CONFIG",
    "AIRCRAFT_GROUP",
    "AIRCRAFT_TYPE_CODE",
];

/// The ten AA hub airports used as the default endpoint filter.
pub const DEFAULT_HUB_AIRPORTS: [&str; 10] = [
    "DFW", "LGA", "JFK", "PHL", "DCA", "CLT", "MIA", "ORD", "PHX", "LAX",
];

/// First candidate present in `columns`, compared case-insensitively.
/// Returns the column's actual name as spelled in the input.
pub fn pick_column<'a>(columns: &'a [String], candidates: &[&str]) -> Option<&'a str> {
    pick_column_index(columns, candidates).map(|i| columns[i].as_str())
}

/// Index form of [`pick_column`].
pub fn pick_column_index(columns: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|cand| columns.iter().position(|c| c.eq_ignore_ascii_case(cand)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_column_prefers_earlier_candidates() {
        let cols = vec!["OP_UNIQUE_CARRIER".to_string(), "CARRIER".to_string()];
        assert_eq!(pick_column(&cols, CARRIER_CANDIDATES), Some("OP_UNIQUE_CARRIER"));
    }

    #[test]
    fn pick_column_is_case_insensitive() {
        let cols = vec!["origin".to_string()];
        assert_eq!(pick_column(&cols, ORIGIN_CANDIDATES), Some("origin"));
        assert_eq!(pick_column(&cols, DEST_CANDIDATES), None);
    }
}
