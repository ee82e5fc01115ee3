use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::common::error::{EtlError, Result};
use crate::positions::client::{PositionFilters, PositionSource};
use crate::positions::rate_limiter::RateLimiter;
use crate::table::columns;

/// A batched historical-position query: routes are sliced into chunks, and
/// each chunk is queried once per snapshot timestamp across the window.
#[derive(Debug, Clone)]
pub struct BatchQueryOptions {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval_seconds: i64,
    pub routes: Vec<String>,
    pub batch_size: usize,
    pub requests_per_minute: u32,
    pub dedupe: bool,
    pub filters: PositionFilters,
}

impl BatchQueryOptions {
    pub fn validate(&self) -> Result<()> {
        if self.routes.is_empty() {
            return Err(EtlError::Config("at least one route is required".into()));
        }
        if self.batch_size == 0 {
            return Err(EtlError::Config("batch size must be at least 1".into()));
        }
        if self.interval_seconds <= 0 {
            return Err(EtlError::Config("query interval must be positive".into()));
        }
        if self.end < self.start {
            return Err(EtlError::Config("query window end precedes its start".into()));
        }
        Ok(())
    }

    fn timestamps(&self) -> Vec<i64> {
        let mut stamps = Vec::new();
        let mut current = self.start.timestamp();
        let end = self.end.timestamp();
        while current <= end {
            stamps.push(current);
            current += self.interval_seconds;
        }
        stamps
    }
}

/// Run the batched query against `source`, concatenating every chunk's
/// records in query order.
pub async fn fetch_position_batches(
    source: &dyn PositionSource,
    options: &BatchQueryOptions,
) -> Result<Vec<JsonValue>> {
    options.validate()?;

    let timestamps = options.timestamps();
    let total_batches = (options.routes.len() + options.batch_size - 1) / options.batch_size;
    let limiter = RateLimiter::per_minute(options.requests_per_minute);
    let mut records = Vec::new();

    for (index, chunk) in options.routes.chunks(options.batch_size).enumerate() {
        let mut filters = options.filters.clone();
        filters.routes = Some(chunk.join(","));
        info!(
            "batch {}/{}: {} routes, {} snapshots",
            index + 1,
            total_batches,
            chunk.len(),
            timestamps.len()
        );
        let batch_start = records.len();
        for &timestamp in &timestamps {
            limiter.acquire().await;
            records.extend(source.positions_at(timestamp, &filters).await?);
        }
        info!("batch {}: +{} records", index + 1, records.len() - batch_start);
    }

    if options.dedupe {
        let before = records.len();
        records = dedupe_by_id_and_timestamp(records);
        info!("position dedup: {} -> {}", before, records.len());
    }
    Ok(records)
}

/// Drop repeated (fr24_id, timestamp) records, first occurrence wins.
pub fn dedupe_by_id_and_timestamp(records: Vec<JsonValue>) -> Vec<JsonValue> {
    let mut seen: HashSet<(Option<String>, Option<String>)> = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let key = (
                record.get("fr24_id").map(JsonValue::to_string),
                record.get("timestamp").map(JsonValue::to_string),
            );
            seen.insert(key)
        })
        .collect()
}

/// Write the collected records to one JSON file.
pub fn write_json(records: &[JsonValue], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, records)?;
    info!("saved {} records to {}", records.len(), path.display());
    Ok(())
}

/// Every ordered hub pair, the default route set for the AA position query.
pub fn default_hub_routes() -> Vec<String> {
    let hubs = columns::DEFAULT_HUB_AIRPORTS;
    let mut routes = Vec::with_capacity(hubs.len() * (hubs.len() - 1));
    for origin in hubs {
        for dest in hubs {
            if origin != dest {
                routes.push(format!("{}-{}", origin, dest));
            }
        }
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingSource {
        calls: Mutex<Vec<(i64, Option<String>)>>,
    }

    #[async_trait]
    impl PositionSource for RecordingSource {
        async fn positions_at(
            &self,
            timestamp: i64,
            filters: &PositionFilters,
        ) -> Result<Vec<JsonValue>> {
            self.calls
                .lock()
                .unwrap()
                .push((timestamp, filters.routes.clone()));
            Ok(vec![json!({"fr24_id": "abc", "timestamp": timestamp})])
        }
    }

    fn options(routes: Vec<String>) -> BatchQueryOptions {
        BatchQueryOptions {
            start: DateTime::from_timestamp(0, 0).unwrap(),
            end: DateTime::from_timestamp(3600, 0).unwrap(),
            interval_seconds: 1800,
            routes,
            batch_size: 2,
            requests_per_minute: 6000,
            dedupe: false,
            filters: PositionFilters::default(),
        }
    }

    #[tokio::test]
    async fn chunks_routes_and_steps_timestamps() {
        let source = RecordingSource { calls: Mutex::new(Vec::new()) };
        let routes = vec!["JFK-LAX".into(), "LAX-JFK".into(), "ORD-DFW".into()];
        let records = fetch_position_batches(&source, &options(routes)).await.unwrap();

        let calls = source.calls.lock().unwrap();
        // 2 chunks x 3 snapshots (0, 1800, 3600)
        assert_eq!(calls.len(), 6);
        assert_eq!(calls[0], (0, Some("JFK-LAX,LAX-JFK".into())));
        assert_eq!(calls[5], (3600, Some("ORD-DFW".into())));
        assert_eq!(records.len(), 6);
    }

    #[tokio::test]
    async fn dedupe_drops_repeated_id_timestamp_pairs() {
        let source = RecordingSource { calls: Mutex::new(Vec::new()) };
        let mut opts = options(vec!["JFK-LAX".into(), "LAX-JFK".into(), "ORD-DFW".into()]);
        opts.dedupe = true;
        // every chunk returns the same fr24_id per timestamp, so only one
        // record per snapshot survives
        let records = fetch_position_batches(&source, &opts).await.unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn empty_route_list_is_rejected() {
        let err = options(vec![]).validate().unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn default_routes_pair_distinct_hubs() {
        let routes = default_hub_routes();
        assert_eq!(routes.len(), 90);
        assert!(routes.contains(&"JFK-LAX".to_string()));
        assert!(!routes.contains(&"JFK-JFK".to_string()));
    }
}
