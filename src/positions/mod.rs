pub mod batch;
pub mod client;
pub mod convert;
pub mod rate_limiter;

pub use batch::{default_hub_routes, fetch_position_batches, write_json, BatchQueryOptions};
pub use client::{Fr24Client, PositionFilters, PositionSource};
