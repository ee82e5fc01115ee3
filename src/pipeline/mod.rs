pub mod aircraft;
pub mod dedupe;
pub mod enrich;
pub mod filter;
pub mod loader;
pub mod orchestrator;
pub mod project;
pub mod writer;

pub use orchestrator::{
    run_final_merge, run_t100_merge, FinalMergeOptions, MergeOptions, MergeSummary,
};
