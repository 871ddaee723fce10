//! # Pipeline Module
//!
//! Orchestrates the full scan workflow.
//!
//! ## Batch Stages
//! 1. **Collect** - quality gate, recognition and extraction per photo
//! 2. **Barrier** - wait for every photo to finish or fail
//! 3. **Deduplicate** - merge candidates into canonical addresses
//! 4. **Geocode** - verify each canonical address, road form first
//! 5. **Assemble** - results in first-seen order plus the batch report
//!
//! ## Parallelism
//! Per-photo stages run on a rayon pool sized for the CPU; geocode calls
//! run on a separate, smaller pool sized for the external API.

mod executor;
mod report;

pub use executor::{
    CancellationPolicy, CancellationToken, PipelineConfig, ScanPipeline, ScanPipelineBuilder,
};
pub use report::{
    BatchOutcome, BatchReport, QualityWarning, ScanResult, SkippedPhoto, UnresolvedAddress,
};
