//! # Address Scan
//!
//! Turns a batch of captured document photographs into a deduplicated,
//! geocoded list of candidate addresses.
//!
//! ## Core Philosophy
//! - **One bad photo never aborts the batch** - failures are recorded, not thrown
//! - **Nothing is silently dropped** - every skip and unresolved address carries its reason
//! - **Deterministic output** - result order never depends on task timing
//!
//! ## Architecture
//! The library is a host-agnostic engine with injected capabilities:
//! - `core` - the scan pipeline (quality gate, recognition, extraction,
//!   deduplication, geocode verification, orchestration)
//! - `events` - event-driven progress reporting
//! - `error` - failure taxonomy split by blast radius
//!
//! Recognition, geocoding and quality scoring are capability traits; the
//! host injects real backends, tests inject deterministic fakes.

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{AddressScanError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point, never by the
/// library itself.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
