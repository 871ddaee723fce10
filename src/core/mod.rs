//! # Core Module
//!
//! The host-agnostic address scan engine.
//!
//! ## Modules
//! - `photo` - input types supplied by the capture subsystem
//! - `quality` - scores photos for usability before processing
//! - `recognizer` - optical text/table recognition capability boundary
//! - `extractor` - parses recognized text into address candidates
//! - `dedup` - merges candidates into canonical addresses with provenance
//! - `geocode` - resolves canonical addresses to coordinates
//! - `pipeline` - orchestrates the full workflow

pub mod dedup;
pub mod extractor;
pub mod geocode;
pub mod photo;
pub mod pipeline;
pub mod quality;
pub mod recognizer;

// Re-export commonly used types
pub use dedup::{CanonicalAddress, Deduplicator, NormalizationPolicy};
pub use extractor::{AddressCandidate, AddressExtractor};
pub use geocode::{Coordinates, GeocodeBackend, GeocodeVerifier, QueryForm, Resolution};
pub use photo::{CapturedPhoto, PhotoId};
pub use pipeline::{BatchOutcome, BatchReport, CancellationToken, ScanPipeline, ScanResult};
pub use quality::{QualityAssessment, QualityBackend, QualityStatus};
pub use recognizer::{RecognitionBackend, RecognizedDocument, Table, TextBlock};
