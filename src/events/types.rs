//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

use crate::core::photo::PhotoId;
use crate::core::quality::QualityStatus;
use crate::error::{GeocodeError, SkipReason};

/// All events emitted by the scan pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Per-photo stage events
    Photo(PhotoEvent),
    /// Deduplication phase events
    Dedup(DedupEvent),
    /// Geocode verification events
    Geocode(GeocodeEvent),
    /// Batch-level events
    Pipeline(PipelineEvent),
}

/// Events for one photo's trip through the per-photo stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PhotoEvent {
    /// Processing started for a photo
    Started { photo_id: PhotoId },
    /// The quality gate scored the photo
    QualityChecked {
        photo_id: PhotoId,
        confidence: f64,
        status: QualityStatus,
    },
    /// Text and tables were recognized
    Recognized {
        photo_id: PhotoId,
        text_blocks: usize,
        tables: usize,
    },
    /// Address candidates were extracted
    CandidatesExtracted { photo_id: PhotoId, count: usize },
    /// The photo was dropped; the batch continues
    Skipped { photo_id: PhotoId, reason: SkipReason },
    /// The photo finished all per-photo stages
    Completed { photo_id: PhotoId },
}

/// Events during the deduplication phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DedupEvent {
    /// Deduplication started over the whole batch's candidates
    Started { total_candidates: usize },
    /// Deduplication completed
    Completed { canonical_addresses: usize },
}

/// Events during geocode verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GeocodeEvent {
    /// Verification started
    Started { total_addresses: usize },
    /// An address resolved to coordinates
    Resolved { display_address: String },
    /// An address failed all geocode attempts; it stays in the output
    Unverified {
        display_address: String,
        reason: GeocodeError,
    },
    /// Verification completed
    Completed { verified: usize, unverified: usize },
}

/// Batch-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// The batch started
    Started { total_photos: usize },
    /// Moving to a new phase
    PhaseChanged { phase: BatchPhase },
    /// The batch completed
    Completed { summary: BatchSummary },
    /// The batch was cancelled
    Cancelled,
}

/// Phases of a batch run.
///
/// `Barrier` is announced once every photo has finished or failed and the
/// batch-wide phases are about to begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchPhase {
    Collecting,
    Barrier,
    Deduplicating,
    Geocoding,
}

impl std::fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchPhase::Collecting => write!(f, "Collecting"),
            BatchPhase::Barrier => write!(f, "Barrier"),
            BatchPhase::Deduplicating => write!(f, "Deduplicating"),
            BatchPhase::Geocoding => write!(f, "Geocoding"),
        }
    }
}

/// Summary of a completed batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Photos supplied to the batch
    pub total_photos: usize,
    /// Photos that completed all per-photo stages
    pub photos_processed: usize,
    /// Photos dropped with a recorded reason
    pub photos_skipped: usize,
    /// Canonical addresses after deduplication
    pub canonical_addresses: usize,
    /// Addresses resolved to coordinates
    pub verified: usize,
    /// Addresses kept without coordinates
    pub unverified: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}
