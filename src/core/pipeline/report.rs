//! Output types of a batch run: scan results and the failure report.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::dedup::CanonicalAddress;
use crate::core::geocode::{Coordinates, Resolution};
use crate::core::photo::PhotoId;
use crate::error::{GeocodeError, SkipReason};

/// One deduplicated, geocode-verified address, ready for display,
/// mapping or persistence. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub id: Uuid,
    pub road_address: String,
    pub jibun_address: String,
    /// Number of distinct photos this address appeared in.
    pub duplicate_count: usize,
    /// Contributing photos, first-seen order.
    pub source_photo_ids: Vec<PhotoId>,
    pub resolution: Resolution,
}

impl ScanResult {
    pub(crate) fn from_canonical(address: CanonicalAddress, resolution: Resolution) -> Self {
        Self {
            id: Uuid::new_v4(),
            road_address: address.road_address,
            jibun_address: address.jibun_address,
            duplicate_count: address.duplicate_count,
            source_photo_ids: address.source_photo_ids,
            resolution,
        }
    }

    /// Road-form when present, lot-form otherwise.
    pub fn display_address(&self) -> &str {
        if self.road_address.trim().is_empty() {
            &self.jibun_address
        } else {
            &self.road_address
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.resolution.coordinates()
    }

    pub fn is_verified(&self) -> bool {
        self.resolution.is_verified()
    }
}

/// A photo dropped from the batch, with its reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPhoto {
    pub photo_id: PhotoId,
    pub reason: SkipReason,
}

/// A photo accepted despite a quality score in the warning band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityWarning {
    pub photo_id: PhotoId,
    pub confidence: f64,
}

/// An address that failed every geocode attempt. It still appears in the
/// result list as unverified; this entry records why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedAddress {
    pub display_address: String,
    pub reason: GeocodeError,
}

/// Per-batch accounting of everything that did not go cleanly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Photos that completed all per-photo stages.
    pub photos_processed: usize,
    /// Photos dropped, each with its reason.
    pub photos_skipped: Vec<SkippedPhoto>,
    /// Photos accepted with a quality warning.
    pub quality_warnings: Vec<QualityWarning>,
    /// Addresses kept without coordinates, each with its reason.
    pub unresolved: Vec<UnresolvedAddress>,
    /// True when a cancellation signal cut the run short.
    pub cancelled: bool,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Everything a batch run produces.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Scan results in first-seen canonical-address order.
    pub results: Vec<ScanResult>,
    pub report: BatchReport,
}
