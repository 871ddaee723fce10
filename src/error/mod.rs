//! # Error Module
//!
//! Error types for the address scan pipeline, split by blast radius.
//!
//! ## Design Principles
//! - **Photo-level** failures skip one photo; the batch continues
//! - **Address-level** failures keep the address, marked unresolved
//! - **Batch-level** failures are the only ones returned as `Err`
//! - Nothing is silently dropped - every skip and failure carries its reason

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error for the scan pipeline.
///
/// Only batch-level conditions surface here. Per-photo and per-address
/// failures are recorded in the [`BatchReport`](crate::core::pipeline::BatchReport)
/// instead of aborting the run.
#[derive(Error, Debug)]
pub enum AddressScanError {
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Conditions that abort an entire batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("No photos supplied to the batch")]
    EmptyBatch,

    #[error("Batch was cancelled")]
    Cancelled,
}

/// Failures reported by a recognition backend for a single photo.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecognitionError {
    #[error("No document detected in the photo")]
    DocumentNotDetected,

    #[error("Vision processing failed: {0}")]
    ProcessingFailed(String),

    #[error("No text found in the document")]
    NoTextFound,
}

/// Failures reported by a quality backend for a single photo.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QualityError {
    #[error("Failed to decode photo bytes: {reason}")]
    Decode { reason: String },

    #[error("Quality backend failed: {0}")]
    Backend(String),
}

/// Failures reported by a geocode backend for a single query.
///
/// These never abort the batch; an address whose every query fails still
/// appears in the output as unverified, carrying the failure reason.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeocodeError {
    #[error("No results for the address query")]
    NoResults,

    #[error("Geocode service returned status {code}: {message}")]
    InvalidStatus { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

/// Why a photo was dropped from the batch.
///
/// Recorded in the batch report so the caller can show the user exactly
/// which photos contributed nothing and why.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    #[error("Lens smudge check failed (smudge confidence {confidence:.2})")]
    LensSmudgeCheckFailed { confidence: f64 },

    #[error("Quality assessment unavailable: {reason}")]
    QualityUnavailable { reason: String },

    #[error("No document detected")]
    DocumentNotDetected,

    #[error("Vision processing failed: {reason}")]
    VisionProcessingFailed { reason: String },

    #[error("No text found")]
    NoTextFound,

    #[error("Cancelled before processing started")]
    Cancelled,
}

impl From<RecognitionError> for SkipReason {
    fn from(error: RecognitionError) -> Self {
        match error {
            RecognitionError::DocumentNotDetected => SkipReason::DocumentNotDetected,
            RecognitionError::ProcessingFailed(reason) => {
                SkipReason::VisionProcessingFailed { reason }
            }
            RecognitionError::NoTextFound => SkipReason::NoTextFound,
        }
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, AddressScanError>;
