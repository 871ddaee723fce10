//! # Quality Gate Module
//!
//! Scores a captured photo for usability before it enters the pipeline.
//! The score is a *smudge confidence* in `[0, 1]`: how likely the frame is
//! blurred or shot through a smudged lens. The gate is advisory - only a
//! score above the reject threshold drops the photo.
//!
//! The default backend uses Laplacian variance for blur detection; any
//! other scorer can be injected through [`QualityBackend`].

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::core::photo::CapturedPhoto;

pub use crate::error::QualityError;

/// Capability boundary for photo quality scoring.
///
/// Returns smudge confidence in `[0, 1]`; higher means more likely unusable.
pub trait QualityBackend: Send + Sync {
    fn assess(&self, photo: &CapturedPhoto) -> Result<f64, QualityError>;
}

/// Outcome band of the quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityStatus {
    /// Confidence below the warning band - photo accepted.
    Ok,
    /// Confidence in the warning band - photo accepted with an annotation.
    Warning,
    /// Confidence above the reject threshold - photo dropped.
    Rejected,
}

/// Result of gating one photo. Produced once, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Smudge confidence in `[0, 1]`.
    pub confidence: f64,
    pub status: QualityStatus,
}

/// Thresholds for the quality gate bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityGateConfig {
    /// Confidence above this (and at or below reject) accepts with a warning.
    pub warn_threshold: f64,
    /// Confidence above this rejects the photo.
    pub reject_threshold: f64,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            warn_threshold: 0.5,
            reject_threshold: 0.8,
        }
    }
}

/// Applies the gate policy to a backend's raw confidence score.
#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    config: QualityGateConfig,
}

impl QualityGate {
    pub fn new(config: QualityGateConfig) -> Self {
        Self { config }
    }

    /// Score the photo and classify it into a gate band.
    ///
    /// Backend scores outside `[0, 1]` are clamped rather than rejected.
    pub fn evaluate(
        &self,
        backend: &dyn QualityBackend,
        photo: &CapturedPhoto,
    ) -> Result<QualityAssessment, QualityError> {
        let confidence = backend.assess(photo)?.clamp(0.0, 1.0);

        let status = if confidence > self.config.reject_threshold {
            QualityStatus::Rejected
        } else if confidence > self.config.warn_threshold {
            QualityStatus::Warning
        } else {
            QualityStatus::Ok
        };

        Ok(QualityAssessment { confidence, status })
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(QualityGateConfig::default())
    }
}

/// Laplacian variance at which a frame is considered fully sharp.
/// Variance at or above this maps to smudge confidence 0.
const SHARP_VARIANCE: f64 = 500.0;

/// Blur-based quality backend using Laplacian variance.
///
/// Sharp images have well-defined edges and high variance in the Laplacian
/// output; a smudged lens flattens edges and drives the variance toward
/// zero. The photo is downscaled before analysis to keep this cheap.
pub struct LaplacianQualityBackend {
    /// Size to resize images before analysis (smaller = faster)
    analysis_size: u32,
}

impl Default for LaplacianQualityBackend {
    fn default() -> Self {
        Self { analysis_size: 512 }
    }
}

impl LaplacianQualityBackend {
    pub fn new(analysis_size: u32) -> Self {
        Self { analysis_size }
    }

    /// Compute Laplacian variance as a measure of sharpness.
    fn laplacian_variance(gray: &GrayImage) -> f64 {
        let (width, height) = gray.dimensions();

        if width < 3 || height < 3 {
            return 0.0;
        }

        // Laplacian kernel: [0, 1, 0; 1, -4, 1; 0, 1, 0]
        let mut values: Vec<f64> = Vec::with_capacity((width * height) as usize);

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let center = gray.get_pixel(x, y)[0] as f64;
                let top = gray.get_pixel(x, y - 1)[0] as f64;
                let bottom = gray.get_pixel(x, y + 1)[0] as f64;
                let left = gray.get_pixel(x - 1, y)[0] as f64;
                let right = gray.get_pixel(x + 1, y)[0] as f64;

                values.push(top + bottom + left + right - 4.0 * center);
            }
        }

        if values.is_empty() {
            return 0.0;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n
    }
}

impl QualityBackend for LaplacianQualityBackend {
    fn assess(&self, photo: &CapturedPhoto) -> Result<f64, QualityError> {
        let image = image::load_from_memory(&photo.bytes).map_err(|e| QualityError::Decode {
            reason: e.to_string(),
        })?;

        // Downscale large frames for faster analysis; never upscale.
        let image = if image.width() > self.analysis_size || image.height() > self.analysis_size {
            image.resize(
                self.analysis_size,
                self.analysis_size,
                image::imageops::FilterType::Triangle,
            )
        } else {
            image
        };
        let gray = image.to_luma8();

        let variance = Self::laplacian_variance(&gray);
        let confidence = (1.0 - variance / SHARP_VARIANCE).clamp(0.0, 1.0);

        Ok(confidence)
    }
}
