//! Input types supplied by the capture subsystem.
//!
//! The pipeline borrows photos read-only; it never stores or mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a captured photo, assigned by the capture subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhotoId(String);

impl PhotoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PhotoId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A document photograph handed to the pipeline by the capture subsystem.
///
/// Immutable once constructed. The raw bytes are whatever encoded form the
/// camera produced; decoding is the concern of the backends that need pixels.
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    pub id: PhotoId,
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
    /// Small preview rendered by the capture UI, if one exists.
    pub thumbnail: Option<Vec<u8>>,
}

impl CapturedPhoto {
    /// Create a photo captured now, without a thumbnail.
    pub fn new(id: impl Into<PhotoId>, bytes: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            bytes,
            captured_at: Utc::now(),
            thumbnail: None,
        }
    }

    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: Vec<u8>) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }
}

impl From<String> for PhotoId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_id_displays_raw_value() {
        let id = PhotoId::new("IMG_0042");
        assert_eq!(id.to_string(), "IMG_0042");
        assert_eq!(id.as_str(), "IMG_0042");
    }

    #[test]
    fn photo_defaults_to_no_thumbnail() {
        let photo = CapturedPhoto::new("p1", vec![1, 2, 3]);
        assert!(photo.thumbnail.is_none());
        assert_eq!(photo.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn thumbnail_builder_attaches_bytes() {
        let photo = CapturedPhoto::new("p1", vec![]).with_thumbnail(vec![9]);
        assert_eq!(photo.thumbnail, Some(vec![9]));
    }
}
