//! # Recognizer Module
//!
//! Capability boundary for optical text and table recognition.
//!
//! The pipeline never talks to a concrete OCR engine directly; it takes a
//! [`RecognitionBackend`] and works with the structured output. Tests and
//! hosts without a real engine use [`FixedRecognizer`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::photo::{CapturedPhoto, PhotoId};
use crate::error::RecognitionError;

/// One contiguous run of recognized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f64,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A recognized table as rows of cell text, in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }
}

/// Structured output of recognizing one accepted photo.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecognizedDocument {
    pub text_blocks: Vec<TextBlock>,
    pub tables: Vec<Table>,
}

impl RecognizedDocument {
    pub fn is_empty(&self) -> bool {
        self.text_blocks.is_empty() && self.tables.is_empty()
    }
}

/// Capability boundary for the optical recognition engine.
pub trait RecognitionBackend: Send + Sync {
    fn recognize(&self, photo: &CapturedPhoto) -> Result<RecognizedDocument, RecognitionError>;
}

/// Deterministic in-memory recognizer keyed by photo id.
///
/// Photos without a scripted outcome fail with `DocumentNotDetected`,
/// which mirrors what a real engine does when handed an unknown frame.
#[derive(Default)]
pub struct FixedRecognizer {
    outcomes: HashMap<PhotoId, Result<RecognizedDocument, RecognitionError>>,
}

impl FixedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful recognition for a photo id.
    pub fn with_document(mut self, id: impl Into<PhotoId>, document: RecognizedDocument) -> Self {
        self.outcomes.insert(id.into(), Ok(document));
        self
    }

    /// Script plain text blocks for a photo id, each at full confidence.
    pub fn with_text(self, id: impl Into<PhotoId>, lines: &[&str]) -> Self {
        let document = RecognizedDocument {
            text_blocks: lines.iter().map(|line| TextBlock::new(*line, 1.0)).collect(),
            tables: Vec::new(),
        };
        self.with_document(id, document)
    }

    /// Script a recognition failure for a photo id.
    pub fn with_failure(mut self, id: impl Into<PhotoId>, error: RecognitionError) -> Self {
        self.outcomes.insert(id.into(), Err(error));
        self
    }
}

impl RecognitionBackend for FixedRecognizer {
    fn recognize(&self, photo: &CapturedPhoto) -> Result<RecognizedDocument, RecognitionError> {
        self.outcomes
            .get(&photo.id)
            .cloned()
            .unwrap_or(Err(RecognitionError::DocumentNotDetected))
    }
}
