//! # Address Extractor Module
//!
//! Parses recognized text and tables into per-photo address candidates.
//!
//! Korean documents carry two parallel address systems: road-form
//! (도로명주소, "테헤란로 1") and lot-form (지번주소, "역삼동 123-45").
//! Both are preserved separately because the geocode verifier uses the
//! lot-form as a fallback query.
//!
//! Two heuristics run per document:
//! 1. **Field labels** in table rows (주소, 도로명주소, 지번, 소재지)
//!    paired with the immediately following cell.
//! 2. **Pattern matching** over free text blocks.
//!
//! Duplicates within one photo are compacted before the candidates leave
//! this stage.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::recognizer::{RecognizedDocument, Table};

/// An address extracted from one photo. Ephemeral; consumed by deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressCandidate {
    /// Road-form address, empty when the document only carries a lot-form.
    pub road_address: String,
    /// Lot-form (jibun) address, empty when absent.
    pub jibun_address: String,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f64,
}

impl AddressCandidate {
    pub fn has_address(&self) -> bool {
        !self.road_address.trim().is_empty() || !self.jibun_address.trim().is_empty()
    }
}

/// Confidence assigned to candidates found next to an explicit field label.
const LABELED_CONFIDENCE: f64 = 0.95;

/// Road-form address: optional province/city prefix, district parts, then a
/// road name ending in 대로/로/길 followed by a building number.
const ROAD_PATTERN: &str = r"(?:[가-힣]{2,}(?:특별시|광역시|특별자치시|특별자치도|시|도)\s+)?(?:[가-힣]+(?:시|군|구|읍|면)\s+)*[0-9A-Za-z가-힣·]+(?:대로|로|길)\s*\d+(?:-\d+)?";

/// Lot-form address: optional region prefix, a neighbourhood ending in
/// 동/리/가, then a lot number (optionally 산-prefixed or 번지-suffixed).
const JIBUN_PATTERN: &str = r"(?:[가-힣]{2,}(?:특별시|광역시|특별자치시|특별자치도|시|도)\s+)?(?:[가-힣]+(?:시|군|구|읍|면)\s+)*[가-힣]+(?:동|리|가)\s+(?:산\s*)?\d+(?:-\d+)?(?:번지)?";

enum LabelKind {
    Road,
    Jibun,
    /// A bare 주소/소재지 label; the value's form is decided by pattern match.
    Generic,
}

fn label_kind(cell: &str) -> Option<LabelKind> {
    let label = cell.trim().trim_end_matches(':').trim();
    match label {
        "도로명주소" | "도로명" => Some(LabelKind::Road),
        "지번주소" | "지번" => Some(LabelKind::Jibun),
        "주소" | "소재지" => Some(LabelKind::Generic),
        _ => None,
    }
}

/// Extracts address candidates from recognized documents.
pub struct AddressExtractor {
    road_pattern: Regex,
    jibun_pattern: Regex,
}

impl AddressExtractor {
    pub fn new() -> Self {
        Self {
            // Both patterns are compile-time constants; a failure here is a
            // programming error, caught by the tests below.
            road_pattern: Regex::new(ROAD_PATTERN).expect("road address pattern is valid"),
            jibun_pattern: Regex::new(JIBUN_PATTERN).expect("jibun address pattern is valid"),
        }
    }

    /// Extract every address candidate from one photo's recognized document.
    ///
    /// Zero candidates is a valid outcome, not an error - the photo simply
    /// contributes nothing to the batch.
    pub fn extract(&self, document: &RecognizedDocument) -> Vec<AddressCandidate> {
        let mut candidates = Vec::new();

        for table in &document.tables {
            self.extract_from_table(table, &mut candidates);
        }

        for block in &document.text_blocks {
            self.extract_from_text(&block.text, block.confidence, &mut candidates);
        }

        compact(candidates)
    }

    /// Pull labelled values out of table rows.
    ///
    /// A value is the cell immediately following its label; rows holding
    /// both a road and a jibun label produce a single paired candidate.
    fn extract_from_table(&self, table: &Table, out: &mut Vec<AddressCandidate>) {
        for row in &table.rows {
            let mut road = None;
            let mut jibun = None;

            for (index, cell) in row.iter().enumerate() {
                let Some(kind) = label_kind(cell) else {
                    continue;
                };
                let Some(value) = row.get(index + 1).map(|v| v.trim()) else {
                    continue;
                };
                if value.is_empty() || label_kind(value).is_some() {
                    continue;
                }

                match kind {
                    LabelKind::Road => road = Some(value.to_string()),
                    LabelKind::Jibun => jibun = Some(value.to_string()),
                    LabelKind::Generic => {
                        if self.road_pattern.is_match(value) {
                            road.get_or_insert_with(|| value.to_string());
                        } else if self.jibun_pattern.is_match(value) {
                            jibun.get_or_insert_with(|| value.to_string());
                        } else {
                            // Unclassifiable value under an address label:
                            // keep it as the preferred (road) form.
                            road.get_or_insert_with(|| value.to_string());
                        }
                    }
                }
            }

            if road.is_some() || jibun.is_some() {
                out.push(AddressCandidate {
                    road_address: road.unwrap_or_default(),
                    jibun_address: jibun.unwrap_or_default(),
                    confidence: LABELED_CONFIDENCE,
                });
            }
        }
    }

    /// Scan free text for address-shaped spans.
    fn extract_from_text(&self, text: &str, confidence: f64, out: &mut Vec<AddressCandidate>) {
        for found in self.road_pattern.find_iter(text) {
            out.push(AddressCandidate {
                road_address: found.as_str().trim().to_string(),
                jibun_address: String::new(),
                confidence,
            });
        }
        for found in self.jibun_pattern.find_iter(text) {
            out.push(AddressCandidate {
                road_address: String::new(),
                jibun_address: found.as_str().trim().to_string(),
                confidence,
            });
        }
    }
}

impl Default for AddressExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Compact duplicate candidates within one photo, keeping first-seen order
/// and the highest confidence per distinct (road, jibun) pair.
fn compact(candidates: Vec<AddressCandidate>) -> Vec<AddressCandidate> {
    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    let mut out: Vec<AddressCandidate> = Vec::new();

    for candidate in candidates {
        if !candidate.has_address() {
            continue;
        }

        let key = (
            fold(&candidate.road_address),
            fold(&candidate.jibun_address),
        );
        match seen.get(&key) {
            Some(&index) => {
                if candidate.confidence > out[index].confidence {
                    out[index].confidence = candidate.confidence;
                }
            }
            None => {
                seen.insert(key, out.len());
                out.push(candidate);
            }
        }
    }

    out
}

fn fold(address: &str) -> String {
    address.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
