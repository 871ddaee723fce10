//! # Deduplicator Module
//!
//! Merges address candidates from the whole batch into canonical addresses
//! with duplicate counts and source-photo provenance.
//!
//! This stage is a fan-in point: it runs once, after every photo has
//! finished or failed, never as a streaming merge. Canonical addresses are
//! emitted in first-seen order (photo order, then candidate order within a
//! photo), which keeps the final result deterministic regardless of how
//! per-photo work was scheduled.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::extractor::AddressCandidate;
use crate::core::photo::PhotoId;

/// How raw address strings are folded before comparison.
///
/// The exact rules are policy, not gospel: documents disagree on spacing,
/// punctuation and building-unit suffixes, and hosts may want to tighten or
/// loosen matching without touching the merge algorithm.
#[derive(Debug, Clone)]
pub struct NormalizationPolicy {
    pub case_fold: bool,
    pub strip_punctuation: bool,
    /// Strip trailing building/unit suffixes like "101동 202호".
    pub strip_unit_suffix: bool,
    punctuation: Regex,
    unit_suffix: Regex,
}

impl Default for NormalizationPolicy {
    fn default() -> Self {
        Self {
            case_fold: true,
            strip_punctuation: true,
            strip_unit_suffix: false,
            // Keep letters, digits, whitespace and hyphens (lot numbers
            // such as 123-45 are significant).
            punctuation: Regex::new(r"[^\p{L}\p{N}\s-]").expect("punctuation pattern is valid"),
            unit_suffix: Regex::new(r"\s+\d+동\s*\d+호\s*$").expect("unit suffix pattern is valid"),
        }
    }
}

impl NormalizationPolicy {
    /// Fold one raw address into its comparison form.
    pub fn normalize(&self, raw: &str) -> String {
        let mut address = raw.trim().to_string();

        if self.strip_punctuation {
            address = self.punctuation.replace_all(&address, " ").into_owned();
        }
        if self.strip_unit_suffix {
            address = self.unit_suffix.replace(&address, "").into_owned();
        }
        if self.case_fold {
            address = address.to_lowercase();
        }

        // Collapse runs of whitespace left over from OCR or stripping.
        address.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// The deduplicated representative of one or more matching candidates.
///
/// Invariants:
/// - `duplicate_count == source_photo_ids.len()` (one count per photo)
/// - at least one of `road_address` / `jibun_address` is non-empty
/// - `source_photo_ids` is in first-seen order with no duplicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAddress {
    pub road_address: String,
    pub jibun_address: String,
    pub duplicate_count: usize,
    pub source_photo_ids: Vec<PhotoId>,
}

impl CanonicalAddress {
    /// Road-form when present, lot-form otherwise.
    pub fn display_address(&self) -> &str {
        if self.road_address.trim().is_empty() {
            &self.jibun_address
        } else {
            &self.road_address
        }
    }

    pub fn has_both_addresses(&self) -> bool {
        !self.road_address.trim().is_empty() && !self.jibun_address.trim().is_empty()
    }
}

/// Working entry carrying the normalized forms alongside the canonical
/// address so later candidates compare without re-normalizing.
struct CanonicalEntry {
    address: CanonicalAddress,
    norm_road: String,
    norm_jibun: String,
}

impl CanonicalEntry {
    /// Two addresses are the same when their normalized road forms match;
    /// when either road form is empty, matching lot forms decide instead.
    fn matches(&self, norm_road: &str, norm_jibun: &str) -> bool {
        if !self.norm_road.is_empty() && !norm_road.is_empty() {
            return self.norm_road == norm_road;
        }
        !self.norm_jibun.is_empty() && self.norm_jibun == norm_jibun
    }

    /// Fold a later candidate in: count the photo once, and adopt an
    /// address form the canonical entry was still missing.
    fn merge(
        &mut self,
        candidate: &AddressCandidate,
        norm_road: String,
        norm_jibun: String,
        photo_id: &PhotoId,
    ) {
        if !self.address.source_photo_ids.contains(photo_id) {
            self.address.source_photo_ids.push(photo_id.clone());
            self.address.duplicate_count += 1;
        }

        if self.norm_road.is_empty() && !norm_road.is_empty() {
            self.address.road_address = candidate.road_address.trim().to_string();
            self.norm_road = norm_road;
        }
        if self.norm_jibun.is_empty() && !norm_jibun.is_empty() {
            self.address.jibun_address = candidate.jibun_address.trim().to_string();
            self.norm_jibun = norm_jibun;
        }
    }
}

/// Cross-photo address deduplication with provenance tracking.
pub struct Deduplicator {
    policy: NormalizationPolicy,
}

impl Deduplicator {
    pub fn new(policy: NormalizationPolicy) -> Self {
        Self { policy }
    }

    /// Merge candidates from the whole batch into canonical addresses.
    ///
    /// `photos` must be in batch order; candidate order within each photo
    /// is preserved. The operation is idempotent: the same input always
    /// produces the same canonical list.
    pub fn dedup(&self, photos: &[(PhotoId, Vec<AddressCandidate>)]) -> Vec<CanonicalAddress> {
        let mut entries: Vec<CanonicalEntry> = Vec::new();

        for (photo_id, candidates) in photos {
            for candidate in candidates {
                if !candidate.has_address() {
                    continue;
                }

                let norm_road = self.policy.normalize(&candidate.road_address);
                let norm_jibun = self.policy.normalize(&candidate.jibun_address);

                let found = entries
                    .iter()
                    .position(|entry| entry.matches(&norm_road, &norm_jibun));
                match found {
                    Some(index) => entries[index].merge(candidate, norm_road, norm_jibun, photo_id),
                    None => entries.push(CanonicalEntry {
                        address: CanonicalAddress {
                            road_address: candidate.road_address.trim().to_string(),
                            jibun_address: candidate.jibun_address.trim().to_string(),
                            duplicate_count: 1,
                            source_photo_ids: vec![photo_id.clone()],
                        },
                        norm_road,
                        norm_jibun,
                    }),
                }
            }
        }

        entries.into_iter().map(|entry| entry.address).collect()
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(NormalizationPolicy::default())
    }
}
