//! # Geocode Verifier Module
//!
//! Resolves canonical addresses to coordinates through an injected
//! [`GeocodeBackend`].
//!
//! The verifier queries the road-form address first and falls back to the
//! lot-form exactly once, when the road query finds nothing or no road form
//! exists. Network and status failures are not retried here; retry policy
//! belongs to the orchestrator, if anywhere. A failed address is reported
//! as unverified, never dropped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::core::dedup::CanonicalAddress;
use crate::error::GeocodeError;

/// Default bound on a single geocode call.
pub const DEFAULT_GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

/// A resolved coordinate pair (WGS 84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Which address form produced the successful query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryForm {
    Road,
    Lot,
}

/// Outcome of verifying one canonical address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    Verified {
        coordinates: Coordinates,
        query_form: QueryForm,
    },
    Unverified {
        reason: GeocodeError,
    },
}

impl Resolution {
    pub fn is_verified(&self) -> bool {
        matches!(self, Resolution::Verified { .. })
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Resolution::Verified { coordinates, .. } => Some(*coordinates),
            Resolution::Unverified { .. } => None,
        }
    }
}

/// Capability boundary for the external geocoding service.
///
/// Implementations must bound each call by `timeout`; a call that cannot
/// complete in time fails with [`GeocodeError::Network`].
pub trait GeocodeBackend: Send + Sync {
    fn geocode(&self, query: &str, timeout: Duration) -> Result<Coordinates, GeocodeError>;
}

/// Applies the road-first, lot-fallback query policy to one address.
#[derive(Debug, Clone, Copy)]
pub struct GeocodeVerifier {
    timeout: Duration,
}

impl GeocodeVerifier {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Resolve one canonical address.
    ///
    /// The lot-form fallback fires only on `NoResults` or a missing road
    /// form; network and status failures surface immediately as unverified.
    pub fn verify(&self, backend: &dyn GeocodeBackend, address: &CanonicalAddress) -> Resolution {
        let road = address.road_address.trim();
        let lot = address.jibun_address.trim();

        if !road.is_empty() {
            match backend.geocode(road, self.timeout) {
                Ok(coordinates) => {
                    return Resolution::Verified {
                        coordinates,
                        query_form: QueryForm::Road,
                    }
                }
                Err(GeocodeError::NoResults) => {
                    tracing::debug!(address = road, "road query empty, trying lot form");
                }
                Err(reason) => return Resolution::Unverified { reason },
            }
        }

        if lot.is_empty() {
            return Resolution::Unverified {
                reason: GeocodeError::NoResults,
            };
        }

        match backend.geocode(lot, self.timeout) {
            Ok(coordinates) => Resolution::Verified {
                coordinates,
                query_form: QueryForm::Lot,
            },
            Err(reason) => Resolution::Unverified { reason },
        }
    }
}

impl Default for GeocodeVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_GEOCODE_TIMEOUT)
    }
}

/// Deterministic in-memory geocoder with a call log.
///
/// Unscripted queries fail with `NoResults`. The call log lets tests assert
/// exactly which queries were issued, in particular that none were issued
/// after cancellation.
#[derive(Default)]
pub struct FixedGeocoder {
    outcomes: HashMap<String, Result<Coordinates, GeocodeError>>,
    calls: Mutex<Vec<String>>,
}

impl FixedGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coordinates(mut self, query: &str, latitude: f64, longitude: f64) -> Self {
        self.outcomes.insert(
            query.to_string(),
            Ok(Coordinates {
                latitude,
                longitude,
            }),
        );
        self
    }

    pub fn with_failure(mut self, query: &str, error: GeocodeError) -> Self {
        self.outcomes.insert(query.to_string(), Err(error));
        self
    }

    /// Queries issued so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call log lock poisoned").clone()
    }
}

impl GeocodeBackend for FixedGeocoder {
    fn geocode(&self, query: &str, _timeout: Duration) -> Result<Coordinates, GeocodeError> {
        self.calls
            .lock()
            .expect("call log lock poisoned")
            .push(query.to_string());
        self.outcomes
            .get(query)
            .cloned()
            .unwrap_or(Err(GeocodeError::NoResults))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::photo::PhotoId;

    fn address(road: &str, lot: &str) -> CanonicalAddress {
        CanonicalAddress {
            road_address: road.to_string(),
            jibun_address: lot.to_string(),
            duplicate_count: 1,
            source_photo_ids: vec![PhotoId::new("P1")],
        }
    }

    #[test]
    fn road_query_success_skips_fallback() {
        let backend = FixedGeocoder::new().with_coordinates("테헤란로 1", 37.5, 127.03);
        let verifier = GeocodeVerifier::default();

        let resolution = verifier.verify(&backend, &address("테헤란로 1", "역삼동 823"));

        assert_eq!(
            resolution,
            Resolution::Verified {
                coordinates: Coordinates {
                    latitude: 37.5,
                    longitude: 127.03
                },
                query_form: QueryForm::Road,
            }
        );
        assert_eq!(backend.calls(), vec!["테헤란로 1"]);
    }

    #[test]
    fn no_results_falls_back_to_lot_form() {
        let backend = FixedGeocoder::new().with_coordinates("역삼동 823", 37.49, 127.04);
        let verifier = GeocodeVerifier::default();

        let resolution = verifier.verify(&backend, &address("테헤란로 1", "역삼동 823"));

        assert!(resolution.is_verified());
        assert!(matches!(
            resolution,
            Resolution::Verified {
                query_form: QueryForm::Lot,
                ..
            }
        ));
        assert_eq!(backend.calls(), vec!["테헤란로 1", "역삼동 823"]);
    }

    #[test]
    fn empty_road_form_queries_lot_directly() {
        let backend = FixedGeocoder::new().with_coordinates("역삼동 823", 37.49, 127.04);
        let verifier = GeocodeVerifier::default();

        let resolution = verifier.verify(&backend, &address("", "역삼동 823"));

        assert!(resolution.is_verified());
        assert_eq!(backend.calls(), vec!["역삼동 823"]);
    }

    #[test]
    fn network_error_does_not_trigger_fallback() {
        let backend = FixedGeocoder::new()
            .with_failure("테헤란로 1", GeocodeError::Network("timed out".into()))
            .with_coordinates("역삼동 823", 37.49, 127.04);
        let verifier = GeocodeVerifier::default();

        let resolution = verifier.verify(&backend, &address("테헤란로 1", "역삼동 823"));

        assert_eq!(
            resolution,
            Resolution::Unverified {
                reason: GeocodeError::Network("timed out".into())
            }
        );
        assert_eq!(backend.calls(), vec!["테헤란로 1"]);
    }

    #[test]
    fn invalid_status_surfaces_code_and_message() {
        let backend = FixedGeocoder::new().with_failure(
            "테헤란로 1",
            GeocodeError::InvalidStatus {
                code: 500,
                message: "internal".into(),
            },
        );
        let verifier = GeocodeVerifier::default();

        let resolution = verifier.verify(&backend, &address("테헤란로 1", ""));

        assert_eq!(
            resolution,
            Resolution::Unverified {
                reason: GeocodeError::InvalidStatus {
                    code: 500,
                    message: "internal".into()
                }
            }
        );
    }

    #[test]
    fn exhausted_fallback_is_unverified_no_results() {
        let backend = FixedGeocoder::new();
        let verifier = GeocodeVerifier::default();

        let resolution = verifier.verify(&backend, &address("테헤란로 1", "역삼동 823"));

        assert_eq!(
            resolution,
            Resolution::Unverified {
                reason: GeocodeError::NoResults
            }
        );
        assert_eq!(backend.calls().len(), 2);
    }
}
