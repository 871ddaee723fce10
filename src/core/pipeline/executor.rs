//! Pipeline execution implementation.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::core::dedup::{CanonicalAddress, Deduplicator, NormalizationPolicy};
use crate::core::extractor::{AddressCandidate, AddressExtractor};
use crate::core::geocode::{
    GeocodeBackend, GeocodeVerifier, Resolution, DEFAULT_GEOCODE_TIMEOUT,
};
use crate::core::photo::CapturedPhoto;
use crate::core::quality::{
    LaplacianQualityBackend, QualityBackend, QualityGate, QualityGateConfig, QualityStatus,
};
use crate::core::recognizer::RecognitionBackend;
use crate::error::{AddressScanError, BatchError, SkipReason};
use crate::events::{
    null_sender, BatchPhase, BatchSummary, DedupEvent, Event, EventSender, GeocodeEvent,
    PhotoEvent, PipelineEvent,
};

use super::report::{
    BatchOutcome, BatchReport, QualityWarning, ScanResult, SkippedPhoto, UnresolvedAddress,
};

/// What to do with already-completed work when cancellation lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancellationPolicy {
    /// Return everything finished before the signal.
    #[default]
    ReturnPartial,
    /// Throw the partial work away and fail the batch as cancelled.
    DiscardAll,
}

/// Cooperative cancellation signal shared between the caller and the
/// pipeline's worker threads.
///
/// Cancelling stops new work from being scheduled; work already in flight
/// finishes. Cloning shares the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Configuration for a batch run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worker threads for the per-photo stages. 0 means one per core.
    /// Recognition is compute-bound, so oversubscribing buys nothing.
    pub photo_workers: usize,
    /// Worker threads for geocode calls; kept small to respect external
    /// API throughput limits.
    pub geocode_workers: usize,
    /// Bound on each individual geocode call.
    pub geocode_timeout: Duration,
    pub quality: QualityGateConfig,
    pub normalization: NormalizationPolicy,
    pub cancellation_policy: CancellationPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            photo_workers: 0,
            geocode_workers: 4,
            geocode_timeout: DEFAULT_GEOCODE_TIMEOUT,
            quality: QualityGateConfig::default(),
            normalization: NormalizationPolicy::default(),
            cancellation_policy: CancellationPolicy::default(),
        }
    }
}

/// Builder for the scan pipeline
pub struct ScanPipelineBuilder {
    config: PipelineConfig,
    quality: Option<Arc<dyn QualityBackend>>,
    recognition: Option<Arc<dyn RecognitionBackend>>,
    geocode: Option<Arc<dyn GeocodeBackend>>,
}

impl ScanPipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            quality: None,
            recognition: None,
            geocode: None,
        }
    }

    /// Set the worker-pool size for the per-photo stages (0 = one per core)
    pub fn photo_workers(mut self, workers: usize) -> Self {
        self.config.photo_workers = workers;
        self
    }

    /// Set the concurrency cap for geocode calls
    pub fn geocode_workers(mut self, workers: usize) -> Self {
        self.config.geocode_workers = workers;
        self
    }

    /// Set the per-call geocode timeout
    pub fn geocode_timeout(mut self, timeout: Duration) -> Self {
        self.config.geocode_timeout = timeout;
        self
    }

    /// Set the quality gate thresholds
    pub fn quality_gate(mut self, config: QualityGateConfig) -> Self {
        self.config.quality = config;
        self
    }

    /// Set the address normalization policy used for deduplication
    pub fn normalization(mut self, policy: NormalizationPolicy) -> Self {
        self.config.normalization = policy;
        self
    }

    /// Set what happens to completed work on cancellation
    pub fn cancellation_policy(mut self, policy: CancellationPolicy) -> Self {
        self.config.cancellation_policy = policy;
        self
    }

    /// Inject the quality backend (defaults to Laplacian blur scoring)
    pub fn quality_backend(mut self, backend: Arc<dyn QualityBackend>) -> Self {
        self.quality = Some(backend);
        self
    }

    /// Inject the recognition backend (required)
    pub fn recognition_backend(mut self, backend: Arc<dyn RecognitionBackend>) -> Self {
        self.recognition = Some(backend);
        self
    }

    /// Inject the geocode backend (required)
    pub fn geocode_backend(mut self, backend: Arc<dyn GeocodeBackend>) -> Self {
        self.geocode = Some(backend);
        self
    }

    /// Build the pipeline.
    ///
    /// Fails with a configuration error if a required backend is missing.
    pub fn build(self) -> Result<ScanPipeline, AddressScanError> {
        let recognition = self.recognition.ok_or_else(|| {
            AddressScanError::Config("a recognition backend is required".to_string())
        })?;
        let geocode = self
            .geocode
            .ok_or_else(|| AddressScanError::Config("a geocode backend is required".to_string()))?;
        let quality = self
            .quality
            .unwrap_or_else(|| Arc::new(LaplacianQualityBackend::default()));

        let gate = QualityGate::new(self.config.quality);
        let deduplicator = Deduplicator::new(self.config.normalization.clone());
        let verifier = GeocodeVerifier::new(self.config.geocode_timeout);

        Ok(ScanPipeline {
            config: self.config,
            gate,
            extractor: AddressExtractor::new(),
            deduplicator,
            verifier,
            quality,
            recognition,
            geocode,
        })
    }
}

impl Default for ScanPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one photo's trip through the per-photo stages.
struct PhotoOutcome {
    warning: Option<QualityWarning>,
    candidates: Result<Vec<AddressCandidate>, SkipReason>,
}

/// The document-photo address scan pipeline.
///
/// Drives the per-photo stages concurrently, synchronizes on the barrier,
/// deduplicates, geocodes, and assembles the final ordered result. All
/// backends are injected; the pipeline holds no global state.
pub struct ScanPipeline {
    config: PipelineConfig,
    gate: QualityGate,
    extractor: AddressExtractor,
    deduplicator: Deduplicator,
    verifier: GeocodeVerifier,
    quality: Arc<dyn QualityBackend>,
    recognition: Arc<dyn RecognitionBackend>,
    geocode: Arc<dyn GeocodeBackend>,
}

impl ScanPipeline {
    /// Create a new pipeline builder
    pub fn builder() -> ScanPipelineBuilder {
        ScanPipelineBuilder::new()
    }

    /// Run the batch without progress events or external cancellation
    pub fn run(&self, photos: &[CapturedPhoto]) -> Result<BatchOutcome, AddressScanError> {
        self.run_with_events(photos, &null_sender(), &CancellationToken::new())
    }

    /// Run the batch with progress reporting and cooperative cancellation.
    ///
    /// Per-photo and per-address failures are recorded in the report and
    /// never abort the run; only an empty batch or cancellation under the
    /// `DiscardAll` policy returns `Err`.
    pub fn run_with_events(
        &self,
        photos: &[CapturedPhoto],
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, AddressScanError> {
        if photos.is_empty() {
            return Err(BatchError::EmptyBatch.into());
        }

        let start_time = Instant::now();
        let mut report = BatchReport::default();

        events.send(Event::Pipeline(PipelineEvent::Started {
            total_photos: photos.len(),
        }));
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: BatchPhase::Collecting,
        }));

        // Phase 1: per-photo stages, fanned out across the photo pool.
        // Collecting through par_iter keeps outcomes in photo order and
        // enforces the barrier: nothing below runs until every photo is done.
        let photo_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.photo_workers)
            .build()
            .map_err(|e| AddressScanError::Config(e.to_string()))?;

        let outcomes: Vec<PhotoOutcome> = photo_pool.install(|| {
            photos
                .par_iter()
                .map(|photo| self.process_photo(photo, events, cancel))
                .collect()
        });

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: BatchPhase::Barrier,
        }));

        let mut per_photo: Vec<(crate::core::photo::PhotoId, Vec<AddressCandidate>)> = Vec::new();
        for (photo, outcome) in photos.iter().zip(outcomes) {
            if let Some(warning) = outcome.warning {
                report.quality_warnings.push(warning);
            }
            match outcome.candidates {
                Ok(candidates) => {
                    report.photos_processed += 1;
                    per_photo.push((photo.id.clone(), candidates));
                }
                Err(reason) => report.photos_skipped.push(SkippedPhoto {
                    photo_id: photo.id.clone(),
                    reason,
                }),
            }
        }

        if cancel.is_cancelled()
            && self.config.cancellation_policy == CancellationPolicy::DiscardAll
        {
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
            return Err(BatchError::Cancelled.into());
        }

        // Phase 2: deduplication across the whole batch.
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: BatchPhase::Deduplicating,
        }));
        let total_candidates = per_photo.iter().map(|(_, c)| c.len()).sum();
        events.send(Event::Dedup(DedupEvent::Started { total_candidates }));

        let canonical = self.deduplicator.dedup(&per_photo);
        debug!(
            candidates = total_candidates,
            canonical = canonical.len(),
            "deduplication complete"
        );
        events.send(Event::Dedup(DedupEvent::Completed {
            canonical_addresses: canonical.len(),
        }));

        // Phase 3: geocode fan-out on its own, smaller pool.
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: BatchPhase::Geocoding,
        }));
        events.send(Event::Geocode(GeocodeEvent::Started {
            total_addresses: canonical.len(),
        }));

        let geocode_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.geocode_workers)
            .build()
            .map_err(|e| AddressScanError::Config(e.to_string()))?;

        // None marks an address whose geocode was never attempted because
        // cancellation arrived first.
        let resolutions: Vec<Option<Resolution>> = geocode_pool.install(|| {
            canonical
                .par_iter()
                .map(|address| self.geocode_address(address, events, cancel))
                .collect()
        });

        let total_canonical = canonical.len();

        // Reassemble by canonical index, never by completion order.
        let mut results = Vec::with_capacity(total_canonical);
        for (address, resolution) in canonical.into_iter().zip(resolutions) {
            let Some(resolution) = resolution else {
                continue;
            };
            if let Resolution::Unverified { reason } = &resolution {
                report.unresolved.push(UnresolvedAddress {
                    display_address: address.display_address().to_string(),
                    reason: reason.clone(),
                });
            }
            results.push(ScanResult::from_canonical(address, resolution));
        }

        let verified = results.iter().filter(|r| r.is_verified()).count();
        let unverified = results.len() - verified;
        events.send(Event::Geocode(GeocodeEvent::Completed {
            verified,
            unverified,
        }));

        report.duration_ms = start_time.elapsed().as_millis() as u64;

        if cancel.is_cancelled() {
            if self.config.cancellation_policy == CancellationPolicy::DiscardAll {
                events.send(Event::Pipeline(PipelineEvent::Cancelled));
                return Err(BatchError::Cancelled.into());
            }
            report.cancelled = true;
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
            return Ok(BatchOutcome { results, report });
        }

        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: BatchSummary {
                total_photos: photos.len(),
                photos_processed: report.photos_processed,
                photos_skipped: report.photos_skipped.len(),
                canonical_addresses: total_canonical,
                verified,
                unverified,
                duration_ms: report.duration_ms,
            },
        }));

        Ok(BatchOutcome { results, report })
    }

    /// Quality gate, recognition and extraction for one photo.
    ///
    /// Every failure is folded into a skip reason; nothing here aborts the
    /// batch.
    fn process_photo(
        &self,
        photo: &CapturedPhoto,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> PhotoOutcome {
        if cancel.is_cancelled() {
            return PhotoOutcome {
                warning: None,
                candidates: Err(SkipReason::Cancelled),
            };
        }

        events.send(Event::Photo(PhotoEvent::Started {
            photo_id: photo.id.clone(),
        }));

        let assessment = match self.gate.evaluate(&*self.quality, photo) {
            Ok(assessment) => assessment,
            Err(error) => {
                let reason = SkipReason::QualityUnavailable {
                    reason: error.to_string(),
                };
                return self.skip(photo, None, reason, events);
            }
        };
        events.send(Event::Photo(PhotoEvent::QualityChecked {
            photo_id: photo.id.clone(),
            confidence: assessment.confidence,
            status: assessment.status,
        }));

        let warning = match assessment.status {
            QualityStatus::Rejected => {
                let reason = SkipReason::LensSmudgeCheckFailed {
                    confidence: assessment.confidence,
                };
                return self.skip(photo, None, reason, events);
            }
            QualityStatus::Warning => Some(QualityWarning {
                photo_id: photo.id.clone(),
                confidence: assessment.confidence,
            }),
            QualityStatus::Ok => None,
        };

        let document = match self.recognition.recognize(photo) {
            Ok(document) => document,
            Err(error) => return self.skip(photo, warning, error.into(), events),
        };
        events.send(Event::Photo(PhotoEvent::Recognized {
            photo_id: photo.id.clone(),
            text_blocks: document.text_blocks.len(),
            tables: document.tables.len(),
        }));

        let candidates = self.extractor.extract(&document);
        debug!(
            photo_id = %photo.id,
            candidates = candidates.len(),
            "photo extracted"
        );
        events.send(Event::Photo(PhotoEvent::CandidatesExtracted {
            photo_id: photo.id.clone(),
            count: candidates.len(),
        }));
        events.send(Event::Photo(PhotoEvent::Completed {
            photo_id: photo.id.clone(),
        }));

        PhotoOutcome {
            warning,
            candidates: Ok(candidates),
        }
    }

    fn skip(
        &self,
        photo: &CapturedPhoto,
        warning: Option<QualityWarning>,
        reason: SkipReason,
        events: &EventSender,
    ) -> PhotoOutcome {
        warn!(photo_id = %photo.id, %reason, "photo skipped");
        events.send(Event::Photo(PhotoEvent::Skipped {
            photo_id: photo.id.clone(),
            reason: reason.clone(),
        }));
        PhotoOutcome {
            warning,
            candidates: Err(reason),
        }
    }

    /// Verify one canonical address unless cancellation arrived first.
    fn geocode_address(
        &self,
        address: &CanonicalAddress,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Option<Resolution> {
        if cancel.is_cancelled() {
            return None;
        }

        let resolution = self.verifier.verify(&*self.geocode, address);
        match &resolution {
            Resolution::Verified { .. } => {
                events.send(Event::Geocode(GeocodeEvent::Resolved {
                    display_address: address.display_address().to_string(),
                }));
            }
            Resolution::Unverified { reason } => {
                warn!(address = address.display_address(), %reason, "address unresolved");
                events.send(Event::Geocode(GeocodeEvent::Unverified {
                    display_address: address.display_address().to_string(),
                    reason: reason.clone(),
                }));
            }
        }
        Some(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geocode::FixedGeocoder;
    use crate::core::quality::QualityError;
    use crate::core::recognizer::FixedRecognizer;

    struct AlwaysSharp;

    impl QualityBackend for AlwaysSharp {
        fn assess(&self, _photo: &CapturedPhoto) -> Result<f64, QualityError> {
            Ok(0.1)
        }
    }

    fn pipeline_with(
        recognizer: FixedRecognizer,
        geocoder: FixedGeocoder,
    ) -> ScanPipeline {
        ScanPipeline::builder()
            .quality_backend(Arc::new(AlwaysSharp))
            .recognition_backend(Arc::new(recognizer))
            .geocode_backend(Arc::new(geocoder))
            .photo_workers(2)
            .geocode_workers(1)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_recognition_backend() {
        let result = ScanPipeline::builder()
            .geocode_backend(Arc::new(FixedGeocoder::new()))
            .build();

        assert!(matches!(result, Err(AddressScanError::Config(_))));
    }

    #[test]
    fn builder_requires_geocode_backend() {
        let result = ScanPipeline::builder()
            .recognition_backend(Arc::new(FixedRecognizer::new()))
            .build();

        assert!(matches!(result, Err(AddressScanError::Config(_))));
    }

    #[test]
    fn empty_batch_is_an_error() {
        let pipeline = pipeline_with(FixedRecognizer::new(), FixedGeocoder::new());

        let result = pipeline.run(&[]);

        assert!(matches!(
            result,
            Err(AddressScanError::Batch(BatchError::EmptyBatch))
        ));
    }

    #[test]
    fn cancellation_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();

        clone.cancel();

        assert!(token.is_cancelled());
    }

    #[test]
    fn single_photo_flows_to_verified_result() {
        let recognizer = FixedRecognizer::new().with_text("P1", &["서울시 강남구 테헤란로 1"]);
        let geocoder =
            FixedGeocoder::new().with_coordinates("서울시 강남구 테헤란로 1", 37.5, 127.03);
        let pipeline = pipeline_with(recognizer, geocoder);

        let photo = CapturedPhoto::new("P1", vec![]);
        let outcome = pipeline.run(&[photo]).unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.results[0].is_verified());
        assert_eq!(outcome.report.photos_processed, 1);
        assert!(outcome.report.photos_skipped.is_empty());
    }

    #[test]
    fn photo_with_no_addresses_still_counts_as_processed() {
        let recognizer = FixedRecognizer::new().with_text("P1", &["주소가 없는 문서"]);
        let pipeline = pipeline_with(recognizer, FixedGeocoder::new());

        let photo = CapturedPhoto::new("P1", vec![]);
        let outcome = pipeline.run(&[photo]).unwrap();

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.report.photos_processed, 1);
    }
}
