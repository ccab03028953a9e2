//! The request lifecycle state machine.
//!
//! A [`RequestFlow`] owns one [`ServiceRequest`] and the most recent
//! candidate snapshot, and is the only place the request is mutated. All
//! transitions are synchronous reducers returning `Result`: a validation
//! failure blocks the transition and leaves the flow unchanged, so the
//! machine is testable without any UI or I/O. The machine never retries on
//! its own; re-entering a step is always user-initiated.
//!
//! Forward path:
//! draft -> locating -> listing -> selecting -> confirming -> submitted,
//! then succeeded or failed depending on the booking outcome. Every
//! non-submitted, non-terminal state can step back to its predecessor
//! without losing previously entered data.

use crate::engine::geo::validate_point;
use crate::engine::pricing::{estimate, TariffRates};
use crate::error::DispatchError;
use crate::models::{
    BookingOutcome, GeoPoint, MatchCandidate, Modifiers, RequestStatus, ServiceCategory,
    ServiceRequest, Situation,
};
use rand::Rng;
use time::{Duration, OffsetDateTime};

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random suffix in generated request identifiers.
const REQUEST_ID_SUFFIX_LEN: usize = 4;

/// One lifecycle flow: the request under construction plus the transient
/// state the machine needs between steps.
#[derive(Debug, Clone)]
pub struct RequestFlow {
    /// Unique flow (session) identifier
    pub flow_id: String,
    /// The request being driven through the lifecycle
    pub request: ServiceRequest,
    /// Snapshot from the most recent match query; selections must come
    /// from this list
    pub candidates: Vec<MatchCandidate>,
    /// Reason of the last submission failure, if any
    pub failure: Option<String>,
    /// When the flow was created
    pub created_at: OffsetDateTime,
    /// Last time a transition touched the flow
    pub updated_at: OffsetDateTime,
    /// When the cleanup task may remove the flow
    pub expires_at: OffsetDateTime,
}

impl RequestFlow {
    /// Creates a new flow holding a draft request.
    pub fn new(
        category: ServiceCategory,
        situation: Situation,
        modifiers: Modifiers,
        ttl: Duration,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            flow_id: uuid::Uuid::new_v4().to_string(),
            request: ServiceRequest::new(category, situation, modifiers),
            candidates: Vec::new(),
            failure: None,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether the flow reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.request.status.is_terminal()
    }

    /// Whether the cleanup task may remove this flow.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// Refreshes the activity timestamps after a transition.
    pub fn touch(&mut self, ttl: Duration) {
        let now = OffsetDateTime::now_utc();
        self.updated_at = now;
        self.expires_at = now + ttl;
    }

    /// Draft -> Locating: the user confirmed category and situation details.
    pub fn confirm_details(&mut self) -> Result<(), DispatchError> {
        self.expect_status(RequestStatus::Draft, "confirm details")?;

        // The category and situation kind are present by construction; a
        // blank specialization string is the one hole the types allow.
        if let Some(spec) = &self.request.situation.specialization {
            if spec.trim().is_empty() {
                return Err(DispatchError::Validation(
                    "situation.specialization must not be blank".to_string(),
                ));
            }
        }

        self.advance(RequestStatus::Locating);
        Ok(())
    }

    /// Stores the pickup location. Allowed while locating.
    pub fn set_pickup(&mut self, point: GeoPoint) -> Result<(), DispatchError> {
        self.expect_status(RequestStatus::Locating, "set pickup")?;
        validate_point(&point, "pickup")?;
        self.request.pickup = Some(point);
        Ok(())
    }

    /// Stores the dropoff location. Allowed while locating, and only for
    /// transport-style categories.
    pub fn set_dropoff(&mut self, point: GeoPoint) -> Result<(), DispatchError> {
        self.expect_status(RequestStatus::Locating, "set dropoff")?;
        if !self.request.category.requires_dropoff() {
            return Err(DispatchError::Validation(format!(
                "dropoff is not accepted for {} requests",
                self.request.category
            )));
        }
        validate_point(&point, "dropoff")?;
        self.request.dropoff = Some(point);
        Ok(())
    }

    /// Locating -> Listing: every required location has been set.
    pub fn confirm_location(&mut self) -> Result<(), DispatchError> {
        self.expect_status(RequestStatus::Locating, "confirm location")?;

        if self.request.pickup.is_none() {
            return Err(DispatchError::Validation(
                "pickup location is required".to_string(),
            ));
        }
        if self.request.category.requires_dropoff() && self.request.dropoff.is_none() {
            return Err(DispatchError::Validation(format!(
                "dropoff location is required for {} requests",
                self.request.category
            )));
        }

        self.advance(RequestStatus::Listing);
        Ok(())
    }

    /// Listing -> Selecting: a match query produced this snapshot. An empty
    /// snapshot is a valid outcome; the machine represents "no providers
    /// found" without erroring. Any earlier selection is invalidated, since
    /// a pick must come from the most recent snapshot.
    pub fn record_candidates(
        &mut self,
        candidates: Vec<MatchCandidate>,
    ) -> Result<(), DispatchError> {
        self.expect_status(RequestStatus::Listing, "record candidates")?;

        self.request.selected_provider_id = None;
        self.request.estimated_cost = None;
        self.candidates = candidates;

        log::info!(
            "Flow {}: {} candidate(s) recorded",
            self.flow_id,
            self.candidates.len()
        );

        self.advance(RequestStatus::Selecting);
        Ok(())
    }

    /// Selecting -> Confirming: the user picked a candidate. The id must be
    /// drawn from the most recent snapshot; the estimate is computed from
    /// that candidate's tariff and distance.
    pub fn select_candidate(
        &mut self,
        provider_id: &str,
        rates: &TariffRates,
    ) -> Result<f64, DispatchError> {
        self.expect_status(RequestStatus::Selecting, "select a provider")?;

        let candidate = self
            .candidates
            .iter()
            .find(|c| c.provider.id == provider_id)
            .ok_or_else(|| {
                DispatchError::Validation(format!(
                    "provider {} is not in the current candidate list",
                    provider_id
                ))
            })?;

        let cost = estimate(
            &candidate.provider.tariff,
            candidate.distance_km,
            &self.request.modifiers,
            rates,
        );

        self.request.selected_provider_id = Some(candidate.provider.id.clone());
        self.request.estimated_cost = Some(cost);
        self.advance(RequestStatus::Confirming);
        Ok(cost)
    }

    /// Confirming -> Submitted: the user confirmed the estimate. Generates
    /// the request identifier and re-checks completeness; an incomplete
    /// record fails fast into the terminal state instead of producing a
    /// partial submission.
    pub fn begin_submission(&mut self) -> Result<String, DispatchError> {
        match self.request.status {
            RequestStatus::Confirming => {}
            // At most one submission may be in flight per request.
            RequestStatus::Submitted => return Err(DispatchError::SubmissionInFlight),
            state => {
                return Err(DispatchError::InvalidTransition {
                    state,
                    reason: "only a confirmed request can be submitted".to_string(),
                })
            }
        }

        if let Err(hole) = self.completeness_hole() {
            log::warn!("Flow {}: failing fast on incomplete submit: {}", self.flow_id, hole);
            self.request.status = RequestStatus::Failed;
            self.failure = Some(hole.clone());
            return Err(DispatchError::Validation(hole));
        }

        let request_id = generate_request_id(self.request.category);
        self.request.request_id = Some(request_id.clone());
        self.failure = None;
        self.advance(RequestStatus::Submitted);
        Ok(request_id)
    }

    /// Applies the booking collaborator's verdict to a submitted flow.
    ///
    /// - Accepted: terminal success; the canonical id (possibly re-issued by
    ///   the backend) replaces the local one.
    /// - Rejected, retryable: back to Confirming; the request keeps its data
    ///   and can be resubmitted manually. The local id is discarded since it
    ///   was never accepted.
    /// - Rejected, definitive: terminal failure.
    pub fn complete_submission(&mut self, outcome: BookingOutcome) -> Result<(), DispatchError> {
        self.expect_status(RequestStatus::Submitted, "complete a submission")?;

        match outcome {
            BookingOutcome::Accepted { request_id } => {
                log::info!("Flow {}: booking accepted as {}", self.flow_id, request_id);
                self.request.request_id = Some(request_id);
                self.failure = None;
                self.advance(RequestStatus::Succeeded);
            }
            BookingOutcome::Rejected { reason, retryable: true } => {
                log::warn!(
                    "Flow {}: booking rejected ({}), returning to confirmation",
                    self.flow_id,
                    reason
                );
                self.request.request_id = None;
                self.failure = Some(reason);
                self.advance(RequestStatus::Confirming);
            }
            BookingOutcome::Rejected { reason, retryable: false } => {
                log::warn!("Flow {}: booking definitively rejected ({})", self.flow_id, reason);
                self.failure = Some(reason);
                self.advance(RequestStatus::Failed);
            }
        }
        Ok(())
    }

    /// Steps back to the previous state without losing any entered data.
    /// Not possible while a submission is in flight or after an outcome.
    pub fn step_back(&mut self) -> Result<RequestStatus, DispatchError> {
        let previous = match self.request.status {
            RequestStatus::Locating => RequestStatus::Draft,
            RequestStatus::Listing => RequestStatus::Locating,
            RequestStatus::Selecting => RequestStatus::Listing,
            RequestStatus::Confirming => RequestStatus::Selecting,
            RequestStatus::Draft => {
                return Err(DispatchError::InvalidTransition {
                    state: RequestStatus::Draft,
                    reason: "already at the first step".to_string(),
                })
            }
            RequestStatus::Submitted => return Err(DispatchError::SubmissionInFlight),
            state => {
                return Err(DispatchError::InvalidTransition {
                    state,
                    reason: "the request already has an outcome".to_string(),
                })
            }
        };

        self.advance(previous);
        Ok(previous)
    }

    // Names the first missing mandatory field, if any.
    fn completeness_hole(&self) -> Result<(), String> {
        if self.request.pickup.is_none() {
            return Err("pickup location missing at submit time".to_string());
        }
        if self.request.category.requires_dropoff() && self.request.dropoff.is_none() {
            return Err("dropoff location missing at submit time".to_string());
        }
        if self.request.selected_provider_id.is_none() {
            return Err("no provider selected at submit time".to_string());
        }
        if self.request.estimated_cost.is_none() {
            return Err("no estimate computed at submit time".to_string());
        }
        Ok(())
    }

    fn expect_status(&self, expected: RequestStatus, action: &str) -> Result<(), DispatchError> {
        if self.request.status != expected {
            return Err(DispatchError::InvalidTransition {
                state: self.request.status,
                reason: format!("cannot {} while {}", action, self.request.status),
            });
        }
        Ok(())
    }

    fn advance(&mut self, next: RequestStatus) {
        log::debug!(
            "Flow {}: {} -> {}",
            self.flow_id,
            self.request.status,
            next
        );
        self.request.status = next;
        self.updated_at = OffsetDateTime::now_utc();
    }
}

/// Generates a request identifier: the category's domain prefix, a
/// timestamp-derived base-36 segment, and a short random base-36 suffix.
/// Unique in practice for a single session.
pub fn generate_request_id(category: ServiceCategory) -> String {
    let millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u128;

    let mut rng = rand::thread_rng();
    let suffix: String = (0..REQUEST_ID_SUFFIX_LEN)
        .map(|_| BASE36_ALPHABET[rng.gen_range(0..BASE36_ALPHABET.len())] as char)
        .collect();

    format!("{}-{}-{}", category.id_prefix(), encode_base36(millis), suffix)
}

fn encode_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_ALPHABET[(value % 36) as usize] as char);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().collect()
}
