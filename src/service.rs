//! Flow orchestration for the roadcall service.
//!
//! `DispatchService` owns the active flows, wires the pure engine to the
//! directory/location/booking collaborators, and enforces the session-level
//! rules the state machine cannot see on its own: store capacity, bounded
//! geolocation acquisition with manual fallback, at-most-one in-flight
//! submission per flow, and expiry of abandoned flows.

use crate::booking::BookingGateway;
use crate::config::DispatchConfig;
use crate::directory::ProviderDirectory;
use crate::engine::lifecycle::RequestFlow;
use crate::engine::matching::rank_providers;
use crate::error::DispatchError;
use crate::location::Geolocator;
use crate::models::{
    BookingOutcome, FlowResponse, FlowStats, GeoPoint, HealthStatus, RequestStatus,
    SetLocationRequest, StartRequest,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;

/// Label attached to every response that carries an estimated cost.
pub const ESTIMATE_NOTE: &str =
    "Estimated cost only; the final charge is set by the provider.";

/// Empty-state hint returned when a match query finds nobody.
pub const NO_PROVIDERS_MESSAGE: &str =
    "No providers found for this service near you. Adjust the request details or try again.";

/// Event emitted when a flow changes.
/// Broadcast to all subscribers; the built-in metrics collector is one.
#[derive(Clone, Debug)]
pub struct FlowEvent {
    pub flow_id: String,
    /// Status after the change
    pub status: RequestStatus,
    pub kind: FlowEventType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowEventType {
    Created,
    Advanced,
    SteppedBack,
    /// Handed to the booking collaborator
    Submitted,
    Succeeded,
    Failed,
    /// Rejected but resubmittable; the flow is back at confirmation
    ResubmitRequired,
    /// Abandoned flow removed by the cleanup task
    Expired,
}

#[derive(Clone)]
/// Service driving one lifecycle flow per client session.
pub struct DispatchService {
    /// Thread-safe shared storage for active flows
    flows: Arc<RwLock<HashMap<String, RequestFlow>>>,
    /// Provider fleet, queried once per match
    directory: Arc<dyn ProviderDirectory>,
    /// Device geolocation collaborator
    locator: Arc<dyn Geolocator>,
    /// Booking backend collaborator
    gateway: Arc<dyn BookingGateway>,
    /// Configuration for matching, pricing and store behavior
    config: DispatchConfig,
    /// Channel for broadcasting flow events to subscribers
    event_tx: broadcast::Sender<FlowEvent>,
    /// Service start time for calculating uptime
    start_time: Arc<Instant>,
    /// Counter for submissions handed to the collaborator
    submitted_count: Arc<AtomicU64>,
    /// Counter for accepted bookings
    succeeded_count: Arc<AtomicU64>,
    /// Counter for terminally failed flows
    failed_count: Arc<AtomicU64>,
    /// Counter for expired flows
    expired_count: Arc<AtomicU64>,
}

impl DispatchService {
    pub fn new(
        config: DispatchConfig,
        directory: Arc<dyn ProviderDirectory>,
        locator: Arc<dyn Geolocator>,
        gateway: Arc<dyn BookingGateway>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer size of 100 events

        let service = Self {
            flows: Arc::new(RwLock::new(HashMap::new())),
            directory,
            locator,
            gateway,
            config,
            event_tx,
            start_time: Arc::new(Instant::now()),
            submitted_count: Arc::new(AtomicU64::new(0)),
            succeeded_count: Arc::new(AtomicU64::new(0)),
            failed_count: Arc::new(AtomicU64::new(0)),
            expired_count: Arc::new(AtomicU64::new(0)),
        };

        // Start cleanup task
        service.start_cleanup_task();

        // Start metric collection for events
        service.start_metrics_collection();

        service
    }

    /// Subscribe to flow events.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.event_tx.subscribe()
    }

    /// Starts a new flow: Draft -> Locating in one step, since the start
    /// request already carries the category and situation details.
    pub async fn start_flow(&self, body: StartRequest) -> Result<FlowResponse, DispatchError> {
        {
            let flows = self.flows.read();
            if flows.len() >= self.config.max_active_flows {
                return Err(DispatchError::StoreFull);
            }
        }

        let mut flow = RequestFlow::new(body.category, body.situation, body.modifiers, self.ttl());
        flow.confirm_details()?;

        log::info!(
            "Flow {}: started ({} / {:?})",
            flow.flow_id,
            flow.request.category,
            flow.request.situation.kind
        );

        self.emit(&flow, FlowEventType::Created);
        let response = self.respond(&flow, None);

        let mut flows = self.flows.write();
        flows.insert(flow.flow_id.clone(), flow);
        Ok(response)
    }

    /// Sets the pickup (and dropoff, when required) and advances to the
    /// listing step. Device acquisition is bounded by the configured
    /// timeout; on denial or timeout the flow stays in the locating step
    /// and the caller is directed to manual entry.
    pub async fn set_location(
        &self,
        flow_id: &str,
        body: SetLocationRequest,
    ) -> Result<FlowResponse, DispatchError> {
        if body.use_device && body.pickup.is_some() {
            return Err(DispatchError::Validation(
                "provide either use_device or manual pickup coordinates, not both".to_string(),
            ));
        }

        // Acquire from the collaborator before touching the store; the
        // store lock is never held across an await point.
        let pickup = if body.use_device {
            Some(self.acquire_device_location().await?)
        } else {
            body.pickup
        };

        let mut flows = self.flows.write();
        let flow = self.flow_mut(&mut flows, flow_id)?;

        if let Some(point) = pickup {
            flow.set_pickup(point)?;
        }
        if let Some(point) = body.dropoff {
            flow.set_dropoff(point)?;
        }
        flow.confirm_location()?;
        flow.touch(self.ttl());

        self.emit(flow, FlowEventType::Advanced);
        Ok(self.respond(flow, None))
    }

    /// Runs the matching engine over a fresh directory snapshot and records
    /// the ranked candidates. An empty list is a valid outcome and is
    /// surfaced with an empty-state message rather than an error.
    pub async fn list_candidates(&self, flow_id: &str) -> Result<FlowResponse, DispatchError> {
        let (requester, tag) = {
            let flows = self.flows.read();
            let flow = self.flow_ref(&flows, flow_id)?;
            if flow.request.status != RequestStatus::Listing {
                return Err(DispatchError::InvalidTransition {
                    state: flow.request.status,
                    reason: "candidates can only be listed after the location step".to_string(),
                });
            }
            let requester = flow.request.pickup.ok_or_else(|| {
                DispatchError::Internal("listing flow without a pickup location".to_string())
            })?;
            (requester, flow.request.match_tag().to_string())
        };

        let snapshot = self.directory.list_by_category(&tag).await?;
        let candidates = rank_providers(
            &snapshot,
            &requester,
            &tag,
            self.config.exact_category_match,
        );

        log::info!(
            "Flow {}: {} candidate(s) for tag '{}'",
            flow_id,
            candidates.len(),
            tag
        );

        let mut flows = self.flows.write();
        let flow = self.flow_mut(&mut flows, flow_id)?;
        flow.record_candidates(candidates)?;
        flow.touch(self.ttl());

        let message = if flow.candidates.is_empty() {
            Some(NO_PROVIDERS_MESSAGE.to_string())
        } else {
            None
        };

        self.emit(flow, FlowEventType::Advanced);
        Ok(self.respond(flow, message))
    }

    /// Records the user's pick and computes the estimate for it.
    pub async fn select_provider(
        &self,
        flow_id: &str,
        provider_id: &str,
    ) -> Result<FlowResponse, DispatchError> {
        let rates = self.config.tariff_rates();

        let mut flows = self.flows.write();
        let flow = self.flow_mut(&mut flows, flow_id)?;
        let cost = flow.select_candidate(provider_id, &rates)?;
        flow.touch(self.ttl());

        log::info!(
            "Flow {}: selected {} (estimate {:.2})",
            flow_id,
            provider_id,
            cost
        );

        self.emit(flow, FlowEventType::Advanced);
        Ok(self.respond(flow, None))
    }

    /// Confirms and submits the request to the booking collaborator.
    ///
    /// The Confirming -> Submitted transition happens under the store's
    /// write lock, so a concurrent duplicate submit observes the submitted
    /// state and is rejected: at most one submission is in flight per flow.
    /// A retryable rejection returns the flow to the confirmation step.
    pub async fn submit(&self, flow_id: &str) -> Result<FlowResponse, DispatchError> {
        let request = {
            let mut flows = self.flows.write();
            let flow = self.flow_mut(&mut flows, flow_id)?;
            let request_id = flow.begin_submission().map_err(|e| {
                if flow.is_terminal() {
                    self.emit(flow, FlowEventType::Failed);
                }
                e
            })?;
            flow.touch(self.ttl());
            log::info!("Flow {}: submitting as {}", flow_id, request_id);
            self.emit(flow, FlowEventType::Submitted);
            flow.request.clone()
        };

        // Single in-flight call, outside the lock. A transport failure is a
        // retryable rejection; the flow stays resubmittable.
        let outcome = match self.gateway.submit(&request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Flow {}: booking transport failure: {}", flow_id, e);
                BookingOutcome::Rejected { reason: e.to_string(), retryable: true }
            }
        };

        let mut flows = self.flows.write();
        let flow = self.flow_mut(&mut flows, flow_id)?;
        flow.complete_submission(outcome)?;
        flow.touch(self.ttl());

        match flow.request.status {
            RequestStatus::Succeeded => {
                self.emit(flow, FlowEventType::Succeeded);
                Ok(self.respond(flow, None))
            }
            RequestStatus::Confirming => {
                self.emit(flow, FlowEventType::ResubmitRequired);
                let reason = flow
                    .failure
                    .clone()
                    .unwrap_or_else(|| "submission rejected".to_string());
                Err(DispatchError::Booking(reason))
            }
            _ => {
                self.emit(flow, FlowEventType::Failed);
                let reason = flow
                    .failure
                    .clone()
                    .unwrap_or_else(|| "submission rejected".to_string());
                Err(DispatchError::Booking(reason))
            }
        }
    }

    /// Steps the flow back to its previous state, keeping entered data.
    pub async fn step_back(&self, flow_id: &str) -> Result<FlowResponse, DispatchError> {
        let mut flows = self.flows.write();
        let flow = self.flow_mut(&mut flows, flow_id)?;
        let previous = flow.step_back()?;
        flow.touch(self.ttl());

        log::info!("Flow {}: stepped back to {}", flow_id, previous);

        self.emit(flow, FlowEventType::SteppedBack);
        Ok(self.respond(flow, None))
    }

    /// Current snapshot of a flow, e.g. for the confirmation screen. The
    /// store doubles as the client-side cache; it is not authoritative
    /// storage.
    pub async fn get_flow(&self, flow_id: &str) -> Result<FlowResponse, DispatchError> {
        let flows = self.flows.read();
        let flow = self.flow_ref(&flows, flow_id)?;
        Ok(self.respond(flow, None))
    }

    /// Get health status information for the service.
    pub async fn health_status(&self) -> Result<HealthStatus, String> {
        // Current version from Cargo.toml
        let version = env!("CARGO_PKG_VERSION");

        let uptime_seconds = self.start_time.elapsed().as_secs();
        let active_flows = self.flows.read().len();

        let mut metrics = HashMap::new();
        metrics.insert("flow_capacity".to_string(), self.config.max_active_flows as u64);
        metrics.insert("flow_ttl_seconds".to_string(), self.config.flow_ttl_seconds);
        metrics.insert("cleanup_interval_ms".to_string(), self.config.cleanup_interval_ms);
        metrics.insert("location_timeout_ms".to_string(), self.config.location_timeout_ms);
        metrics.insert(
            "provider_count".to_string(),
            self.directory.provider_count().await as u64,
        );

        Ok(HealthStatus {
            status: "ok".to_string(),
            version: version.to_string(),
            uptime_seconds,
            metrics,
            flow_stats: FlowStats {
                active_flows,
                submitted_count: self.submitted_count.load(Ordering::Relaxed),
                succeeded_count: self.succeeded_count.load(Ordering::Relaxed),
                failed_count: self.failed_count.load(Ordering::Relaxed),
                expired_count: self.expired_count.load(Ordering::Relaxed),
            },
        })
    }

    // Bounded acquisition from the geolocation collaborator. Timeout and
    // denial both surface as LocationUnavailable so the client falls back
    // to manual entry.
    async fn acquire_device_location(&self) -> Result<GeoPoint, DispatchError> {
        let timeout = std::time::Duration::from_millis(self.config.location_timeout_ms);
        match tokio::time::timeout(timeout, self.locator.locate()).await {
            Ok(Ok(point)) => Ok(point),
            Ok(Err(e)) => {
                log::warn!("Geolocation failed: {}", e);
                Err(DispatchError::LocationUnavailable(e.to_string()))
            }
            Err(_) => {
                log::warn!(
                    "Geolocation timed out after {}ms",
                    self.config.location_timeout_ms
                );
                Err(DispatchError::LocationUnavailable(
                    "timed out waiting for the device location".to_string(),
                ))
            }
        }
    }

    /// Sets up a monitor on flow events to collect metrics.
    fn start_metrics_collection(&self) {
        let events = self.subscribe();
        let submitted_count = self.submitted_count.clone();
        let succeeded_count = self.succeeded_count.clone();
        let failed_count = self.failed_count.clone();
        let expired_count = self.expired_count.clone();

        tokio::spawn(async move {
            let mut rx = events;
            loop {
                match rx.recv().await {
                    Ok(event) => match event.kind {
                        FlowEventType::Submitted => {
                            submitted_count.fetch_add(1, Ordering::Relaxed);
                        }
                        FlowEventType::Succeeded => {
                            succeeded_count.fetch_add(1, Ordering::Relaxed);
                        }
                        FlowEventType::Failed => {
                            failed_count.fetch_add(1, Ordering::Relaxed);
                        }
                        FlowEventType::Expired => {
                            expired_count.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {}
                    },
                    Err(e) => {
                        if let broadcast::error::RecvError::Closed = e {
                            break;
                        }
                    }
                }
            }
        });
    }

    fn start_cleanup_task(&self) {
        let flows = self.flows.clone();
        let event_tx = self.event_tx.clone();
        let interval = std::time::Duration::from_millis(self.config.cleanup_interval_ms);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            loop {
                interval.tick().await;
                let now = OffsetDateTime::now_utc();

                let expired: Vec<(String, RequestStatus)> = {
                    let mut guard = flows.write();
                    let ids: Vec<String> = guard
                        .iter()
                        .filter(|(_, flow)| flow.is_expired(now))
                        .map(|(id, _)| id.clone())
                        .collect();
                    ids.into_iter()
                        .filter_map(|id| guard.remove(&id).map(|flow| (id, flow.request.status)))
                        .collect()
                };

                for (flow_id, status) in expired {
                    log::info!("Flow {}: expired while {}", flow_id, status);
                    let _ = event_tx.send(FlowEvent {
                        flow_id,
                        status,
                        kind: FlowEventType::Expired,
                    });
                }
            }
        });
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.config.flow_ttl_seconds as i64)
    }

    fn emit(&self, flow: &RequestFlow, kind: FlowEventType) {
        let _ = self.event_tx.send(FlowEvent {
            flow_id: flow.flow_id.clone(),
            status: flow.request.status,
            kind,
        });
    }

    fn respond(&self, flow: &RequestFlow, message: Option<String>) -> FlowResponse {
        let candidates = if flow.request.status == RequestStatus::Selecting {
            flow.candidates.clone()
        } else {
            Vec::new()
        };

        FlowResponse {
            flow_id: flow.flow_id.clone(),
            status: flow.request.status,
            request: flow.request.clone(),
            candidates,
            estimate_note: flow
                .request
                .estimated_cost
                .map(|_| ESTIMATE_NOTE.to_string()),
            failure: flow.failure.clone(),
            message,
        }
    }

    fn flow_ref<'a>(
        &self,
        flows: &'a HashMap<String, RequestFlow>,
        flow_id: &str,
    ) -> Result<&'a RequestFlow, DispatchError> {
        flows
            .get(flow_id)
            .ok_or_else(|| DispatchError::NotFound(flow_id.to_string()))
    }

    fn flow_mut<'a>(
        &self,
        flows: &'a mut HashMap<String, RequestFlow>,
        flow_id: &str,
    ) -> Result<&'a mut RequestFlow, DispatchError> {
        flows
            .get_mut(flow_id)
            .ok_or_else(|| DispatchError::NotFound(flow_id.to_string()))
    }
}
