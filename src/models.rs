//! Data models for the roadcall service.
//! Defines the core data structures shared by the matching engine, the
//! request lifecycle, and the HTTP layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Geographic location represented by latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Whether both coordinates are inside the valid WGS84 ranges.
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// How a provider charges for a job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateUnit {
    /// Per-kilometer rate, multiplied by the computed trip distance
    Km,
    /// Per-hour rate, multiplied by an assumed service duration
    Hour,
}

/// Pricing model attached to a provider: a flat call-out fee plus a
/// distance- or time-proportional rate. Surcharges live in the service-wide
/// tariff configuration, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    /// Flat fee charged for every job
    pub base_fee: f64,
    /// Rate applied per unit (km or hour)
    pub per_unit_rate: f64,
    /// Unit the rate is expressed in
    pub unit: RateUnit,
}

/// An entity offering a roadside service: a fuel station, a mobile mechanic,
/// or a tow operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Unique, stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Where the provider is based
    pub location: GeoPoint,
    /// Specialization tags this provider can fulfil (loosely curated data)
    pub categories: Vec<String>,
    /// Whether the provider currently accepts requests
    pub available: bool,
    /// Average rating, 0 to 5
    pub rating: f64,
    /// Number of reviews behind the rating
    pub review_count: u32,
    /// Pricing model
    pub tariff: Tariff,
    /// Estimated response time shown to the user; not load-bearing
    pub eta_minutes: u32,
    /// Optional image shown in the candidate list
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_url: Option<String>,
}

/// A provider annotated with its computed distance from the requester.
/// Produced transiently per match query and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub provider: Provider,
    /// Great-circle distance from the requester in kilometers
    pub distance_km: f64,
}

/// The service domain a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    /// Emergency fuel delivery
    Fuel,
    /// Mobile mechanic dispatch
    Mechanic,
    /// Tow truck dispatch
    Tow,
}

impl ServiceCategory {
    /// Default specialization tag used to query the directory when the
    /// request does not name a narrower specialization.
    pub fn tag(&self) -> &'static str {
        match self {
            ServiceCategory::Fuel => "fuel",
            ServiceCategory::Mechanic => "mechanic",
            ServiceCategory::Tow => "tow",
        }
    }

    /// Prefix tag used in generated request identifiers.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ServiceCategory::Fuel => "FUEL",
            ServiceCategory::Mechanic => "MECH",
            ServiceCategory::Tow => "TOW",
        }
    }

    /// Transport-style categories need a dropoff location in addition to
    /// the pickup.
    pub fn requires_dropoff(&self) -> bool {
        matches!(self, ServiceCategory::Tow)
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// What went wrong at the roadside, as reported by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SituationKind {
    OutOfFuel,
    FlatTire,
    DeadBattery,
    EngineFailure,
    Overheating,
    Lockout,
    Accident,
    Other,
}

/// Problem details entered during the draft step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Situation {
    /// The kind of problem being reported
    pub kind: SituationKind,
    /// Optional narrower specialization tag to match against provider tags
    /// (e.g. "ac-specialist"); falls back to the category tag when absent
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub specialization: Option<String>,
    /// Free-text description of the problem
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    /// Photo URLs attached by the user
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attachments: Vec<String>,
}

/// Flags that add flat surcharges to the estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    /// Urgent dispatch outside the normal queue
    #[serde(default)]
    pub emergency: bool,
    /// Premium tier handling
    #[serde(default)]
    pub premium_tier: bool,
}

/// Lifecycle states of a service request, from draft to outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Category and situation being entered
    Draft,
    /// Waiting for a pickup (and dropoff, if required) location
    Locating,
    /// Ready to query the provider directory
    Listing,
    /// Candidate list produced, waiting for the user's pick
    Selecting,
    /// Provider chosen and estimate shown, waiting for confirmation
    Confirming,
    /// Handed to the booking collaborator, response outstanding
    Submitted,
    /// Booking collaborator accepted the request
    Succeeded,
    /// Definitively rejected or abandoned with an incomplete record
    Failed,
}

impl RequestStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Succeeded | RequestStatus::Failed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStatus::Draft => "draft",
            RequestStatus::Locating => "locating",
            RequestStatus::Listing => "listing",
            RequestStatus::Selecting => "selecting",
            RequestStatus::Confirming => "confirming",
            RequestStatus::Submitted => "submitted",
            RequestStatus::Succeeded => "succeeded",
            RequestStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One user journey from draft to outcome. Mutated exclusively by the
/// lifecycle state machine; owned by a single flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Identifier generated at submission time; None until then
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request_id: Option<String>,
    /// Requested service domain
    pub category: ServiceCategory,
    /// Problem details
    pub situation: Situation,
    /// Where the provider should come to
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pickup: Option<GeoPoint>,
    /// Where the vehicle should be taken (transport-style requests only)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dropoff: Option<GeoPoint>,
    /// The provider chosen from the candidate list
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub selected_provider_id: Option<String>,
    /// Surcharge flags
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Estimated total; an estimate only, never a final charge
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub estimated_cost: Option<f64>,
    /// Current lifecycle state
    pub status: RequestStatus,
}

impl ServiceRequest {
    /// Creates a fresh draft request.
    pub fn new(category: ServiceCategory, situation: Situation, modifiers: Modifiers) -> Self {
        Self {
            request_id: None,
            category,
            situation,
            pickup: None,
            dropoff: None,
            selected_provider_id: None,
            modifiers,
            estimated_cost: None,
            status: RequestStatus::Draft,
        }
    }

    /// The specialization tag used to query the directory: the explicit
    /// specialization when one was entered, otherwise the category tag.
    pub fn match_tag(&self) -> &str {
        self.situation
            .specialization
            .as_deref()
            .unwrap_or_else(|| self.category.tag())
    }
}

/// The outcome reported by the booking collaborator for one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BookingOutcome {
    /// Request accepted; carries the canonical request id, which the
    /// backend may have re-issued
    Accepted { request_id: String },
    /// Request rejected; retryable failures return the flow to the
    /// confirmation step, definitive ones terminate it
    Rejected { reason: String, retryable: bool },
}

// ---------------------------------------------------------------------------
// HTTP request/response bodies
// ---------------------------------------------------------------------------

/// Body for POST /dispatch/requests: starts a new flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub category: ServiceCategory,
    pub situation: Situation,
    #[serde(default)]
    pub modifiers: Modifiers,
}

/// Body for POST /dispatch/requests/{id}/location.
/// Either `use_device` asks the geolocation collaborator for the pickup, or
/// the pickup is supplied manually. The dropoff is always manual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLocationRequest {
    /// Acquire the pickup from the device geolocation collaborator
    #[serde(default)]
    pub use_device: bool,
    /// Manually entered or confirmed pickup coordinates
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pickup: Option<GeoPoint>,
    /// Destination for transport-style requests
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dropoff: Option<GeoPoint>,
}

/// Body for POST /dispatch/requests/{id}/select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRequest {
    pub provider_id: String,
}

/// Snapshot of one flow returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowResponse {
    /// Identifier of the flow (session), not of the submitted request
    pub flow_id: String,
    pub status: RequestStatus,
    pub request: ServiceRequest,
    /// Most recent candidate list; empty outside the selecting step or when
    /// no providers were found
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub candidates: Vec<MatchCandidate>,
    /// Label attached whenever an estimated cost is present
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub estimate_note: Option<String>,
    /// Last submission failure reason, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure: Option<String>,
    /// Human-readable hint for empty states and fallbacks
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

/// Health status information for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub metrics: HashMap<String, u64>,
    pub flow_stats: FlowStats,
}

/// Counters describing the flow store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStats {
    /// Flows currently held in the store
    pub active_flows: usize,
    /// Submissions handed to the booking collaborator
    pub submitted_count: u64,
    /// Flows that reached the succeeded state
    pub succeeded_count: u64,
    /// Flows that reached the failed state
    pub failed_count: u64,
    /// Abandoned flows removed by the cleanup task
    pub expired_count: u64,
}
