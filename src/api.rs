//! API endpoints for the roadcall service.
//! Maps the storefront's dispatch-flow steps onto HTTP endpoints. All
//! endpoints use JSON bodies and return the current flow snapshot, so a
//! client can always re-render the step it is on.

use crate::models::{SelectRequest, SetLocationRequest, StartRequest};
use crate::service::DispatchService;
use actix_web::{get, post, web, HttpResponse, Responder, ResponseError};

/// Starts a new dispatch flow.
///
/// The body carries the category, the situation details, and the surcharge
/// modifiers. On success the flow is already waiting for its location.
///
/// # Returns
/// - 200 OK with the flow snapshot
/// - 400 Bad Request if the situation details are invalid
/// - 429 Too Many Requests if the flow store is full
#[post("/requests")]
pub async fn start(
    body: web::Json<StartRequest>,
    service: web::Data<DispatchService>,
) -> impl Responder {
    match service.start_flow(body.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

/// Sets the pickup (and dropoff) for a flow.
///
/// With `use_device: true` the pickup is acquired from the geolocation
/// collaborator under a bounded timeout; on denial or timeout the response
/// directs the client to manual entry and the flow keeps waiting.
///
/// # Returns
/// - 200 OK with the flow snapshot (now listing)
/// - 400 Bad Request for missing or out-of-range coordinates
/// - 404 Not Found for an unknown flow
/// - 424 Failed Dependency when device acquisition fails
#[post("/requests/{flow_id}/location")]
pub async fn set_location(
    path: web::Path<String>,
    body: web::Json<SetLocationRequest>,
    service: web::Data<DispatchService>,
) -> impl Responder {
    match service.set_location(&path.into_inner(), body.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

/// Runs the matching engine and returns the ranked candidate list.
///
/// An empty list is a valid outcome: the snapshot carries an empty-state
/// message and the flow moves on to the selecting step regardless.
#[post("/requests/{flow_id}/candidates")]
pub async fn list_candidates(
    path: web::Path<String>,
    service: web::Data<DispatchService>,
) -> impl Responder {
    match service.list_candidates(&path.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

/// Picks one candidate and returns the estimate for it.
///
/// The provider id must come from the most recent candidate list; anything
/// else is rejected with a validation error.
#[post("/requests/{flow_id}/select")]
pub async fn select(
    path: web::Path<String>,
    body: web::Json<SelectRequest>,
    service: web::Data<DispatchService>,
) -> impl Responder {
    match service
        .select_provider(&path.into_inner(), &body.provider_id)
        .await
    {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

/// Confirms the estimate and submits the request to the booking backend.
///
/// # Returns
/// - 200 OK with the succeeded snapshot and the canonical request id
/// - 409 Conflict if a submission is already in flight
/// - 502 Bad Gateway if the backend rejects; the flow returns to the
///   confirmation step and can be resubmitted
#[post("/requests/{flow_id}/submit")]
pub async fn submit(
    path: web::Path<String>,
    service: web::Data<DispatchService>,
) -> impl Responder {
    match service.submit(&path.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

/// Steps the flow back to the previous step without losing entered data.
#[post("/requests/{flow_id}/back")]
pub async fn back(path: web::Path<String>, service: web::Data<DispatchService>) -> impl Responder {
    match service.step_back(&path.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

/// Current snapshot of a flow, e.g. for the confirmation screen.
#[get("/requests/{flow_id}")]
pub async fn get_request(
    path: web::Path<String>,
    service: web::Data<DispatchService>,
) -> impl Responder {
    match service.get_flow(&path.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

/// Health endpoint under the /dispatch scope.
#[get("/health")]
pub async fn health(service: web::Data<DispatchService>) -> impl Responder {
    match service.health_status().await {
        Ok(status) => HttpResponse::Ok().json(status),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Root-level health endpoint for platform health checks.
#[get("/health")]
pub async fn root_health(service: web::Data<DispatchService>) -> impl Responder {
    match service.health_status().await {
        Ok(status) => HttpResponse::Ok().json(status),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
