use crate::models::RequestStatus;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid request data: {0}")]
    Validation(String),

    #[error("Invalid transition from {state}: {reason}")]
    InvalidTransition { state: RequestStatus, reason: String },

    #[error("Flow {0} not found")]
    NotFound(String),

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("A submission is already in flight for this request")]
    SubmissionInFlight,

    #[error("Active flow store is full")]
    StoreFull,

    #[error("Booking failed: {0}")]
    Booking(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ResponseError for DispatchError {
    fn error_response(&self) -> HttpResponse {
        match self {
            DispatchError::Validation(msg) => HttpResponse::BadRequest().json(json!({
                "error": "validation_error",
                "message": msg
            })),
            DispatchError::InvalidTransition { state, reason } => {
                HttpResponse::Conflict().json(json!({
                    "error": "invalid_transition",
                    "state": state.to_string(),
                    "message": reason
                }))
            }
            DispatchError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": "not_found",
                "message": msg
            })),
            DispatchError::LocationUnavailable(msg) => {
                // Not fatal: the client is expected to fall back to manual
                // coordinate entry.
                HttpResponse::FailedDependency().json(json!({
                    "error": "location_unavailable",
                    "message": msg,
                    "fallback": "manual_entry"
                }))
            }
            DispatchError::SubmissionInFlight => HttpResponse::Conflict().json(json!({
                "error": "submission_in_flight",
                "message": "A submission is already in flight for this request"
            })),
            DispatchError::StoreFull => HttpResponse::TooManyRequests().json(json!({
                "error": "store_full",
                "message": "Too many active requests, please try again later"
            })),
            DispatchError::Booking(msg) => HttpResponse::BadGateway().json(json!({
                "error": "booking_failed",
                "message": msg
            })),
            DispatchError::Internal(msg) => {
                log::error!("Internal error: {}", msg);
                HttpResponse::InternalServerError().json(json!({
                    "error": "internal_error",
                    "message": "An internal server error occurred"
                }))
            }
        }
    }
}
