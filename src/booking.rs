//! Booking collaborator seam.
//!
//! The core treats the booking backend purely as a request/response
//! boundary: it receives one finalized request and answers with an
//! acceptance (carrying the canonical request id) or a failure reason.
//! Retries, persistence, and notification delivery belong to that backend,
//! not to this crate.

use crate::error::DispatchError;
use crate::models::{BookingOutcome, ServiceRequest};

/// Hands a finalized request to the booking backend.
#[async_trait::async_trait]
pub trait BookingGateway: Send + Sync + 'static {
    /// Single submission attempt. A transport-level `Err` is treated by the
    /// service as a retryable rejection.
    async fn submit(&self, request: &ServiceRequest) -> Result<BookingOutcome, DispatchError>;
}

/// Gateway stub that accepts every submission after a configurable delay.
/// Optionally re-issues the request id under its own prefix, as the real
/// backend does when it assigns canonical identifiers.
pub struct AcceptingGateway {
    delay_ms: u64,
    reissue_prefix: Option<String>,
}

impl AcceptingGateway {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms, reissue_prefix: None }
    }

    pub fn with_reissue(delay_ms: u64, prefix: &str) -> Self {
        Self { delay_ms, reissue_prefix: Some(prefix.to_string()) }
    }
}

#[async_trait::async_trait]
impl BookingGateway for AcceptingGateway {
    async fn submit(&self, request: &ServiceRequest) -> Result<BookingOutcome, DispatchError> {
        tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;

        let local_id = request
            .request_id
            .clone()
            .ok_or_else(|| DispatchError::Internal("submitted request carries no id".to_string()))?;

        let canonical = match &self.reissue_prefix {
            Some(prefix) => format!("{}-{}", prefix, local_id),
            None => local_id,
        };

        log::info!("Booking gateway accepted request {}", canonical);
        Ok(BookingOutcome::Accepted { request_id: canonical })
    }
}

/// Gateway stub that rejects every submission with a fixed reason.
pub struct RejectingGateway {
    reason: String,
    retryable: bool,
}

impl RejectingGateway {
    pub fn new(reason: &str, retryable: bool) -> Self {
        Self { reason: reason.to_string(), retryable }
    }
}

#[async_trait::async_trait]
impl BookingGateway for RejectingGateway {
    async fn submit(&self, _request: &ServiceRequest) -> Result<BookingOutcome, DispatchError> {
        Ok(BookingOutcome::Rejected {
            reason: self.reason.clone(),
            retryable: self.retryable,
        })
    }
}
