//! Geolocation collaborator seam.
//!
//! The service consumes exactly one acquisition per locating step. A failed
//! or slow acquisition is never fatal: the caller falls back to manual
//! coordinate entry.

use crate::error::DispatchError;
use crate::models::GeoPoint;

/// Source of the requester's current coordinates.
#[async_trait::async_trait]
pub trait Geolocator: Send + Sync + 'static {
    /// One acquisition attempt. May take arbitrarily long; the service
    /// bounds it with a timeout.
    async fn locate(&self) -> Result<GeoPoint, DispatchError>;
}

/// Device stub returning a fixed position after a short delay. Stands in
/// for the storefront's device-geolocation bridge.
pub struct FixedGeolocator {
    point: GeoPoint,
    delay_ms: u64,
}

impl FixedGeolocator {
    pub fn new(point: GeoPoint, delay_ms: u64) -> Self {
        Self { point, delay_ms }
    }
}

#[async_trait::async_trait]
impl Geolocator for FixedGeolocator {
    async fn locate(&self) -> Result<GeoPoint, DispatchError> {
        tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        log::debug!(
            "Geolocator produced ({}, {})",
            self.point.latitude,
            self.point.longitude
        );
        Ok(self.point)
    }
}

/// Collaborator that always denies, as a browser does when the user refuses
/// the location permission.
pub struct DeniedGeolocator;

#[async_trait::async_trait]
impl Geolocator for DeniedGeolocator {
    async fn locate(&self) -> Result<GeoPoint, DispatchError> {
        Err(DispatchError::LocationUnavailable(
            "location permission denied".to_string(),
        ))
    }
}
