#![allow(dead_code)] // Each test binary uses its own subset of these helpers

use roadcall::booking::BookingGateway;
use roadcall::config::DispatchConfig;
use roadcall::directory::StaticDirectory;
use roadcall::location::FixedGeolocator;
use roadcall::models::{
    GeoPoint, Modifiers, Provider, RateUnit, ServiceCategory, Situation, SituationKind,
    StartRequest, Tariff,
};
use roadcall::service::DispatchService;
use std::sync::Arc;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Downtown Cairo, the anchor point of the seed fleet.
pub fn cairo() -> GeoPoint {
    GeoPoint::new(30.0444, 31.2357)
}

pub fn point(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint::new(latitude, longitude)
}

pub fn km_tariff(base_fee: f64, per_unit_rate: f64) -> Tariff {
    Tariff { base_fee, per_unit_rate, unit: RateUnit::Km }
}

pub fn hour_tariff(base_fee: f64, per_unit_rate: f64) -> Tariff {
    Tariff { base_fee, per_unit_rate, unit: RateUnit::Hour }
}

/// An available provider with neutral presentation metadata.
pub fn test_provider(
    id: &str,
    location: GeoPoint,
    tags: &[&str],
    rating: f64,
    review_count: u32,
    tariff: Tariff,
) -> Provider {
    Provider {
        id: id.to_string(),
        name: format!("Provider {}", id),
        location,
        categories: tags.iter().map(|t| t.to_string()).collect(),
        available: true,
        rating,
        review_count,
        tariff,
        eta_minutes: 20,
        image_url: None,
    }
}

pub fn situation(kind: SituationKind) -> Situation {
    Situation {
        kind,
        specialization: None,
        description: None,
        attachments: Vec::new(),
    }
}

pub fn situation_with_spec(kind: SituationKind, specialization: &str) -> Situation {
    Situation {
        kind,
        specialization: Some(specialization.to_string()),
        description: None,
        attachments: Vec::new(),
    }
}

pub fn start_body(category: ServiceCategory, kind: SituationKind) -> StartRequest {
    StartRequest {
        category,
        situation: situation(kind),
        modifiers: Modifiers::default(),
    }
}

/// A service over the built-in seed fleet with a fast device geolocator.
pub fn seed_service(gateway: Arc<dyn BookingGateway>) -> DispatchService {
    DispatchService::new(
        DispatchConfig::default(),
        Arc::new(StaticDirectory::seed(false)),
        Arc::new(FixedGeolocator::new(cairo(), 10)),
        gateway,
    )
}

/// A service over a custom fleet, with configurable behavior.
pub fn custom_service(
    config: DispatchConfig,
    providers: Vec<Provider>,
    gateway: Arc<dyn BookingGateway>,
) -> DispatchService {
    let exact = config.exact_category_match;
    DispatchService::new(
        config,
        Arc::new(StaticDirectory::new(providers, exact)),
        Arc::new(FixedGeolocator::new(cairo(), 10)),
        gateway,
    )
}
