mod common;

use common::{
    cairo, custom_service, hour_tariff, init, point, seed_service, situation_with_spec, start_body,
    test_provider,
};
use roadcall::booking::{AcceptingGateway, RejectingGateway};
use roadcall::config::DispatchConfig;
use roadcall::directory::StaticDirectory;
use roadcall::error::DispatchError;
use roadcall::location::{DeniedGeolocator, FixedGeolocator};
use roadcall::models::{
    Modifiers, RequestStatus, ServiceCategory, SetLocationRequest, SituationKind, StartRequest,
};
use roadcall::service::{DispatchService, NO_PROVIDERS_MESSAGE};
use serial_test::serial;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

fn manual_pickup() -> SetLocationRequest {
    SetLocationRequest {
        use_device: false,
        pickup: Some(cairo()),
        dropoff: None,
    }
}

// Drives a mechanic flow to the confirming step and returns its id.
async fn walk_to_confirming(service: &DispatchService) -> String {
    let started = service
        .start_flow(start_body(ServiceCategory::Mechanic, SituationKind::EngineFailure))
        .await
        .unwrap();
    let flow_id = started.flow_id;

    service.set_location(&flow_id, manual_pickup()).await.unwrap();

    let listed = service.list_candidates(&flow_id).await.unwrap();
    assert!(!listed.candidates.is_empty(), "seed fleet has mechanics");
    let provider_id = listed.candidates[0].provider.id.clone();

    let selected = service.select_provider(&flow_id, &provider_id).await.unwrap();
    assert_eq!(selected.status, RequestStatus::Confirming);
    assert!(selected.estimate_note.is_some(), "estimates must be labeled");

    flow_id
}

#[tokio::test]
#[serial]
async fn full_flow_reaches_succeeded() {
    init();
    let service = seed_service(Arc::new(AcceptingGateway::new(20)));

    let flow_id = walk_to_confirming(&service).await;
    let submitted = service.submit(&flow_id).await.unwrap();

    assert_eq!(submitted.status, RequestStatus::Succeeded);
    let request_id = submitted.request.request_id.unwrap();
    assert!(request_id.starts_with("MECH-"), "got {}", request_id);
}

#[tokio::test]
#[serial]
async fn candidates_come_back_nearest_first() {
    init();
    let service = seed_service(Arc::new(AcceptingGateway::new(10)));

    let started = service
        .start_flow(start_body(ServiceCategory::Tow, SituationKind::Accident))
        .await
        .unwrap();
    let flow_id = started.flow_id;

    service
        .set_location(
            &flow_id,
            SetLocationRequest {
                use_device: false,
                pickup: Some(cairo()),
                dropoff: Some(point(30.0561, 31.2394)),
            },
        )
        .await
        .unwrap();

    let listed = service.list_candidates(&flow_id).await.unwrap();
    assert!(listed.candidates.len() >= 2);
    for pair in listed.candidates.windows(2) {
        assert!(pair[0].distance_km <= pair[1].distance_km);
    }
}

#[tokio::test]
#[serial]
async fn device_location_feeds_the_pickup() {
    init();
    let service = seed_service(Arc::new(AcceptingGateway::new(10)));

    let started = service
        .start_flow(start_body(ServiceCategory::Fuel, SituationKind::OutOfFuel))
        .await
        .unwrap();

    let located = service
        .set_location(
            &started.flow_id,
            SetLocationRequest { use_device: true, pickup: None, dropoff: None },
        )
        .await
        .unwrap();

    assert_eq!(located.status, RequestStatus::Listing);
    let pickup = located.request.pickup.unwrap();
    assert!((pickup.latitude - cairo().latitude).abs() < 1e-9);
}

#[tokio::test]
#[serial]
async fn slow_device_acquisition_fails_over_to_manual_entry() {
    init();
    let config = DispatchConfig { location_timeout_ms: 50, ..DispatchConfig::default() };
    let service = DispatchService::new(
        config,
        Arc::new(StaticDirectory::seed(false)),
        // Device answers far too late
        Arc::new(FixedGeolocator::new(cairo(), 500)),
        Arc::new(AcceptingGateway::new(10)),
    );

    let started = service
        .start_flow(start_body(ServiceCategory::Mechanic, SituationKind::FlatTire))
        .await
        .unwrap();
    let flow_id = started.flow_id;

    let err = service
        .set_location(&flow_id, SetLocationRequest { use_device: true, pickup: None, dropoff: None })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::LocationUnavailable(_)));

    // The flow is still waiting; manual entry completes the step
    let located = service.set_location(&flow_id, manual_pickup()).await.unwrap();
    assert_eq!(located.status, RequestStatus::Listing);
}

#[tokio::test]
#[serial]
async fn denied_permission_is_not_fatal() {
    init();
    let service = DispatchService::new(
        DispatchConfig::default(),
        Arc::new(StaticDirectory::seed(false)),
        Arc::new(DeniedGeolocator),
        Arc::new(AcceptingGateway::new(10)),
    );

    let started = service
        .start_flow(start_body(ServiceCategory::Mechanic, SituationKind::DeadBattery))
        .await
        .unwrap();

    let err = service
        .set_location(
            &started.flow_id,
            SetLocationRequest { use_device: true, pickup: None, dropoff: None },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::LocationUnavailable(_)));

    let snapshot = service.get_flow(&started.flow_id).await.unwrap();
    assert_eq!(snapshot.status, RequestStatus::Locating);
}

#[tokio::test]
#[serial]
async fn specialist_query_surfaces_an_empty_state() {
    init();
    // A fleet with generic mechanics only
    let providers = vec![
        test_provider("m1", point(30.05, 31.24), &["mechanic"], 4.5, 100, hour_tariff(80.0, 100.0)),
        test_provider("m2", point(30.10, 31.30), &["mechanic"], 4.0, 50, hour_tariff(80.0, 100.0)),
    ];
    let service = custom_service(
        DispatchConfig::default(),
        providers,
        Arc::new(AcceptingGateway::new(10)),
    );

    let started = service
        .start_flow(StartRequest {
            category: ServiceCategory::Mechanic,
            situation: situation_with_spec(SituationKind::Other, "ac-specialist"),
            modifiers: Modifiers::default(),
        })
        .await
        .unwrap();
    let flow_id = started.flow_id;

    service.set_location(&flow_id, manual_pickup()).await.unwrap();
    let listed = service.list_candidates(&flow_id).await.unwrap();

    // Empty result is a state, not an error
    assert_eq!(listed.status, RequestStatus::Selecting);
    assert!(listed.candidates.is_empty());
    assert_eq!(listed.message.as_deref(), Some(NO_PROVIDERS_MESSAGE));
}

#[tokio::test]
#[serial]
async fn concurrent_submits_leave_exactly_one_in_flight() {
    init();
    // Slow gateway so the first submission is still outstanding when the
    // duplicate arrives
    let service = seed_service(Arc::new(AcceptingGateway::new(400)));
    let flow_id = walk_to_confirming(&service).await;

    let (first, second) =
        futures::future::join(service.submit(&flow_id), service.submit(&flow_id)).await;

    let results = [first, second];
    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1, "exactly one submission may go out");

    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(DispatchError::SubmissionInFlight)))
        .count();
    assert_eq!(rejected, 1, "the duplicate must be rejected as in-flight");
}

#[tokio::test]
#[serial]
async fn retryable_rejection_keeps_the_flow_resubmittable() {
    init();
    let service = seed_service(Arc::new(RejectingGateway::new("backend unavailable", true)));
    let flow_id = walk_to_confirming(&service).await;

    let err = service.submit(&flow_id).await.unwrap_err();
    assert!(matches!(err, DispatchError::Booking(_)));

    let snapshot = service.get_flow(&flow_id).await.unwrap();
    assert_eq!(snapshot.status, RequestStatus::Confirming);
    assert_eq!(snapshot.failure.as_deref(), Some("backend unavailable"));

    // A resubmit goes out again instead of being blocked as in-flight
    let err = service.submit(&flow_id).await.unwrap_err();
    assert!(matches!(err, DispatchError::Booking(_)));
}

#[tokio::test]
#[serial]
async fn definitive_rejection_terminates_the_flow() {
    init();
    let service = seed_service(Arc::new(RejectingGateway::new("provider refused the job", false)));
    let flow_id = walk_to_confirming(&service).await;

    let err = service.submit(&flow_id).await.unwrap_err();
    assert!(matches!(err, DispatchError::Booking(_)));

    let snapshot = service.get_flow(&flow_id).await.unwrap();
    assert_eq!(snapshot.status, RequestStatus::Failed);
    assert_eq!(snapshot.failure.as_deref(), Some("provider refused the job"));
}

#[tokio::test]
#[serial]
async fn backend_may_reissue_the_canonical_id() {
    init();
    let service = seed_service(Arc::new(AcceptingGateway::with_reissue(10, "BK")));
    let flow_id = walk_to_confirming(&service).await;

    let submitted = service.submit(&flow_id).await.unwrap();
    let request_id = submitted.request.request_id.unwrap();
    assert!(request_id.starts_with("BK-MECH-"), "got {}", request_id);
}

#[tokio::test]
#[serial]
async fn stepping_back_through_the_service_keeps_data() {
    init();
    let service = seed_service(Arc::new(AcceptingGateway::new(10)));
    let flow_id = walk_to_confirming(&service).await;

    let back = service.step_back(&flow_id).await.unwrap();
    assert_eq!(back.status, RequestStatus::Selecting);
    assert!(back.request.pickup.is_some());
    // The candidate list is visible again on the selecting step
    assert!(!back.candidates.is_empty());
}

#[tokio::test]
#[serial]
async fn store_capacity_is_enforced() {
    init();
    let config = DispatchConfig { max_active_flows: 1, ..DispatchConfig::default() };
    let service = DispatchService::new(
        config,
        Arc::new(StaticDirectory::seed(false)),
        Arc::new(FixedGeolocator::new(cairo(), 10)),
        Arc::new(AcceptingGateway::new(10)),
    );

    service
        .start_flow(start_body(ServiceCategory::Fuel, SituationKind::OutOfFuel))
        .await
        .unwrap();

    let err = service
        .start_flow(start_body(ServiceCategory::Tow, SituationKind::Accident))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::StoreFull));
}

#[tokio::test]
#[serial]
async fn unknown_flows_are_not_found() {
    init();
    let service = seed_service(Arc::new(AcceptingGateway::new(10)));

    let err = service.get_flow("no-such-flow").await.unwrap_err();
    assert!(matches!(err, DispatchError::NotFound(_)));
}

#[tokio::test]
#[serial]
async fn abandoned_flows_expire() {
    init();
    let config = DispatchConfig {
        flow_ttl_seconds: 1,
        cleanup_interval_ms: 50,
        ..DispatchConfig::default()
    };
    let service = DispatchService::new(
        config,
        Arc::new(StaticDirectory::seed(false)),
        Arc::new(FixedGeolocator::new(cairo(), 10)),
        Arc::new(AcceptingGateway::new(10)),
    );

    let started = service
        .start_flow(start_body(ServiceCategory::Mechanic, SituationKind::Overheating))
        .await
        .unwrap();

    sleep(Duration::from_millis(1300)).await;

    let err = service.get_flow(&started.flow_id).await.unwrap_err();
    assert!(matches!(err, DispatchError::NotFound(_)));

    let health = service.health_status().await.unwrap();
    assert!(health.flow_stats.expired_count >= 1);
}

#[tokio::test]
#[serial]
async fn health_reports_flow_counters() {
    init();
    let service = seed_service(Arc::new(AcceptingGateway::new(10)));

    let flow_id = walk_to_confirming(&service).await;
    service.submit(&flow_id).await.unwrap();

    // Counters are updated by the event collector task
    sleep(Duration::from_millis(100)).await;

    let health = service.health_status().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.metrics.get("provider_count"), Some(&9));
    assert!(health.flow_stats.active_flows >= 1);
    assert!(health.flow_stats.submitted_count >= 1);
    assert!(health.flow_stats.succeeded_count >= 1);
}
