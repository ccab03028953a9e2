//! Main entry point for the roadcall service.
//! Sets up the HTTP server, configures logging, and wires the dispatch
//! service to its collaborators with environment-based configuration.

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::sync::Arc;

use roadcall::api;
use roadcall::booking::AcceptingGateway;
use roadcall::config::DispatchConfig;
use roadcall::directory::StaticDirectory;
use roadcall::location::FixedGeolocator;
use roadcall::models::GeoPoint;
use roadcall::service::DispatchService;

/// Main entry point for the roadcall service.
///
/// # Server Configuration
/// - Binds to 0.0.0.0 with the port from the PORT env var (default 8080)
/// - All flow endpoints are under the /dispatch prefix
///
/// # Environment Variables
/// Configuration can be customized via ROADCALL_-prefixed variables, see
/// the config module. RUST_LOG controls the log level.
///
/// # Error Handling
/// - Uses env_logger for logging
/// - Returns std::io::Error for server startup issues
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging with env_logger
    // Log level can be set via RUST_LOG environment variable
    env_logger::init();

    log::info!("Starting roadcall service...");

    // Load configuration from environment variables
    // Falls back to defaults if env vars not set
    let config = DispatchConfig::from_env_or_default();
    log::info!("Starting roadcall service with configuration: {:?}", config);

    // Provider fleet: a JSON directory when configured, the built-in seed
    // fleet otherwise
    let directory = match &config.directory_path {
        Some(path) => StaticDirectory::from_json_file(path, config.exact_category_match)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?,
        None => StaticDirectory::seed(config.exact_category_match),
    };

    // Collaborator stubs: the storefront bridges real device geolocation
    // and the booking backend; these stand in until those are wired.
    let locator = FixedGeolocator::new(GeoPoint::new(30.0444, 31.2357), 50);
    let gateway = AcceptingGateway::new(150);

    // Initialize the dispatch service with configuration
    // Wrapped in web::Data for thread-safe sharing
    let service = web::Data::new(DispatchService::new(
        config,
        Arc::new(directory),
        Arc::new(locator),
        Arc::new(gateway),
    ));

    // Configure and start the HTTP server
    // Get port from environment variable or use default
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .expect("PORT environment variable must be a valid port number");

    log::info!("Starting server on port {}", port);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive()) // The storefront UI runs on its own origin
            .app_data(service.clone()) // Share service state across workers
            .service(
                web::scope("/dispatch") // All flow endpoints under /dispatch
                    .service(api::start)
                    .service(api::set_location)
                    .service(api::list_candidates)
                    .service(api::select)
                    .service(api::submit)
                    .service(api::back)
                    .service(api::get_request)
                    .service(api::health),
            )
            // Register root-level health endpoint for platform health checks
            .service(api::root_health)
    })
    .bind(("0.0.0.0", port))? // Bind to all interfaces with dynamic port
    .run() // Start the server
    .await
}
