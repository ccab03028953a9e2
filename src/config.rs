//! Configuration management for the roadcall service.
//!
//! This module provides configuration handling via environment variables with
//! sensible defaults. All parameters can be customized through environment
//! variables with the ROADCALL_ prefix.
//!
//! # Environment Variables
//! - ROADCALL_MAX_ACTIVE_FLOWS: Maximum concurrently tracked flows (default: 500)
//! - ROADCALL_FLOW_TTL_SECONDS: Lifetime of an abandoned flow (default: 1800)
//! - ROADCALL_CLEANUP_INTERVAL_MS: Flow store sweep interval (default: 60000)
//! - ROADCALL_LOCATION_TIMEOUT_MS: Device geolocation timeout (default: 5000)
//! - ROADCALL_EMERGENCY_SURCHARGE: Flat emergency fee (default: 200.0)
//! - ROADCALL_PREMIUM_SURCHARGE: Flat premium-tier fee (default: 100.0)
//! - ROADCALL_ASSUMED_SERVICE_HOURS: Billed duration for hourly tariffs (default: 1.0)
//! - ROADCALL_EXACT_CATEGORY_MATCH: Disable substring-tolerant tag matching (default: false)
//! - ROADCALL_DIRECTORY_PATH: JSON file with the provider fleet (default: built-in seed)

use crate::engine::pricing::TariffRates;
use serde::Deserialize;
use std::env;

/// Prefix for all roadcall environment variables.
const ENV_PREFIX: &str = "ROADCALL_";

/// Configuration parameters for the dispatch service.
///
/// This struct holds all configurable parameters that affect:
/// - Candidate matching behavior
/// - Price estimation
/// - Flow store management and resource limits
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of flows held in the store at once.
    /// Must be positive. Prevents memory exhaustion under high load.
    pub max_active_flows: usize,

    /// How long an inactive flow is kept before the cleanup task removes it.
    /// Must be positive. Specified in seconds.
    pub flow_ttl_seconds: u64,

    /// Interval at which expired flows are removed from the store.
    /// Must be positive. Specified in milliseconds.
    pub cleanup_interval_ms: u64,

    /// How long to wait for the device geolocation collaborator before
    /// failing over to manual entry. Must be positive. In milliseconds.
    pub location_timeout_ms: u64,

    /// Flat surcharge applied when the emergency modifier is set.
    /// Must be non-negative.
    pub emergency_surcharge: f64,

    /// Flat surcharge applied when the premium-tier modifier is set.
    /// Must be non-negative.
    pub premium_surcharge: f64,

    /// Billed duration assumed for hourly tariffs, since the real duration
    /// is unknown at estimation time. Must be positive. In hours.
    pub assumed_service_hours: f64,

    /// When true, provider tags must equal the requested tag
    /// (case-insensitively) instead of the substring-tolerant default.
    pub exact_category_match: bool,

    /// Optional path to a JSON provider directory loaded at startup.
    /// When unset the built-in seed fleet is used.
    pub directory_path: Option<String>,
}

impl DispatchConfig {
    /// Attempts to load configuration from environment variables.
    ///
    /// All variables must be prefixed with "ROADCALL_". For example:
    /// - ROADCALL_MAX_ACTIVE_FLOWS=1000
    /// - ROADCALL_EMERGENCY_SURCHARGE=250.0
    ///
    /// # Returns
    /// - Ok(config) if all present variables parse and validate
    /// - Err(message) if any variable is invalid
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists for local development
        dotenv::dotenv().ok();

        let env_vars: std::collections::HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .map(|(k, v)| (k.trim_start_matches(ENV_PREFIX).to_string(), v))
            .collect();

        match envy::from_iter::<_, Self>(env_vars.into_iter()) {
            Ok(config) => {
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(format!("Failed to parse environment variables: {}", e)),
        }
    }

    /// Loads configuration from environment variables, falling back to
    /// defaults if they are not set or are invalid.
    pub fn from_env_or_default() -> Self {
        Self::from_env().unwrap_or_default()
    }

    /// The tariff-rate table handed to the pricing estimator. Surcharge
    /// constants are defined here once rather than at each call site.
    pub fn tariff_rates(&self) -> TariffRates {
        TariffRates {
            emergency_surcharge: self.emergency_surcharge,
            premium_surcharge: self.premium_surcharge,
            assumed_service_hours: self.assumed_service_hours,
        }
    }

    /// Validates all configuration parameters.
    ///
    /// # Validation Rules
    /// - Store capacity, TTL, intervals and timeouts must be positive
    /// - Surcharges must be non-negative
    /// - The assumed hourly duration must be positive
    ///
    /// # Returns
    /// - Ok(()) if all validation passes
    /// - Err(message) with the first validation failure
    pub fn validate(&self) -> Result<(), String> {
        if self.max_active_flows == 0 {
            return Err("max_active_flows must be positive".to_string());
        }
        if self.flow_ttl_seconds == 0 {
            return Err("flow_ttl_seconds must be positive".to_string());
        }
        if self.cleanup_interval_ms == 0 {
            return Err("cleanup_interval_ms must be positive".to_string());
        }
        if self.location_timeout_ms == 0 {
            return Err("location_timeout_ms must be positive".to_string());
        }
        if self.emergency_surcharge < 0.0 || self.premium_surcharge < 0.0 {
            return Err("surcharges must be non-negative".to_string());
        }
        if self.assumed_service_hours <= 0.0 {
            return Err("assumed_service_hours must be positive".to_string());
        }
        Ok(())
    }
}

/// Default configuration values optimized for typical use cases.
impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_active_flows: 500,      // Plenty for one storefront instance
            flow_ttl_seconds: 1800,     // Abandon after 30 minutes
            cleanup_interval_ms: 60_000, // Sweep every minute
            location_timeout_ms: 5_000, // Fail over to manual entry after 5s
            emergency_surcharge: 200.0,
            premium_surcharge: 100.0,
            assumed_service_hours: 1.0,
            exact_category_match: false, // Substring-tolerant tags by default
            directory_path: None,       // Built-in seed fleet
        }
    }
}
