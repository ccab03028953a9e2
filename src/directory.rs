//! Provider directory seam.
//!
//! The matching engine never owns provider data; it works over a read-only
//! snapshot handed to it per query. This module defines the capability trait
//! the engine consumes and an in-memory implementation seeded at startup,
//! so a real backend or a test double can be substituted without touching
//! the matching logic.

use crate::engine::matching::tag_matches;
use crate::error::DispatchError;
use crate::models::{GeoPoint, Provider, RateUnit, Tariff};

/// Read-only access to the provider fleet.
///
/// Implementations must be thread-safe; the service queries once per match
/// and treats the returned snapshot as immutable.
#[async_trait::async_trait]
pub trait ProviderDirectory: Send + Sync + 'static {
    /// Snapshot of providers carrying a tag that matches `tag`.
    async fn list_by_category(&self, tag: &str) -> Result<Vec<Provider>, DispatchError>;

    /// Number of providers known to the directory.
    async fn provider_count(&self) -> usize;
}

/// In-memory directory backed by a fixed provider list.
///
/// Static for the session: `available` flags are whatever the load said and
/// nothing in-session mutates the fleet.
#[derive(Clone)]
pub struct StaticDirectory {
    providers: Vec<Provider>,
    /// Tag matching mode, shared with the engine via configuration
    exact_match: bool,
}

impl StaticDirectory {
    pub fn new(providers: Vec<Provider>, exact_match: bool) -> Self {
        Self { providers, exact_match }
    }

    /// Parses a provider fleet from a JSON array.
    pub fn from_json(data: &str, exact_match: bool) -> Result<Self, DispatchError> {
        let providers: Vec<Provider> = serde_json::from_str(data)
            .map_err(|e| DispatchError::Validation(format!("invalid provider directory: {}", e)))?;
        log::info!("Loaded {} providers from JSON directory", providers.len());
        Ok(Self::new(providers, exact_match))
    }

    /// Loads a provider fleet from a JSON file on disk.
    pub fn from_json_file(path: &str, exact_match: bool) -> Result<Self, DispatchError> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Internal(format!("cannot read provider directory {}: {}", path, e))
        })?;
        Self::from_json(&data, exact_match)
    }

    /// The built-in mock fleet used when no directory file is configured:
    /// fuel couriers, mobile mechanics, and tow operators around Cairo.
    pub fn seed(exact_match: bool) -> Self {
        let providers = vec![
            provider(
                "fuel-01",
                "Misr Fuel Express",
                GeoPoint::new(30.0561, 31.2394),
                &["fuel", "gasoline"],
                true,
                4.6,
                212,
                Tariff { base_fee: 50.0, per_unit_rate: 5.0, unit: RateUnit::Km },
                25,
            ),
            provider(
                "fuel-02",
                "Nile Petro Mobile",
                GeoPoint::new(30.0251, 31.2107),
                &["fuel", "diesel"],
                true,
                4.2,
                97,
                Tariff { base_fee: 40.0, per_unit_rate: 6.0, unit: RateUnit::Km },
                30,
            ),
            provider(
                "fuel-03",
                "Zamalek Fuel Point",
                GeoPoint::new(30.0609, 31.2197),
                &["fuel"],
                false, // off shift
                4.9,
                388,
                Tariff { base_fee: 55.0, per_unit_rate: 5.0, unit: RateUnit::Km },
                15,
            ),
            provider(
                "mech-01",
                "Hassan Mobile Garage",
                GeoPoint::new(30.0502, 31.2401),
                &["mechanic", "electrical"],
                true,
                4.8,
                324,
                Tariff { base_fee: 100.0, per_unit_rate: 120.0, unit: RateUnit::Hour },
                35,
            ),
            provider(
                "mech-02",
                "Tahrir Auto Rescue",
                GeoPoint::new(30.0482, 31.2336),
                &["mechanic", "ac-specialist"],
                true,
                4.5,
                151,
                Tariff { base_fee: 90.0, per_unit_rate: 140.0, unit: RateUnit::Hour },
                40,
            ),
            provider(
                "mech-03",
                "Giza Roadside Workshop",
                GeoPoint::new(29.9871, 31.2118),
                &["mobile mechanic"],
                true,
                4.1,
                63,
                Tariff { base_fee: 80.0, per_unit_rate: 100.0, unit: RateUnit::Hour },
                45,
            ),
            provider(
                "tow-01",
                "Heliopolis Towing Co",
                GeoPoint::new(30.0881, 31.3242),
                &["tow", "flatbed"],
                true,
                4.7,
                409,
                Tariff { base_fee: 150.0, per_unit_rate: 8.0, unit: RateUnit::Km },
                20,
            ),
            provider(
                "tow-02",
                "Ring Road Recovery",
                GeoPoint::new(30.0073, 31.2785),
                &["towing", "heavy-tow"],
                true,
                4.3,
                178,
                Tariff { base_fee: 120.0, per_unit_rate: 10.0, unit: RateUnit::Km },
                25,
            ),
            provider(
                "tow-03",
                "Maadi Night Tow",
                GeoPoint::new(29.9602, 31.2569),
                &["tow"],
                false, // daytime only
                3.9,
                41,
                Tariff { base_fee: 100.0, per_unit_rate: 9.0, unit: RateUnit::Km },
                50,
            ),
        ];

        log::info!("Seeded static directory with {} providers", providers.len());
        Self::new(providers, exact_match)
    }
}

#[async_trait::async_trait]
impl ProviderDirectory for StaticDirectory {
    async fn list_by_category(&self, tag: &str) -> Result<Vec<Provider>, DispatchError> {
        let snapshot: Vec<Provider> = self
            .providers
            .iter()
            .filter(|p| p.categories.iter().any(|t| tag_matches(t, tag, self.exact_match)))
            .cloned()
            .collect();

        log::debug!(
            "Directory query '{}' returned {} of {} providers",
            tag,
            snapshot.len(),
            self.providers.len()
        );
        Ok(snapshot)
    }

    async fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

fn provider(
    id: &str,
    name: &str,
    location: GeoPoint,
    categories: &[&str],
    available: bool,
    rating: f64,
    review_count: u32,
    tariff: Tariff,
    eta_minutes: u32,
) -> Provider {
    Provider {
        id: id.to_string(),
        name: name.to_string(),
        location,
        categories: categories.iter().map(|c| c.to_string()).collect(),
        available,
        rating,
        review_count,
        tariff,
        eta_minutes,
        image_url: None,
    }
}
