//! Price estimation from a provider tariff, a computed distance, and the
//! request modifiers.

use crate::models::{Modifiers, RateUnit, Tariff};
use serde::{Deserialize, Serialize};

/// Service-wide rate table for the estimator. Surcharge constants are
/// configured once here instead of being scattered across call sites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TariffRates {
    /// Flat fee added when the emergency modifier is set
    pub emergency_surcharge: f64,
    /// Flat fee added when the premium-tier modifier is set
    pub premium_surcharge: f64,
    /// Billed duration assumed for hourly tariffs, in hours
    pub assumed_service_hours: f64,
}

impl Default for TariffRates {
    fn default() -> Self {
        Self {
            emergency_surcharge: 200.0,
            premium_surcharge: 100.0,
            assumed_service_hours: 1.0,
        }
    }
}

/// Estimated total for a job: `base_fee + per_unit_rate * units` plus flat
/// surcharges for each set modifier.
///
/// `units` is the trip distance for per-km tariffs and the configured
/// assumed duration for hourly tariffs (the real duration is unknown at
/// estimation time). The result is clamped to be non-negative and is an
/// estimate, explicitly not a final charge; callers must label it as such.
pub fn estimate(
    tariff: &Tariff,
    distance_km: f64,
    modifiers: &Modifiers,
    rates: &TariffRates,
) -> f64 {
    let units = match tariff.unit {
        RateUnit::Km => distance_km,
        RateUnit::Hour => rates.assumed_service_hours,
    };

    let mut total = tariff.base_fee + tariff.per_unit_rate * units;
    if modifiers.emergency {
        total += rates.emergency_surcharge;
    }
    if modifiers.premium_tier {
        total += rates.premium_surcharge;
    }

    log::debug!(
        "Estimated {:.2} for tariff (base {:.2}, rate {:.2}/{:?}) over {:.2}km",
        total,
        tariff.base_fee,
        tariff.per_unit_rate,
        tariff.unit,
        distance_km
    );

    total.max(0.0)
}
