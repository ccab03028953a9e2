//! Candidate matching: filter a provider snapshot by tag and availability,
//! annotate survivors with their distance from the requester, and rank them.

use crate::engine::geo::distance_km;
use crate::models::{GeoPoint, MatchCandidate, Provider};
use std::cmp::Ordering;

/// Whether a provider tag satisfies the requested tag.
///
/// The default mode is case-insensitive and substring-tolerant in both
/// directions, as a courtesy to loosely curated directory data ("towing"
/// matches "tow", "mechanic" matches "mobile mechanic"). Exact mode reduces
/// this to case-insensitive equality.
pub fn tag_matches(provider_tag: &str, requested: &str, exact: bool) -> bool {
    let tag = provider_tag.trim().to_lowercase();
    let wanted = requested.trim().to_lowercase();
    if tag.is_empty() || wanted.is_empty() {
        return false;
    }
    if exact {
        tag == wanted
    } else {
        tag.contains(&wanted) || wanted.contains(&tag)
    }
}

/// Ranks the providers that can serve the request.
///
/// 1. Keep providers that are available and carry a matching tag.
/// 2. Annotate each survivor with its distance from the requester.
/// 3. Sort ascending by distance; ties broken by descending rating, then
///    descending review count.
///
/// Pure over the supplied snapshot: same inputs, same ordered output. An
/// empty result is a valid outcome, not an error.
pub fn rank_providers(
    providers: &[Provider],
    requester: &GeoPoint,
    requested_tag: &str,
    exact: bool,
) -> Vec<MatchCandidate> {
    let mut candidates: Vec<MatchCandidate> = providers
        .iter()
        .filter(|p| p.available)
        .filter(|p| p.categories.iter().any(|t| tag_matches(t, requested_tag, exact)))
        .map(|p| MatchCandidate {
            distance_km: distance_km(requester, &p.location),
            provider: p.clone(),
        })
        .collect();

    candidates.sort_by(|a, b| compare_candidates(a, b));

    log::debug!(
        "Ranked {} of {} providers for tag '{}' (exact: {})",
        candidates.len(),
        providers.len(),
        requested_tag,
        exact
    );

    candidates
}

// Nearest first; a better-rated, better-reviewed provider wins a distance tie.
fn compare_candidates(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    a.distance_km
        .total_cmp(&b.distance_km)
        .then(b.provider.rating.total_cmp(&a.provider.rating))
        .then(b.provider.review_count.cmp(&a.provider.review_count))
}
