// The pure core: distance math, candidate ranking, price estimation, and the
// request lifecycle state machine. Nothing in here performs I/O; the service
// layer feeds in directory snapshots and collaborator outcomes.
pub mod geo;
pub mod lifecycle;
pub mod matching;
pub mod pricing;

// Public exports from the engine module. The geo submodule is addressed via
// self to keep it distinct from the geo crate.
pub use self::geo::{distance_km, validate_point};
pub use self::lifecycle::{generate_request_id, RequestFlow};
pub use self::matching::{rank_providers, tag_matches};
pub use self::pricing::{estimate, TariffRates};
