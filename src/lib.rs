//! Roadcall is a proximity-based roadside service matching and dispatch
//! service. It unifies fuel delivery, mobile-mechanic dispatch, and tow-truck
//! dispatch behind one parameterized engine: rank nearby providers for a
//! requested service category, estimate the cost of the job, and walk a
//! request through its lifecycle until it is handed to the booking backend.
//!
//! The crate is split into a pure core (`engine`) that is testable without
//! any I/O, collaborator seams (`directory`, `location`, `booking`) that are
//! swapped for real backends or test doubles, and a thin HTTP layer
//! (`service` + `api`) that drives one lifecycle flow per client session.

pub mod api;       // HTTP endpoint handlers
pub mod booking;   // Booking collaborator seam
pub mod config;    // Configuration management
pub mod directory; // Provider directory seam
pub mod engine;    // Matching, pricing, distance, lifecycle core
pub mod error;     // Error types and handling
pub mod location;  // Geolocation collaborator seam
pub mod models;    // Data structures and types
pub mod service;   // Flow orchestration
