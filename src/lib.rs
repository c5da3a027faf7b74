//! Kennelmate care pipeline.
//!
//! Turns a stream of timestamped care events (feedings, potty breaks,
//! medications, weight checks, observations) per animal into:
//! - a same-day status view with a TTL-bounded in-memory cache,
//! - optimistically-updated, deduplicated per-cell toggle mutations,
//! - rule-based health trend detectors that raise/resolve alerts.
//!
//! Page-level code consumes everything through [`service::CareService`].
//! The backing store is injected via [`store::EventStore`]; a SQLite
//! implementation and an in-memory implementation are provided.

pub mod cache; // TTL snapshot cache
pub mod config; // tunable TTLs, debounce window, detector thresholds
pub mod models;
pub mod service; // CareService facade
pub mod status; // daily status aggregator
pub mod store;
pub mod toggle; // optimistic per-cell mutation controller
pub mod trends; // health trend detection engine

use tracing_subscriber::EnvFilter;

/// Install the default tracing subscriber (env-filtered).
///
/// Intended for binaries and integration harnesses; the library itself
/// never initializes global state. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}
