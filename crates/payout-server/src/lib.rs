//! HTTP front end for the [`payout`] withdrawal dispatcher.
//!
//! # Modules
//!
//! - [`routes`]: health, chain diagnostics, engine session start/stop, withdraw, metrics
//! - [`state`]: shared [`AppState`](state::AppState)
//! - [`config`]: environment configuration
//! - [`bootstrap`]: builds the state, tolerating a missing signing key
//! - [`sessions`]: in-memory per-wallet sessions
//! - [`metrics`]: Prometheus counters and histograms for dispatches

pub mod bootstrap;
pub mod config;
pub mod metrics;
pub mod routes;
pub mod sessions;
pub mod state;
