//! Core vocabulary for the mockconn in-process connection emulator.
//!
//! This crate defines the types the rest of the workspace speaks: errors,
//! endpoint addresses, link configuration, link state, and metrics
//! snapshots. No pipeline code lives here.
//!
//! # Structure
//!
//! - [`error`]   — [`MockConnError`] and [`Result<T>`] alias
//! - [`addr`]    — [`EndpointAddr`] (label + `"mockconn"` family tag)
//! - [`config`]  — [`LinkConfig`] and its presets
//! - [`state`]   — [`LinkState`] half-close states
//! - [`metrics`] — [`LinkMetrics`] counter snapshot

mod addr;
mod config;
mod error;
mod metrics;
mod state;

// --- error
pub use error::{MockConnError, Result};

// --- addr
pub use addr::EndpointAddr;

// --- config
pub use config::LinkConfig;

// --- state
pub use state::LinkState;

// --- metrics
pub use metrics::LinkMetrics;
