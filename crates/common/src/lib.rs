//! Shared configuration, data model, errors and counters for AlertRelay.

pub mod config;
pub mod error;
pub mod stats;
pub mod types;
