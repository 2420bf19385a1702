// happiness-core/src/lib.rs

#![allow(missing_docs)]
// Memory safety
#![deny(unsafe_code)]
// Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts for the tabular engine and remote sources.
pub mod ports;

// 2. Domain
// Naming rules, alias map, vocabularies, frames, statistics.
// Depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB, HTTP, archives, config files, charts, templates, web server.
pub mod infrastructure;

// 4. Application (Use Cases)
// Import, load, clean, reconcile, explore, orchestrate.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::HappinessError;
