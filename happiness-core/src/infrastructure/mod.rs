// happiness-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod archive;
pub mod charts;
pub mod config;
pub mod error;
pub mod fs;
pub mod http;
pub mod templates;
pub mod web;
