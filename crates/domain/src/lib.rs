//! Domain-level building blocks shared across the storage and collector
//! crates: configuration, snapshot/row model, storage contracts and
//! telemetry wiring.

pub mod config;
pub mod model;
pub mod services;
pub mod storage;

pub use storage::*;
