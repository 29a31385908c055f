//! Synthetic e-banking telemetry: environment-parameterized metric
//! simulation with a continuous Prometheus exporter (tick mode) and a
//! mock payment API (event mode).

pub mod catalog;
pub mod dist;
pub mod error;
pub mod forwarder;
pub mod payment;
pub mod profile;
pub mod simulation;
pub mod sink;

pub use error::SimError;
pub use profile::Environment;
pub use sink::{MemorySink, PrometheusSink, Sink};
