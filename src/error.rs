//! Error taxonomy for the simulation engine.
//!
//! Only two of these indicate software defects: `InvalidWeights` (malformed
//! distribution configuration, fatal at startup) and `LabelSchemaMismatch`
//! (catalog misuse, fails loudly). `PaymentFailed` is the deliberately
//! sampled non-success business outcome and is surfaced to callers as a
//! normal typed result, never an unhandled fault.

use crate::payment::PaymentStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Weight vector is empty, contains a negative weight, or sums to zero.
    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    /// Supplied labels do not match the label keys declared in the catalog.
    #[error("label schema mismatch for `{series}`: expected {expected:?}, got {got:?}")]
    LabelSchemaMismatch {
        series: String,
        expected: Vec<String>,
        got: Vec<String>,
    },

    /// Observation targeted a series that is not in the catalog.
    #[error("unknown metric series `{0}`")]
    UnknownSeries(String),

    /// Failure from the metrics registry backing the Prometheus sink.
    #[error("metrics registry: {0}")]
    Registry(#[from] prometheus::Error),

    /// The sampled payment outcome was not a success. This is the documented
    /// unsuccessful result of event mode, not a transport fault.
    #[error("payment {status}")]
    PaymentFailed { status: PaymentStatus },
}
