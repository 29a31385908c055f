//! Environment profiles controlling volume and rate characteristics.
//!
//! Profiles are process-wide statics, resolved once at startup and shared
//! read-only across every emission call. An unknown environment name falls
//! back to `training` instead of failing: the simulator must never refuse to
//! start over a misconfigured environment variable.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Development,
    Training,
}

impl Environment {
    /// Resolve an environment by name, defaulting to `Training` for any
    /// name outside the fixed enumeration.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            "development" => Environment::Development,
            _ => Environment::Training,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
            Environment::Training => "training",
        }
    }

    /// O(1) lookup of the simulation parameters for this environment.
    pub fn profile(&self) -> &'static EnvironmentProfile {
        match self {
            Environment::Production => &PRODUCTION,
            Environment::Staging => &STAGING,
            Environment::Development => &DEVELOPMENT,
            Environment::Training => &TRAINING,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction outcome as emitted on the tick-mode transaction counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Failed,
    Pending,
    Cancelled,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Success => "success",
            TxStatus::Failed => "failed",
            TxStatus::Pending => "pending",
            TxStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Immutable bundle of simulation parameters for one environment.
#[derive(Debug)]
pub struct EnvironmentProfile {
    pub environment: Environment,
    /// Scales the 2-5 base transactions per tick.
    pub transaction_multiplier: f64,
    /// Per-tick probability of emitting an API error observation.
    pub error_rate: f64,
    /// Per-tick probability of emitting a fraud alert observation.
    pub fraud_rate: f64,
    pub base_revenue: f64,
    pub base_sessions: i64,
    /// Relative weights over transaction outcomes; normalized at sample time.
    pub outcome_weights: [(TxStatus, f64); 4],
    /// Severity mix for API errors. Production skews low.
    pub error_severity_weights: [(Severity, f64); 4],
    /// Severity mix for fraud alerts. Production skews high, unlike errors:
    /// a real production system surfaces mostly critical fraud.
    pub fraud_severity_weights: [(Severity, f64); 4],
    /// Customer satisfaction band, sampled uniformly.
    pub satisfaction_range: (f64, f64),
}

static PRODUCTION: EnvironmentProfile = EnvironmentProfile {
    environment: Environment::Production,
    transaction_multiplier: 5.0,
    error_rate: 0.01,
    fraud_rate: 0.005,
    base_revenue: 250_000.0,
    base_sessions: 500,
    outcome_weights: [
        (TxStatus::Success, 97.0),
        (TxStatus::Failed, 2.0),
        (TxStatus::Pending, 0.5),
        (TxStatus::Cancelled, 0.5),
    ],
    error_severity_weights: [
        (Severity::Low, 50.0),
        (Severity::Medium, 35.0),
        (Severity::High, 13.0),
        (Severity::Critical, 2.0),
    ],
    fraud_severity_weights: [
        (Severity::Low, 20.0),
        (Severity::Medium, 30.0),
        (Severity::High, 35.0),
        (Severity::Critical, 15.0),
    ],
    satisfaction_range: (92.0, 98.0),
};

static STAGING: EnvironmentProfile = EnvironmentProfile {
    environment: Environment::Staging,
    transaction_multiplier: 3.0,
    error_rate: 0.03,
    fraud_rate: 0.01,
    base_revenue: 150_000.0,
    base_sessions: 300,
    outcome_weights: [
        (TxStatus::Success, 94.0),
        (TxStatus::Failed, 4.0),
        (TxStatus::Pending, 1.0),
        (TxStatus::Cancelled, 1.0),
    ],
    error_severity_weights: [
        (Severity::Low, 40.0),
        (Severity::Medium, 35.0),
        (Severity::High, 20.0),
        (Severity::Critical, 5.0),
    ],
    fraud_severity_weights: [
        (Severity::Low, 30.0),
        (Severity::Medium, 40.0),
        (Severity::High, 25.0),
        (Severity::Critical, 5.0),
    ],
    satisfaction_range: (88.0, 96.0),
};

static DEVELOPMENT: EnvironmentProfile = EnvironmentProfile {
    environment: Environment::Development,
    transaction_multiplier: 1.5,
    error_rate: 0.08,
    fraud_rate: 0.02,
    base_revenue: 75_000.0,
    base_sessions: 150,
    outcome_weights: [
        (TxStatus::Success, 88.0),
        (TxStatus::Failed, 7.0),
        (TxStatus::Pending, 3.0),
        (TxStatus::Cancelled, 2.0),
    ],
    error_severity_weights: [
        (Severity::Low, 30.0),
        (Severity::Medium, 35.0),
        (Severity::High, 25.0),
        (Severity::Critical, 10.0),
    ],
    fraud_severity_weights: [
        (Severity::Low, 40.0),
        (Severity::Medium, 35.0),
        (Severity::High, 20.0),
        (Severity::Critical, 5.0),
    ],
    satisfaction_range: (80.0, 92.0),
};

static TRAINING: EnvironmentProfile = EnvironmentProfile {
    environment: Environment::Training,
    transaction_multiplier: 2.0,
    error_rate: 0.05,
    fraud_rate: 0.015,
    base_revenue: 100_000.0,
    base_sessions: 200,
    outcome_weights: [
        (TxStatus::Success, 90.0),
        (TxStatus::Failed, 7.0),
        (TxStatus::Pending, 2.0),
        (TxStatus::Cancelled, 1.0),
    ],
    error_severity_weights: [
        (Severity::Low, 30.0),
        (Severity::Medium, 35.0),
        (Severity::High, 25.0),
        (Severity::Critical, 10.0),
    ],
    fraud_severity_weights: [
        (Severity::Low, 40.0),
        (Severity::Medium, 35.0),
        (Severity::High, 20.0),
        (Severity::Critical, 5.0),
    ],
    satisfaction_range: (85.0, 95.0),
};

/// The fixed enumeration of selectable environments.
pub const ENVIRONMENTS: [Environment; 4] = [
    Environment::Production,
    Environment::Staging,
    Environment::Development,
    Environment::Training,
];
