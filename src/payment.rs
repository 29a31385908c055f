//! Event (API) emission mode: one realistic payment outcome per call.
//!
//! A single invocation walks a fixed sequence: resolve the amount, sample
//! the status from normalized outcome weights, synthesize timing and
//! dimensional labels, emit metrics, and settle in exactly one terminal
//! state (completed, failed or pending). Retries are the caller's business.

use crate::catalog;
use crate::dist::{gaussian_floored, pick, uniform, weighted_choice};
use crate::error::SimError;
use crate::sink::{Sink, SinkError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

const PAYMENT_METHODS: &[&str] = &["card", "bank_transfer", "wallet", "crypto"];
const REGIONS: &[&str] = &["EU", "US", "ASIA", "LATAM"];
const CARD_BRANDS: &[&str] = &["VISA", "MASTERCARD", "AMEX", "DISCOVER"];
const RISK_LEVELS: &[(&str, f64)] = &[
    ("low", 0.80),
    ("medium", 0.15),
    ("high", 0.04),
    ("critical", 0.01),
];

/// Fee schedule: 2.9% plus a 0.30 flat surcharge.
const FEE_RATE: f64 = 0.029;
const FEE_FLAT: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative outcome proportions, caller-overridable per request.
///
/// Arbitrary non-negative values are accepted and renormalized before
/// sampling, so overrides only ever express relative proportions. An
/// all-zero or otherwise unusable override falls back to the default
/// 84/1/15 split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeWeights {
    pub success: f64,
    pub failed: f64,
    pub pending: f64,
}

impl Default for OutcomeWeights {
    fn default() -> Self {
        Self {
            success: 0.84,
            failed: 0.01,
            pending: 0.15,
        }
    }
}

impl OutcomeWeights {
    /// Build from optional percentage values, e.g. header overrides.
    /// Missing values take the documented defaults (84/1/15); negative
    /// values are clamped to zero before normalization.
    pub fn from_percentages(success: Option<f64>, failed: Option<f64>, pending: Option<f64>) -> Self {
        Self {
            success: success.unwrap_or(84.0).max(0.0) / 100.0,
            failed: failed.unwrap_or(1.0).max(0.0) / 100.0,
            pending: pending.unwrap_or(15.0).max(0.0) / 100.0,
        }
        .normalized()
    }

    /// Rescale so the three weights sum to 1. Idempotent; degenerate
    /// inputs fall back to the default split.
    pub fn normalized(&self) -> Self {
        let total = self.success + self.failed + self.pending;
        if !total.is_finite() || total <= 0.0 {
            return Self::default();
        }
        Self {
            success: self.success / total,
            failed: self.failed / total,
            pending: self.pending / total,
        }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> PaymentStatus {
        let weights = self.normalized();
        let r = rng.random::<f64>();
        if r < weights.success {
            PaymentStatus::Success
        } else if r < weights.success + weights.failed {
            PaymentStatus::Failed
        } else {
            PaymentStatus::Pending
        }
    }
}

/// Inbound payment request. `amount = 0` means auto-generate.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    #[serde(default)]
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_customer_id")]
    pub customer_id: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_customer_id() -> String {
    "anonymous".to_string()
}

/// Everything one simulated payment produced. Transient; owned by the
/// invocation that created it.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub status: PaymentStatus,
    pub amount: f64,
    /// Seconds the handler should block to simulate processing.
    pub processing_time: f64,
    /// Success draws from [0, 0.05], non-success from [0.70, 1.0]; the
    /// ranges never overlap.
    pub fraud_score: f64,
    pub fee: f64,
    /// Zero on success, 5001-5010 otherwise.
    pub error_code: u32,
    /// Zero on success, 1-3 otherwise.
    pub retry_count: u32,
    pub payment_method: &'static str,
    pub region: &'static str,
    pub card_brand: &'static str,
    pub risk_level: &'static str,
}

impl PaymentOutcome {
    /// Typed view of the terminal state: `Err(PaymentFailed)` for any
    /// non-success outcome.
    pub fn settlement(&self) -> Result<(), SimError> {
        match self.status {
            PaymentStatus::Success => Ok(()),
            status => Err(SimError::PaymentFailed { status }),
        }
    }
}

/// Three-tier amount mixture: 80% everyday purchases around 75, 15%
/// mid-range around 500, 5% large around 2000, each floored at one cent.
pub fn generate_amount(rng: &mut impl Rng) -> f64 {
    let tier = rng.random::<f64>();
    let amount = if tier < 0.80 {
        gaussian_floored(rng, 75.0, 45.0, 0.01)
    } else if tier < 0.95 {
        gaussian_floored(rng, 500.0, 250.0, 0.01)
    } else {
        gaussian_floored(rng, 2000.0, 1000.0, 0.01)
    };
    round2(amount)
}

/// Processing time conditioned on status: failures take longer to resolve.
pub fn generate_processing_time(rng: &mut impl Rng, status: PaymentStatus) -> f64 {
    let seconds = match status {
        PaymentStatus::Success => gaussian_floored(rng, 0.24, 0.10, 0.05),
        _ => gaussian_floored(rng, 0.80, 0.35, 0.1),
    };
    round3(seconds)
}

/// Run the full event-mode sequence for one request: amount_resolved,
/// status_sampled, then every derived field. Emission and the latency
/// sleep are the caller's next steps.
pub fn simulate_payment(
    rng: &mut impl Rng,
    requested_amount: f64,
    weights: &OutcomeWeights,
) -> Result<PaymentOutcome, SimError> {
    let status = weights.sample(rng);
    let amount = if requested_amount > 0.0 {
        requested_amount
    } else {
        generate_amount(rng)
    };
    let processing_time = generate_processing_time(rng, status);

    let (fraud_score, error_code, retry_count) = match status {
        PaymentStatus::Success => (round3(uniform(rng, 0.0, 0.05)), 0, 0),
        _ => (
            round3(uniform(rng, 0.70, 1.0)),
            rng.random_range(5001..=5010),
            rng.random_range(1..=3),
        ),
    };

    Ok(PaymentOutcome {
        status,
        amount,
        processing_time,
        fraud_score,
        fee: round2(amount * FEE_RATE + FEE_FLAT),
        error_code,
        retry_count,
        payment_method: *pick(rng, PAYMENT_METHODS),
        region: *pick(rng, REGIONS),
        card_brand: *pick(rng, CARD_BRANDS),
        risk_level: *weighted_choice(rng, RISK_LEVELS)?,
    })
}

/// Emit the metric observations for one payment outcome.
///
/// The count is emitted unconditionally; the amount only for success and
/// failed, never pending, since a pending payment's amount is not yet
/// realized; the processing-duration histogram unconditionally.
pub fn emit_payment(
    sink: &dyn Sink,
    outcome: &PaymentOutcome,
    currency: &str,
) -> Result<(), SimError> {
    let counter_labels = [
        ("status", outcome.status.as_str()),
        ("currency", currency),
        ("payment_method", outcome.payment_method),
        ("region", outcome.region),
        ("card_brand", outcome.card_brand),
    ];
    push(sink, &catalog::PAYMENT_COUNT, &counter_labels, 1.0)?;

    if matches!(outcome.status, PaymentStatus::Success | PaymentStatus::Failed) {
        push(sink, &catalog::PAYMENT_AMOUNT, &counter_labels, outcome.amount)?;
    }

    push(
        sink,
        &catalog::PAYMENT_PROCESSING_DURATION,
        &[
            ("status", outcome.status.as_str()),
            ("payment_method", outcome.payment_method),
            ("region", outcome.region),
            ("card_brand", outcome.card_brand),
        ],
        outcome.processing_time,
    )?;
    Ok(())
}

fn push(
    sink: &dyn Sink,
    series: &catalog::MetricSeries,
    labels: &[(&str, &str)],
    value: f64,
) -> Result<(), SimError> {
    match sink.record(series, labels, value) {
        Ok(()) => Ok(()),
        Err(SinkError::Unavailable(reason)) => {
            warn!(series = series.name, %reason, "sink push skipped");
            Ok(())
        }
        Err(SinkError::Schema(err)) => Err(err),
    }
}

/// Identifier unique within the process: millisecond timestamp plus a
/// random four-digit suffix, no registry needed.
pub fn payment_id(rng: &mut impl Rng) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("pay_{}_{}", millis, rng.random_range(1000..=9999))
}

/// Running success/total aggregate shared across concurrent event calls.
///
/// The pair is read-modified-written in one critical section so the
/// reported rate is always consistent with the counts at some moment.
#[derive(Debug, Default)]
pub struct SuccessRateTracker {
    counts: Mutex<(u64, u64)>,
}

impl SuccessRateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome and return the updated success rate in percent.
    pub fn record(&self, success: bool) -> f64 {
        let mut counts = self.counts.lock().expect("tracker poisoned");
        counts.1 += 1;
        if success {
            counts.0 += 1;
        }
        counts.0 as f64 / counts.1 as f64 * 100.0
    }

    /// (successes, total, rate-in-percent) as of one moment.
    pub fn snapshot(&self) -> (u64, u64, f64) {
        let counts = self.counts.lock().expect("tracker poisoned");
        let rate = if counts.1 == 0 {
            0.0
        } else {
            counts.0 as f64 / counts.1 as f64 * 100.0
        };
        (counts.0, counts.1, rate)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_weights_are_already_normalized() {
        let weights = OutcomeWeights::default();
        let normalized = weights.normalized();
        assert!((normalized.success - 0.84).abs() < 1e-9);
        assert!((normalized.failed - 0.01).abs() < 1e-9);
        assert!((normalized.pending - 0.15).abs() < 1e-9);

        let twice = normalized.normalized();
        assert!((twice.success - normalized.success).abs() < 1e-12);
    }

    #[test]
    fn override_percentages_renormalize() {
        // 50/50/100 should become 0.25/0.25/0.5 regardless of scale.
        let weights = OutcomeWeights::from_percentages(Some(50.0), Some(50.0), Some(100.0));
        assert!((weights.success - 0.25).abs() < 1e-9);
        assert!((weights.failed - 0.25).abs() < 1e-9);
        assert!((weights.pending - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_override_falls_back_to_default() {
        let weights = OutcomeWeights::from_percentages(Some(0.0), Some(0.0), Some(0.0));
        assert_eq!(weights, OutcomeWeights::default());
    }

    #[test]
    fn default_weights_yield_expected_success_proportion() {
        let mut rng = StdRng::seed_from_u64(2024);
        let weights = OutcomeWeights::default();
        let trials = 10_000;
        let successes = (0..trials)
            .filter(|_| weights.sample(&mut rng) == PaymentStatus::Success)
            .count();
        let proportion = successes as f64 / trials as f64;
        assert!(
            (proportion - 0.84).abs() < 0.03,
            "observed {proportion}, expected 0.84 +/- 0.03"
        );
    }

    #[test]
    fn amount_mixture_matches_three_tiers() {
        let mut rng = StdRng::seed_from_u64(77);
        let samples = 100_000;
        let mut low = 0usize;
        let mut mid = 0usize;
        let mut high = 0usize;
        for _ in 0..samples {
            let amount = generate_amount(&mut rng);
            assert!(amount >= 0.01);
            if amount < 200.0 {
                low += 1;
            } else if amount <= 1000.0 {
                mid += 1;
            } else {
                high += 1;
            }
        }
        let (low, mid, high) = (
            low as f64 / samples as f64,
            mid as f64 / samples as f64,
            high as f64 / samples as f64,
        );
        // Gaussian tails shift a little mass across the 200/1000 cuts.
        assert!((0.76..=0.86).contains(&low), "low tier {low}");
        assert!((0.10..=0.19).contains(&mid), "mid tier {mid}");
        assert!((0.02..=0.08).contains(&high), "high tier {high}");
    }

    #[test]
    fn processing_time_honors_floors() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..10_000 {
            assert!(generate_processing_time(&mut rng, PaymentStatus::Success) >= 0.05);
            assert!(generate_processing_time(&mut rng, PaymentStatus::Failed) >= 0.1);
        }
    }

    #[test]
    fn fraud_score_ranges_never_overlap() {
        let mut rng = StdRng::seed_from_u64(31);
        let weights = OutcomeWeights::default();
        for _ in 0..2_000 {
            let outcome = simulate_payment(&mut rng, 0.0, &weights).unwrap();
            match outcome.status {
                PaymentStatus::Success => {
                    assert!(outcome.fraud_score <= 0.05);
                    assert_eq!(outcome.error_code, 0);
                    assert_eq!(outcome.retry_count, 0);
                    assert!(outcome.settlement().is_ok());
                }
                _ => {
                    assert!(outcome.fraud_score >= 0.70);
                    assert!((5001..=5010).contains(&outcome.error_code));
                    assert!((1..=3).contains(&outcome.retry_count));
                    assert!(matches!(
                        outcome.settlement(),
                        Err(SimError::PaymentFailed { .. })
                    ));
                }
            }
        }
    }

    #[test]
    fn fee_is_rate_plus_flat_surcharge() {
        let mut rng = StdRng::seed_from_u64(8);
        let outcome = simulate_payment(&mut rng, 100.0, &OutcomeWeights::default()).unwrap();
        assert_eq!(outcome.amount, 100.0);
        assert!((outcome.fee - 3.2).abs() < 1e-9);
    }

    #[test]
    fn pending_emits_count_but_no_amount() {
        let mut rng = StdRng::seed_from_u64(4);
        let pending_only = OutcomeWeights {
            success: 0.0,
            failed: 0.0,
            pending: 1.0,
        };
        let outcome = simulate_payment(&mut rng, 0.0, &pending_only).unwrap();
        assert_eq!(outcome.status, PaymentStatus::Pending);

        let sink = MemorySink::new();
        emit_payment(&sink, &outcome, "EUR").unwrap();

        assert_eq!(sink.count_for(catalog::PAYMENT_COUNT.name), 1);
        assert_eq!(sink.count_for(catalog::PAYMENT_AMOUNT.name), 0);
        assert_eq!(sink.count_for(catalog::PAYMENT_PROCESSING_DURATION.name), 1);
    }

    #[test]
    fn success_and_failure_emit_amount() {
        let mut rng = StdRng::seed_from_u64(4);
        for weights in [
            OutcomeWeights {
                success: 1.0,
                failed: 0.0,
                pending: 0.0,
            },
            OutcomeWeights {
                success: 0.0,
                failed: 1.0,
                pending: 0.0,
            },
        ] {
            let outcome = simulate_payment(&mut rng, 0.0, &weights).unwrap();
            let sink = MemorySink::new();
            emit_payment(&sink, &outcome, "EUR").unwrap();
            assert_eq!(sink.count_for(catalog::PAYMENT_AMOUNT.name), 1);
        }
    }

    #[test]
    fn every_emitted_observation_matches_its_declared_schema() {
        let mut rng = StdRng::seed_from_u64(55);
        let sink = MemorySink::new();
        for _ in 0..50 {
            let outcome = simulate_payment(&mut rng, 0.0, &OutcomeWeights::default()).unwrap();
            emit_payment(&sink, &outcome, "EUR").unwrap();
        }
        for observation in sink.snapshot() {
            let series = catalog::find(observation.series).expect("series in catalog");
            let mut keys: Vec<&str> = observation.labels.iter().map(|(k, _)| k.as_str()).collect();
            keys.sort_unstable();
            let mut declared: Vec<&str> = series.labels.to_vec();
            declared.sort_unstable();
            assert_eq!(keys, declared, "{}", observation.series);
        }
    }

    #[test]
    fn tracker_reports_consistent_rate() {
        let tracker = SuccessRateTracker::new();
        assert_eq!(tracker.snapshot(), (0, 0, 0.0));
        tracker.record(true);
        tracker.record(true);
        let rate = tracker.record(false);
        assert!((rate - 66.666).abs() < 0.01);
        let (successes, total, _) = tracker.snapshot();
        assert_eq!((successes, total), (2, 3));
    }

    #[test]
    fn payment_ids_carry_prefix_and_suffix() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = payment_id(&mut rng);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts[0], "pay");
        assert_eq!(parts.len(), 3);
        let suffix: u32 = parts[2].parse().unwrap();
        assert!((1000..=9999).contains(&suffix));
    }
}
