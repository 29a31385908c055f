//! Optional record forwarding to a downstream collector.
//!
//! Handlers push finished payment records onto a bounded channel; a single
//! background task drains it and POSTs each record as JSON. The channel is
//! the backpressure boundary: when it fills, new records are dropped and
//! counted rather than slowing down the request path.

use crate::payment::{PaymentOutcome, PaymentStatus};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Flat record shape posted downstream, one object per payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub amount: f64,
    pub currency: String,
    pub customer_id: String,
    pub payment_method: String,
    pub region: String,
    pub card_brand: String,
    pub risk_level: String,
    pub processing_time: f64,
    pub fraud_score: f64,
    pub fee: f64,
    pub error_code: u32,
    pub retry_count: u32,
    pub success: bool,
    pub timestamp: String,
}

impl PaymentRecord {
    pub fn from_outcome(
        outcome: &PaymentOutcome,
        payment_id: &str,
        currency: &str,
        customer_id: &str,
    ) -> Self {
        Self {
            payment_id: payment_id.to_string(),
            status: outcome.status,
            amount: outcome.amount,
            currency: currency.to_string(),
            customer_id: customer_id.to_string(),
            payment_method: outcome.payment_method.to_string(),
            region: outcome.region.to_string(),
            card_brand: outcome.card_brand.to_string(),
            risk_level: outcome.risk_level.to_string(),
            processing_time: outcome.processing_time,
            fraud_score: outcome.fraud_score,
            fee: outcome.fee,
            error_code: outcome.error_code,
            retry_count: outcome.retry_count,
            success: outcome.status == PaymentStatus::Success,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    pub url: String,
    pub channel_capacity: usize,
    pub timeout_ms: u64,
}

impl ForwarderConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            channel_capacity: 10_000,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Default)]
pub struct ForwarderStats {
    pub sent: AtomicU64,
    pub dropped: AtomicU64,
}

/// Handle for pushing records to the background forwarding task.
/// Cheap to clone; all clones feed the same channel.
#[derive(Clone)]
pub struct Forwarder {
    tx: mpsc::Sender<PaymentRecord>,
    stats: Arc<ForwarderStats>,
}

impl Forwarder {
    /// Start the background drain task and return the push handle.
    pub fn spawn(config: ForwarderConfig) -> Self {
        let (tx, mut rx) = mpsc::channel::<PaymentRecord>(config.channel_capacity);
        let stats = Arc::new(ForwarderStats::default());

        let task_stats = Arc::clone(&stats);
        tokio::spawn(async move {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .unwrap_or_default();
            info!(url = %config.url, "payment forwarder started");

            while let Some(record) = rx.recv().await {
                match client.post(&config.url).json(&record).send().await {
                    Ok(response) if response.status().is_success() => {
                        task_stats.sent.fetch_add(1, Ordering::Relaxed);
                        debug!(payment_id = %record.payment_id, "record forwarded");
                    }
                    Ok(response) => {
                        task_stats.dropped.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            payment_id = %record.payment_id,
                            status = %response.status(),
                            "downstream rejected record"
                        );
                    }
                    Err(err) => {
                        task_stats.dropped.fetch_add(1, Ordering::Relaxed);
                        warn!(payment_id = %record.payment_id, error = %err, "forward failed");
                    }
                }
            }
        });

        Self { tx, stats }
    }

    /// Enqueue a record without waiting. A full channel drops the record
    /// and bumps the drop counter; the request path never blocks on the
    /// downstream.
    pub fn push(&self, record: PaymentRecord) {
        if let Err(err) = self.tx.try_send(record) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(error = %err, "forward queue full, record dropped");
        }
    }

    pub fn stats(&self) -> (u64, u64) {
        (
            self.stats.sent.load(Ordering::Relaxed),
            self.stats.dropped.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{simulate_payment, OutcomeWeights};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn record_mirrors_outcome() {
        let mut rng = StdRng::seed_from_u64(9);
        let outcome = simulate_payment(&mut rng, 42.0, &OutcomeWeights::default()).unwrap();
        let record = PaymentRecord::from_outcome(&outcome, "pay_1_2345", "EUR", "cust-7");

        assert_eq!(record.amount, 42.0);
        assert_eq!(record.payment_id, "pay_1_2345");
        assert_eq!(record.success, outcome.status == PaymentStatus::Success);
        assert_eq!(record.error_code, outcome.error_code);
    }

    #[test]
    fn record_serializes_lowercase_status() {
        let mut rng = StdRng::seed_from_u64(9);
        let outcome = simulate_payment(
            &mut rng,
            10.0,
            &OutcomeWeights {
                success: 1.0,
                failed: 0.0,
                pending: 0.0,
            },
        )
        .unwrap();
        let record = PaymentRecord::from_outcome(&outcome, "pay_1_2345", "USD", "anonymous");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["currency"], "USD");
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = simulate_payment(&mut rng, 5.0, &OutcomeWeights::default()).unwrap();

        // Unroutable target and a tiny queue: pushes beyond capacity must
        // return immediately and count as drops.
        let config = ForwarderConfig {
            url: "http://127.0.0.1:9/ingest".to_string(),
            channel_capacity: 1,
            timeout_ms: 100,
        };
        let forwarder = Forwarder::spawn(config);
        for i in 0..50 {
            let record =
                PaymentRecord::from_outcome(&outcome, &format!("pay_{i}_0000"), "EUR", "c");
            forwarder.push(record);
        }
        let (_, dropped) = forwarder.stats();
        assert!(dropped > 0);
    }
}
