//! Sink abstraction: anything that can record a labeled numeric observation.
//!
//! The engine is the only writer. `PrometheusSink` backs the scrape endpoint
//! in the binaries; `MemorySink` captures observations for tests and for the
//! round-trip label checks.

use crate::catalog::{self, MetricKind, MetricSeries};
use crate::error::SimError;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    /// Catalog misuse. Propagated by the engine, indicates a bug.
    #[error(transparent)]
    Schema(#[from] SimError),

    /// Transient backend failure. Logged and skipped by the engine.
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

pub trait Sink: Send + Sync {
    /// Record one observation of `series` with the given labels and value.
    ///
    /// Value semantics follow the series kind: counters add, gauges set,
    /// histograms observe.
    fn record(
        &self,
        series: &MetricSeries,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Result<(), SinkError>;
}

enum Handle {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
}

/// Sink backed by a `prometheus::Registry`, one vec per catalog entry.
pub struct PrometheusSink {
    registry: Registry,
    handles: HashMap<&'static str, Handle>,
}

impl PrometheusSink {
    /// Register every catalog series up front. Registration failures are
    /// startup configuration errors and fatal.
    pub fn new() -> Result<Self, SimError> {
        let registry = Registry::new();
        let mut handles = HashMap::with_capacity(catalog::CATALOG.len());

        for series in catalog::CATALOG {
            let handle = match series.kind {
                MetricKind::Counter => {
                    let vec = CounterVec::new(Opts::new(series.name, series.help), series.labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    Handle::Counter(vec)
                }
                MetricKind::Gauge => {
                    let vec = GaugeVec::new(Opts::new(series.name, series.help), series.labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    Handle::Gauge(vec)
                }
                MetricKind::Histogram => {
                    let mut opts = HistogramOpts::new(series.name, series.help);
                    if let Some(buckets) = series.buckets {
                        opts = opts.buckets(buckets.to_vec());
                    }
                    let vec = HistogramVec::new(opts, series.labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    Handle::Histogram(vec)
                }
            };
            handles.insert(series.name, handle);
        }

        Ok(Self { registry, handles })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, SimError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl Sink for PrometheusSink {
    fn record(
        &self,
        series: &MetricSeries,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Result<(), SinkError> {
        let values = series.ordered_values(labels)?;
        let handle = self
            .handles
            .get(series.name)
            .ok_or_else(|| SinkError::Schema(SimError::UnknownSeries(series.name.to_string())))?;

        match handle {
            Handle::Counter(vec) => vec
                .get_metric_with_label_values(&values)
                .map_err(|e| SinkError::Schema(SimError::Registry(e)))?
                .inc_by(value),
            Handle::Gauge(vec) => vec
                .get_metric_with_label_values(&values)
                .map_err(|e| SinkError::Schema(SimError::Registry(e)))?
                .set(value),
            Handle::Histogram(vec) => vec
                .get_metric_with_label_values(&values)
                .map_err(|e| SinkError::Schema(SimError::Registry(e)))?
                .observe(value),
        }
        Ok(())
    }
}

/// One captured observation.
#[derive(Debug, Clone)]
pub struct Observation {
    pub series: &'static str,
    pub kind: MetricKind,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

/// In-memory sink for tests. Validates labels like any other sink.
#[derive(Default)]
pub struct MemorySink {
    observations: Mutex<Vec<Observation>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn snapshot(&self) -> Vec<Observation> {
        self.observations.lock().expect("sink poisoned").clone()
    }

    /// Drain and return everything recorded so far.
    pub fn take(&self) -> Vec<Observation> {
        std::mem::take(&mut *self.observations.lock().expect("sink poisoned"))
    }

    pub fn count_for(&self, series: &str) -> usize {
        self.observations
            .lock()
            .expect("sink poisoned")
            .iter()
            .filter(|o| o.series == series)
            .count()
    }
}

impl Sink for MemorySink {
    fn record(
        &self,
        series: &MetricSeries,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Result<(), SinkError> {
        series.validate_labels(labels)?;
        self.observations
            .lock()
            .map_err(|_| SinkError::Unavailable("observation buffer poisoned".into()))?
            .push(Observation {
                series: series.name,
                kind: series.kind,
                labels: labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                value,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DAILY_REVENUE, PAYMENT_COUNT, TRANSACTIONS_PROCESSED};

    #[test]
    fn prometheus_sink_registers_whole_catalog() {
        let sink = PrometheusSink::new().unwrap();
        assert_eq!(sink.handles.len(), catalog::CATALOG.len());
    }

    #[test]
    fn prometheus_sink_records_and_encodes() {
        let sink = PrometheusSink::new().unwrap();
        sink.record(&DAILY_REVENUE, &[("environment", "training")], 99_500.0)
            .unwrap();
        sink.record(
            &PAYMENT_COUNT,
            &[
                ("status", "success"),
                ("currency", "EUR"),
                ("payment_method", "card"),
                ("region", "EU"),
                ("card_brand", "VISA"),
            ],
            1.0,
        )
        .unwrap();

        let text = sink.encode().unwrap();
        assert!(text.contains("ebanking_daily_revenue_eur"));
        assert!(text.contains("payment_count_total"));
    }

    #[test]
    fn sinks_reject_label_schema_mismatch() {
        let prom = PrometheusSink::new().unwrap();
        let mem = MemorySink::new();
        let bad = [("transaction_type", "transfer")];

        assert!(matches!(
            prom.record(&TRANSACTIONS_PROCESSED, &bad, 1.0),
            Err(SinkError::Schema(SimError::LabelSchemaMismatch { .. }))
        ));
        assert!(matches!(
            mem.record(&TRANSACTIONS_PROCESSED, &bad, 1.0),
            Err(SinkError::Schema(SimError::LabelSchemaMismatch { .. }))
        ));
    }

    #[test]
    fn memory_sink_take_drains() {
        let mem = MemorySink::new();
        mem.record(&DAILY_REVENUE, &[("environment", "training")], 1.0)
            .unwrap();
        assert_eq!(mem.take().len(), 1);
        assert!(mem.snapshot().is_empty());
    }
}
