//! Static catalog of every metric series the simulator can emit.
//!
//! The catalog is the single source of truth for series identity: name,
//! kind, label schema and histogram buckets. Every observation pushed to a
//! sink is validated against it, so a wrong label set fails loudly instead
//! of silently forking the series identity space.

use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// Static descriptor for one metric series.
#[derive(Debug)]
pub struct MetricSeries {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    /// Declared label keys. Emission-time labels must match this set
    /// exactly, order-independent.
    pub labels: &'static [&'static str],
    /// Bucket boundaries, histograms only.
    pub buckets: Option<&'static [f64]>,
}

impl MetricSeries {
    /// Reject any label set that does not exactly match the declared keys.
    pub fn validate_labels(&self, labels: &[(&str, &str)]) -> Result<(), SimError> {
        let matches = labels.len() == self.labels.len()
            && self
                .labels
                .iter()
                .all(|key| labels.iter().any(|(k, _)| k == key));
        if matches {
            Ok(())
        } else {
            Err(SimError::LabelSchemaMismatch {
                series: self.name.to_string(),
                expected: self.labels.iter().map(|s| s.to_string()).collect(),
                got: labels.iter().map(|(k, _)| k.to_string()).collect(),
            })
        }
    }

    /// Validate, then return label values reordered into declared key order.
    pub fn ordered_values<'a>(&self, labels: &'a [(&str, &str)]) -> Result<Vec<&'a str>, SimError> {
        self.validate_labels(labels)?;
        Ok(self
            .labels
            .iter()
            .map(|key| {
                labels
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| *v)
                    .unwrap_or("")
            })
            .collect())
    }
}

// Bucket boundaries chosen for useful resolution at the expected value
// ranges: latencies from 10ms to 5s, transaction amounts from 10 to 50000.
static AMOUNT_BUCKETS: [f64; 8] = [10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0, 50000.0];
static SESSION_BUCKETS: [f64; 6] = [60.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0];
static REQUEST_BUCKETS: [f64; 8] = [0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0];
static QUERY_BUCKETS: [f64; 7] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0];
static PAYMENT_DURATION_BUCKETS: [f64; 9] = [0.05, 0.1, 0.2, 0.3, 0.5, 0.8, 1.0, 2.0, 5.0];

pub static APP_INFO: MetricSeries = MetricSeries {
    name: "ebanking_app_info",
    help: "eBanking application information",
    kind: MetricKind::Gauge,
    labels: &["version", "environment", "service", "region", "cluster"],
    buckets: None,
};

pub static TRANSACTIONS_PROCESSED: MetricSeries = MetricSeries {
    name: "ebanking_transactions_processed_total",
    help: "Total number of processed transactions",
    kind: MetricKind::Counter,
    labels: &["transaction_type", "status", "channel", "environment"],
    buckets: None,
};

pub static TRANSACTION_AMOUNT: MetricSeries = MetricSeries {
    name: "ebanking_transaction_amount_eur",
    help: "Transaction amounts in EUR",
    kind: MetricKind::Histogram,
    labels: &["transaction_type", "environment"],
    buckets: Some(&AMOUNT_BUCKETS),
};

pub static ACTIVE_SESSIONS: MetricSeries = MetricSeries {
    name: "ebanking_active_sessions",
    help: "Current number of active user sessions",
    kind: MetricKind::Gauge,
    labels: &["environment"],
    buckets: None,
};

pub static SESSION_DURATION: MetricSeries = MetricSeries {
    name: "ebanking_session_duration_seconds",
    help: "User session duration in seconds",
    kind: MetricKind::Histogram,
    labels: &["environment"],
    buckets: Some(&SESSION_BUCKETS),
};

pub static ACCOUNT_BALANCE: MetricSeries = MetricSeries {
    name: "ebanking_account_balance_total",
    help: "Total account balance across all accounts",
    kind: MetricKind::Gauge,
    labels: &["currency", "account_type", "environment"],
    buckets: None,
};

pub static ACTIVE_ACCOUNTS: MetricSeries = MetricSeries {
    name: "ebanking_active_accounts_total",
    help: "Total number of active accounts",
    kind: MetricKind::Gauge,
    labels: &["account_type", "environment"],
    buckets: None,
};

pub static REQUEST_DURATION: MetricSeries = MetricSeries {
    name: "ebanking_request_duration_seconds",
    help: "Time taken to process API requests",
    kind: MetricKind::Histogram,
    labels: &["endpoint", "method", "environment"],
    buckets: Some(&REQUEST_BUCKETS),
};

pub static API_REQUESTS: MetricSeries = MetricSeries {
    name: "ebanking_api_requests_total",
    help: "Total number of API requests",
    kind: MetricKind::Counter,
    labels: &["endpoint", "method", "status_code", "environment"],
    buckets: None,
};

pub static LOGIN_ATTEMPTS: MetricSeries = MetricSeries {
    name: "ebanking_login_attempts_total",
    help: "Total number of login attempts",
    kind: MetricKind::Counter,
    labels: &["status", "method", "environment"],
    buckets: None,
};

pub static FAILED_LOGIN_ATTEMPTS: MetricSeries = MetricSeries {
    name: "ebanking_failed_login_attempts_total",
    help: "Total number of failed login attempts",
    kind: MetricKind::Counter,
    labels: &["reason", "environment"],
    buckets: None,
};

pub static API_ERRORS: MetricSeries = MetricSeries {
    name: "ebanking_api_errors_total",
    help: "Total number of API errors",
    kind: MetricKind::Counter,
    labels: &["error_type", "severity", "environment"],
    buckets: None,
};

pub static FRAUD_ALERTS: MetricSeries = MetricSeries {
    name: "ebanking_fraud_alerts_total",
    help: "Total number of fraud alerts",
    kind: MetricKind::Counter,
    labels: &["alert_type", "severity", "environment"],
    buckets: None,
};

pub static DATABASE_CONNECTIONS: MetricSeries = MetricSeries {
    name: "ebanking_database_connections",
    help: "Current number of database connections",
    kind: MetricKind::Gauge,
    labels: &["pool", "environment"],
    buckets: None,
};

pub static DATABASE_QUERY_DURATION: MetricSeries = MetricSeries {
    name: "ebanking_database_query_duration_seconds",
    help: "Database query execution time",
    kind: MetricKind::Histogram,
    labels: &["query_type", "environment"],
    buckets: Some(&QUERY_BUCKETS),
};

pub static DAILY_REVENUE: MetricSeries = MetricSeries {
    name: "ebanking_daily_revenue_eur",
    help: "Daily revenue in EUR",
    kind: MetricKind::Gauge,
    labels: &["environment"],
    buckets: None,
};

pub static CUSTOMER_SATISFACTION: MetricSeries = MetricSeries {
    name: "ebanking_customer_satisfaction_score",
    help: "Customer satisfaction score (0-100)",
    kind: MetricKind::Gauge,
    labels: &["environment"],
    buckets: None,
};

pub static PAYMENT_COUNT: MetricSeries = MetricSeries {
    name: "payment_count_total",
    help: "Total number of payment transactions",
    kind: MetricKind::Counter,
    labels: &["status", "currency", "payment_method", "region", "card_brand"],
    buckets: None,
};

pub static PAYMENT_AMOUNT: MetricSeries = MetricSeries {
    name: "payment_amount_sum",
    help: "Total successful/failed payment amount",
    kind: MetricKind::Counter,
    labels: &["status", "currency", "payment_method", "region", "card_brand"],
    buckets: None,
};

pub static PAYMENT_PROCESSING_DURATION: MetricSeries = MetricSeries {
    name: "payment_processing_duration_seconds",
    help: "Processing time per transaction",
    kind: MetricKind::Histogram,
    labels: &["status", "payment_method", "region", "card_brand"],
    buckets: Some(&PAYMENT_DURATION_BUCKETS),
};

pub static HTTP_REQUESTS: MetricSeries = MetricSeries {
    name: "payment_requests_total",
    help: "HTTP requests to payment endpoints",
    kind: MetricKind::Counter,
    labels: &["method", "endpoint", "status"],
    buckets: None,
};

pub static HTTP_REQUEST_DURATION: MetricSeries = MetricSeries {
    name: "payment_request_duration_seconds",
    help: "HTTP request duration",
    kind: MetricKind::Histogram,
    labels: &["method", "endpoint"],
    buckets: None,
};

pub static PAYMENT_SUCCESS_RATE: MetricSeries = MetricSeries {
    name: "payment_success_rate",
    help: "Current success rate percentage",
    kind: MetricKind::Gauge,
    labels: &[],
    buckets: None,
};

/// Every series the system can emit, exporter and payment API combined.
pub static CATALOG: &[&MetricSeries] = &[
    &APP_INFO,
    &TRANSACTIONS_PROCESSED,
    &TRANSACTION_AMOUNT,
    &ACTIVE_SESSIONS,
    &SESSION_DURATION,
    &ACCOUNT_BALANCE,
    &ACTIVE_ACCOUNTS,
    &REQUEST_DURATION,
    &API_REQUESTS,
    &LOGIN_ATTEMPTS,
    &FAILED_LOGIN_ATTEMPTS,
    &API_ERRORS,
    &FRAUD_ALERTS,
    &DATABASE_CONNECTIONS,
    &DATABASE_QUERY_DURATION,
    &DAILY_REVENUE,
    &CUSTOMER_SATISFACTION,
    &PAYMENT_COUNT,
    &PAYMENT_AMOUNT,
    &PAYMENT_PROCESSING_DURATION,
    &HTTP_REQUESTS,
    &HTTP_REQUEST_DURATION,
    &PAYMENT_SUCCESS_RATE,
];

/// Look up a series descriptor by name.
pub fn find(name: &str) -> Option<&'static MetricSeries> {
    CATALOG.iter().copied().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn histograms_have_buckets_and_others_do_not() {
        for series in CATALOG {
            match series.kind {
                MetricKind::Histogram => {}
                _ => assert!(series.buckets.is_none(), "{}", series.name),
            }
        }
    }

    #[test]
    fn validate_accepts_any_label_order() {
        let labels = [
            ("environment", "training"),
            ("status", "success"),
            ("channel", "web"),
            ("transaction_type", "transfer"),
        ];
        TRANSACTIONS_PROCESSED.validate_labels(&labels).unwrap();

        let ordered = TRANSACTIONS_PROCESSED.ordered_values(&labels).unwrap();
        assert_eq!(ordered, vec!["transfer", "success", "web", "training"]);
    }

    #[test]
    fn validate_rejects_missing_and_extra_keys() {
        let missing = [("transaction_type", "transfer"), ("environment", "training")];
        assert!(matches!(
            TRANSACTIONS_PROCESSED.validate_labels(&missing),
            Err(SimError::LabelSchemaMismatch { .. })
        ));

        let extra = [
            ("transaction_type", "transfer"),
            ("status", "success"),
            ("channel", "web"),
            ("environment", "training"),
            ("shard", "0"),
        ];
        assert!(matches!(
            TRANSACTIONS_PROCESSED.validate_labels(&extra),
            Err(SimError::LabelSchemaMismatch { .. })
        ));
    }

    #[test]
    fn validate_rejects_duplicate_key_standing_in_for_another() {
        let duplicated = [("environment", "training"), ("environment", "training")];
        assert!(matches!(
            FAILED_LOGIN_ATTEMPTS.validate_labels(&duplicated),
            Err(SimError::LabelSchemaMismatch { .. })
        ));
    }

    #[test]
    fn find_resolves_known_series() {
        assert!(find("payment_count_total").is_some());
        assert!(find("no_such_series").is_none());
    }
}
