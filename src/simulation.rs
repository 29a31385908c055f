//! Continuous (tick) emission mode.
//!
//! Once per tick the simulator produces one coherent snapshot of banking
//! activity for its environment: transactions, sessions, balances, API
//! traffic, logins, errors, fraud alerts, database load and business
//! gauges. Ticks are strictly sequential; the supervised loop sleeps a
//! random 0.5-2.0s between ticks and never exits on error.

use crate::catalog;
use crate::dist::{pick, uniform, weighted_choice};
use crate::error::SimError;
use crate::profile::{Environment, EnvironmentProfile};
use crate::sink::{Sink, SinkError};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const TRANSACTION_TYPES: &[&str] = &["transfer", "payment", "withdrawal", "deposit", "bill_payment"];
const CHANNELS: &[&str] = &["web", "mobile", "atm", "branch"];
const CURRENCIES: &[&str] = &["EUR", "USD", "GBP", "CHF"];
const ACCOUNT_TYPES: &[&str] = &["checking", "savings", "business", "investment"];
const ENDPOINTS: &[&str] = &[
    "/api/v1/transfer",
    "/api/v1/balance",
    "/api/v1/transactions",
    "/api/v1/login",
    "/api/v1/accounts",
    "/api/v1/cards",
    "/api/v1/statements",
];
const METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE"];
const ERROR_TYPES: &[&str] = &["timeout", "validation", "authentication", "network", "database"];
const FRAUD_TYPES: &[&str] = &[
    "suspicious_amount",
    "unusual_location",
    "velocity",
    "pattern_anomaly",
];
const LOGIN_METHODS: &[&str] = &["password", "biometric", "otp", "sso"];
const LOGIN_FAILURE_REASONS: &[&str] = &["invalid_credentials", "account_locked", "expired_session"];
const DB_POOLS: &[&str] = &["primary", "replica", "analytics"];
const QUERY_TYPES: &[&str] = &["select", "insert", "update", "delete"];

const WITHDRAWAL_AMOUNTS: &[f64] = &[20.0, 50.0, 100.0, 200.0, 500.0];
const STATUS_CODE_WEIGHTS: &[(&str, f64)] = &[
    ("200", 95.0),
    ("400", 2.0),
    ("404", 1.0),
    ("500", 2.0),
];
const LOGIN_OUTCOME_WEIGHTS: &[(&str, f64)] = &[("success", 97.0), ("failed", 3.0)];

/// Delay after a failed tick before the loop retries.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// What one tick produced, for logging and tests.
#[derive(Debug, Default, Clone)]
pub struct TickSummary {
    pub transactions: u64,
    pub api_requests: u64,
    pub sessions: f64,
    pub login_failed: bool,
    pub error_emitted: bool,
    pub fraud_emitted: bool,
}

/// Generates one coherent batch of observations per tick.
///
/// Reads the environment profile, never mutates shared state; the only
/// cross-tick memory is `tick_index`, which drives the diurnal session
/// curve.
pub struct TickSimulator<R: Rng> {
    profile: &'static EnvironmentProfile,
    rng: R,
    tick_index: u64,
}

impl<R: Rng> TickSimulator<R> {
    pub fn new(environment: Environment, rng: R) -> Self {
        Self {
            profile: environment.profile(),
            rng,
            tick_index: 0,
        }
    }

    pub fn environment(&self) -> Environment {
        self.profile.environment
    }

    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    /// Random pause before the next tick, 0.5-2.0 seconds.
    pub fn next_delay(&mut self) -> Duration {
        Duration::from_secs_f64(uniform(&mut self.rng, 0.5, 2.0))
    }

    /// Produce one tick of correlated observations.
    pub fn tick(&mut self, sink: &dyn Sink) -> Result<TickSummary, SimError> {
        let env = self.profile.environment.as_str();
        let mut summary = TickSummary::default();

        // Transaction volume scales with the environment multiplier.
        let count =
            (self.rng.random_range(2..=5) as f64 * self.profile.transaction_multiplier) as u64;
        for _ in 0..count {
            let tx_type = *pick(&mut self.rng, TRANSACTION_TYPES);
            let status = *weighted_choice(&mut self.rng, &self.profile.outcome_weights)?;
            let channel = *pick(&mut self.rng, CHANNELS);
            push(
                sink,
                &catalog::TRANSACTIONS_PROCESSED,
                &[
                    ("transaction_type", tx_type),
                    ("status", status.as_str()),
                    ("channel", channel),
                    ("environment", env),
                ],
                1.0,
            )?;

            // The type-to-distribution mapping is what makes the amount
            // series look real: round cash withdrawals, wide transfers,
            // small utility bills.
            let amount = match tx_type {
                "withdrawal" => *pick(&mut self.rng, WITHDRAWAL_AMOUNTS),
                "transfer" => uniform(&mut self.rng, 10.0, 10_000.0),
                "bill_payment" => uniform(&mut self.rng, 20.0, 500.0),
                _ => uniform(&mut self.rng, 10.0, 5_000.0),
            };
            push(
                sink,
                &catalog::TRANSACTION_AMOUNT,
                &[("transaction_type", tx_type), ("environment", env)],
                amount,
            )?;
        }
        summary.transactions = count;

        // Diurnal session curve: 24-tick cycle, highest at the start and
        // lowest at the midpoint, so the gauge moves like daily traffic
        // without real wall-clock time.
        let hour_factor = (self.tick_index % 24) as f64 / 24.0;
        let sessions = self.profile.base_sessions as f64
            + self.profile.base_sessions as f64 * (0.5 - hour_factor).abs() * 2.0
            + self.rng.random_range(-20..=20) as f64;
        push(
            sink,
            &catalog::ACTIVE_SESSIONS,
            &[("environment", env)],
            sessions,
        )?;
        summary.sessions = sessions;

        push(
            sink,
            &catalog::SESSION_DURATION,
            &[("environment", env)],
            uniform(&mut self.rng, 60.0, 3600.0),
        )?;

        // Balances and account counts are independent per pair; no
        // cross-tick memory.
        for currency in CURRENCIES {
            for account_type in ACCOUNT_TYPES {
                let balance = uniform(&mut self.rng, 1_000.0, 500_000.0);
                push(
                    sink,
                    &catalog::ACCOUNT_BALANCE,
                    &[
                        ("currency", currency),
                        ("account_type", account_type),
                        ("environment", env),
                    ],
                    balance,
                )?;
            }
        }
        for account_type in ACCOUNT_TYPES {
            push(
                sink,
                &catalog::ACTIVE_ACCOUNTS,
                &[("account_type", account_type), ("environment", env)],
                self.rng.random_range(100..=1000) as f64,
            )?;
        }

        // API traffic, status weighted toward 200, GET faster than
        // mutating methods.
        let requests = self.rng.random_range(3..=8);
        for _ in 0..requests {
            let endpoint = *pick(&mut self.rng, ENDPOINTS);
            let method = *pick(&mut self.rng, METHODS);
            let status_code = *weighted_choice(&mut self.rng, STATUS_CODE_WEIGHTS)?;
            let duration = if method == "GET" {
                uniform(&mut self.rng, 0.01, 0.5)
            } else {
                uniform(&mut self.rng, 0.1, 2.0)
            };

            push(
                sink,
                &catalog::REQUEST_DURATION,
                &[
                    ("endpoint", endpoint),
                    ("method", method),
                    ("environment", env),
                ],
                duration,
            )?;
            push(
                sink,
                &catalog::API_REQUESTS,
                &[
                    ("endpoint", endpoint),
                    ("method", method),
                    ("status_code", status_code),
                    ("environment", env),
                ],
                1.0,
            )?;
        }
        summary.api_requests = requests;

        // Exactly one login attempt per tick; a failed-login-reason
        // observation exists iff this tick's login failed.
        let login_status = *weighted_choice(&mut self.rng, LOGIN_OUTCOME_WEIGHTS)?;
        let login_method = *pick(&mut self.rng, LOGIN_METHODS);
        push(
            sink,
            &catalog::LOGIN_ATTEMPTS,
            &[
                ("status", login_status),
                ("method", login_method),
                ("environment", env),
            ],
            1.0,
        )?;
        if login_status == "failed" {
            summary.login_failed = true;
            let reason = *pick(&mut self.rng, LOGIN_FAILURE_REASONS);
            push(
                sink,
                &catalog::FAILED_LOGIN_ATTEMPTS,
                &[("reason", reason), ("environment", env)],
                1.0,
            )?;
        }

        if self.rng.random::<f64>() < self.profile.error_rate {
            summary.error_emitted = true;
            let error_type = *pick(&mut self.rng, ERROR_TYPES);
            let severity = *weighted_choice(&mut self.rng, &self.profile.error_severity_weights)?;
            push(
                sink,
                &catalog::API_ERRORS,
                &[
                    ("error_type", error_type),
                    ("severity", severity.as_str()),
                    ("environment", env),
                ],
                1.0,
            )?;
        }

        if self.rng.random::<f64>() < self.profile.fraud_rate {
            summary.fraud_emitted = true;
            let alert_type = *pick(&mut self.rng, FRAUD_TYPES);
            let severity = *weighted_choice(&mut self.rng, &self.profile.fraud_severity_weights)?;
            push(
                sink,
                &catalog::FRAUD_ALERTS,
                &[
                    ("alert_type", alert_type),
                    ("severity", severity.as_str()),
                    ("environment", env),
                ],
                1.0,
            )?;
        }

        for pool in DB_POOLS {
            push(
                sink,
                &catalog::DATABASE_CONNECTIONS,
                &[("pool", pool), ("environment", env)],
                self.rng.random_range(5..=50) as f64,
            )?;
        }
        for query_type in QUERY_TYPES {
            push(
                sink,
                &catalog::DATABASE_QUERY_DURATION,
                &[("query_type", query_type), ("environment", env)],
                uniform(&mut self.rng, 0.001, 0.5),
            )?;
        }

        push(
            sink,
            &catalog::DAILY_REVENUE,
            &[("environment", env)],
            self.profile.base_revenue * uniform(&mut self.rng, 0.9, 1.1),
        )?;
        let (low, high) = self.profile.satisfaction_range;
        push(
            sink,
            &catalog::CUSTOMER_SATISFACTION,
            &[("environment", env)],
            uniform(&mut self.rng, low, high),
        )?;

        self.tick_index += 1;
        Ok(summary)
    }
}

/// Push one observation, recovering locally from transient sink failures.
/// Schema errors propagate: they indicate a bug, not a bad backend.
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

/// Supervised simulation loop. Per-iteration failures are logged and
/// followed by a bounded delay; the loop itself never terminates.
pub async fn run_simulation<R: Rng + Send>(mut sim: TickSimulator<R>, sink: Arc<dyn Sink>) {
    info!(environment = %sim.environment(), "starting telemetry simulation");
    loop {
        match sim.tick(sink.as_ref()) {
            Ok(summary) => {
                if sim.tick_index() % 100 == 0 {
                    info!(
                        tick = sim.tick_index(),
                        transactions = summary.transactions,
                        sessions = summary.sessions as i64,
                        "simulation running"
                    );
                }
                let delay = sim.next_delay();
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                error!(%err, "tick failed, retrying after delay");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FAILED_LOGIN_ATTEMPTS, LOGIN_ATTEMPTS, TRANSACTIONS_PROCESSED};
    use crate::sink::{MemorySink, Observation};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn simulator(env: Environment, seed: u64) -> TickSimulator<StdRng> {
        TickSimulator::new(env, StdRng::seed_from_u64(seed))
    }

    fn transaction_count(observations: &[Observation]) -> usize {
        observations
            .iter()
            .filter(|o| o.series == TRANSACTIONS_PROCESSED.name)
            .count()
    }

    #[test]
    fn tick_emits_every_gauge_family() {
        let sink = MemorySink::new();
        let mut sim = simulator(Environment::Training, 11);
        sim.tick(&sink).unwrap();

        let observations = sink.snapshot();
        for series in [
            "ebanking_active_sessions",
            "ebanking_account_balance_total",
            "ebanking_active_accounts_total",
            "ebanking_database_connections",
            "ebanking_daily_revenue_eur",
            "ebanking_customer_satisfaction_score",
        ] {
            assert!(
                observations.iter().any(|o| o.series == series),
                "missing {series}"
            );
        }
        // 4 currencies x 4 account types.
        assert_eq!(
            observations
                .iter()
                .filter(|o| o.series == "ebanking_account_balance_total")
                .count(),
            16
        );
    }

    #[test]
    fn production_outpaces_development_in_expectation() {
        let ticks = 200;

        let sink = MemorySink::new();
        let mut prod = simulator(Environment::Production, 42);
        for _ in 0..ticks {
            prod.tick(&sink).unwrap();
        }
        let prod_tx = transaction_count(&sink.take());

        let sink = MemorySink::new();
        let mut dev = simulator(Environment::Development, 42);
        for _ in 0..ticks {
            dev.tick(&sink).unwrap();
        }
        let dev_tx = transaction_count(&sink.take());

        // Multipliers 5.0 vs 1.5 give expected ~17.5 vs ~5.25 per tick.
        assert!(
            prod_tx > dev_tx,
            "production {prod_tx} should exceed development {dev_tx}"
        );
    }

    #[test]
    fn failed_login_reason_tracks_login_outcome() {
        let sink = MemorySink::new();
        let mut sim = simulator(Environment::Training, 99);
        let mut saw_failure = false;

        for _ in 0..500 {
            sim.tick(&sink).unwrap();
            let observations = sink.take();

            let login_failed = observations.iter().any(|o| {
                o.series == LOGIN_ATTEMPTS.name
                    && o.labels
                        .iter()
                        .any(|(k, v)| k == "status" && v == "failed")
            });
            let reason_emitted = observations
                .iter()
                .any(|o| o.series == FAILED_LOGIN_ATTEMPTS.name);

            assert_eq!(login_failed, reason_emitted);
            saw_failure |= login_failed;
        }
        // 3% failure rate over 500 ticks; absence would mean the weights
        // are wired wrong.
        assert!(saw_failure);
    }

    #[test]
    fn session_curve_follows_diurnal_cycle() {
        let sink = MemorySink::new();
        let mut sim = simulator(Environment::Production, 5);
        let mut per_tick = Vec::new();
        for _ in 0..24 {
            let summary = sim.tick(&sink).unwrap();
            per_tick.push(summary.sessions);
        }
        // Tick 0 carries the 2x multiplier, tick 12 the 1x trough; jitter
        // is at most +/-20 against a 500-point swing.
        assert!(per_tick[0] > per_tick[12]);
    }

    #[test]
    fn tick_survives_unavailable_sink() {
        struct FailingSink;
        impl Sink for FailingSink {
            fn record(
                &self,
                _series: &catalog::MetricSeries,
                _labels: &[(&str, &str)],
                _value: f64,
            ) -> Result<(), SinkError> {
                Err(SinkError::Unavailable("backend down".into()))
            }
        }

        let mut sim = simulator(Environment::Training, 3);
        sim.tick(&FailingSink).unwrap();
    }

    #[test]
    fn all_tick_observations_match_declared_schemas() {
        let sink = MemorySink::new();
        let mut sim = simulator(Environment::Staging, 17);
        for _ in 0..20 {
            sim.tick(&sink).unwrap();
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
}
