use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use clap::Parser;
use ebank_sim::catalog;
use ebank_sim::forwarder::{Forwarder, ForwarderConfig, PaymentRecord};
use ebank_sim::payment::{
    emit_payment, payment_id, simulate_payment, OutcomeWeights, PaymentRequest, PaymentStatus,
    SuccessRateTracker,
};
use ebank_sim::sink::{PrometheusSink, Sink};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Mock payment API emitting realistic payment telemetry per call.
#[derive(Parser, Debug)]
#[command(name = "payment-api")]
struct Args {
    /// Port to serve the API on.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Optional downstream collector for per-payment JSON records.
    #[arg(long, env = "FORWARD_URL")]
    forward_url: Option<String>,
}

#[derive(Clone)]
struct AppState {
    sink: Arc<PrometheusSink>,
    tracker: Arc<SuccessRateTracker>,
    forwarder: Option<Forwarder>,
}

#[derive(Serialize)]
struct PaymentResponse {
    payment_id: String,
    status: &'static str,
    amount: f64,
    currency: String,
    timestamp: String,
    processing_time_ms: u64,
}

fn header_percentage(headers: &HeaderMap, name: &str) -> Option<f64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
}

async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PaymentRequest>,
) -> Response {
    let weights = OutcomeWeights::from_percentages(
        header_percentage(&headers, "x-success-rate"),
        header_percentage(&headers, "x-failure-rate"),
        header_percentage(&headers, "x-pending-rate"),
    );

    let (outcome, id) = {
        let mut rng = StdRng::from_os_rng();
        let outcome = match simulate_payment(&mut rng, request.amount, &weights) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "payment simulation failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "Internal error"})),
                )
                    .into_response();
            }
        };
        let id = payment_id(&mut rng);
        (outcome, id)
    };

    // Simulated processing latency. Yields to the runtime so concurrent
    // requests proceed while this one waits.
    tokio::time::sleep(Duration::from_secs_f64(outcome.processing_time)).await;

    if let Err(err) = emit_payment(state.sink.as_ref(), &outcome, &request.currency) {
        warn!(error = %err, "metric emission failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Internal error"})),
        )
            .into_response();
    }

    let rate = state.tracker.record(outcome.status == PaymentStatus::Success);
    if let Err(err) = state
        .sink
        .record(&catalog::PAYMENT_SUCCESS_RATE, &[], rate)
    {
        warn!(error = %err, "success rate gauge update failed");
    }

    if let Some(forwarder) = &state.forwarder {
        forwarder.push(PaymentRecord::from_outcome(
            &outcome,
            &id,
            &request.currency,
            &request.customer_id,
        ));
    }

    match outcome.settlement() {
        Ok(()) => (
            StatusCode::OK,
            Json(PaymentResponse {
                payment_id: id,
                status: "completed",
                amount: outcome.amount,
                currency: request.currency,
                timestamp: Utc::now().to_rfc3339(),
                processing_time_ms: (outcome.processing_time * 1000.0) as u64,
            }),
        )
            .into_response(),
        Err(err) => {
            info!(payment_id = %id, error = %err, "payment declined");
            (
                StatusCode::PAYMENT_REQUIRED,
                Json(json!({"detail": "Payment processing failed"})),
            )
                .into_response()
        }
    }
}

async fn stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (successes, total, rate) = state.tracker.snapshot();
    let (forwarded, dropped) = state
        .forwarder
        .as_ref()
        .map(|f| f.stats())
        .unwrap_or((0, 0));
    Json(json!({
        "total_payments": total,
        "successful_payments": successes,
        "success_rate_percent": rate,
        "records_forwarded": forwarded,
        "records_dropped": dropped,
    }))
}

async fn metrics(State(state): State<AppState>) -> String {
    state.sink.encode().unwrap_or_default()
}

/// Records request count and latency for every route, payments included.
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let endpoint = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    let _ = state.sink.record(
        &catalog::HTTP_REQUESTS,
        &[
            ("method", method.as_str()),
            ("endpoint", endpoint.as_str()),
            ("status", status.as_str()),
        ],
        1.0,
    );
    let _ = state.sink.record(
        &catalog::HTTP_REQUEST_DURATION,
        &[("method", method.as_str()), ("endpoint", endpoint.as_str())],
        started.elapsed().as_secs_f64(),
    );
    response
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let sink = Arc::new(PrometheusSink::new().expect("metric registration failed"));
    let forwarder = args.forward_url.map(|url| {
        info!(%url, "forwarding payment records downstream");
        Forwarder::spawn(ForwarderConfig::new(url))
    });

    let state = AppState {
        sink,
        tracker: Arc::new(SuccessRateTracker::new()),
        forwarder,
    };

    let app = Router::new()
        .route("/api/payments", post(create_payment))
        .route("/api/payments/stats", get(stats))
        .route("/metrics", get(metrics))
        .route("/health", get(|| async { "OK" }))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await.expect("failed to bind port");
    info!(addr, "payment api listening");

    axum::serve(listener, app).await.expect("server crash");
}
