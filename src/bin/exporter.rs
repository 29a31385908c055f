use axum::{extract::State, routing::get, Router};
use clap::Parser;
use ebank_sim::catalog;
use ebank_sim::profile::Environment;
use ebank_sim::simulation::{run_simulation, TickSimulator};
use ebank_sim::sink::{PrometheusSink, Sink};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Continuous synthetic e-banking metrics exporter.
#[derive(Parser, Debug)]
#[command(name = "ebank-exporter")]
struct Args {
    /// Port for the scrape endpoint.
    #[arg(long, default_value_t = 9200)]
    port: u16,

    /// Environment profile to simulate.
    #[arg(long, env = "ENVIRONMENT", default_value = "training")]
    environment: String,

    /// Service name reported on the info gauge.
    #[arg(long, env = "SERVICE_NAME", default_value = "ebanking-api")]
    service: String,

    #[arg(long, env = "REGION", default_value = "eu-west-1")]
    region: String,

    #[arg(long, env = "CLUSTER", default_value = "training-cluster")]
    cluster: String,

    #[arg(long, env = "APP_VERSION", default_value = "1.0.0")]
    app_version: String,
}

async fn metrics(State(sink): State<Arc<PrometheusSink>>) -> String {
    sink.encode().unwrap_or_default()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let environment = Environment::parse(&args.environment);
    info!(%environment, port = args.port, "starting exporter");

    let sink = Arc::new(PrometheusSink::new().expect("metric registration failed"));
    sink.record(
        &catalog::APP_INFO,
        &[
            ("version", args.app_version.as_str()),
            ("environment", environment.as_str()),
            ("service", args.service.as_str()),
            ("region", args.region.as_str()),
            ("cluster", args.cluster.as_str()),
        ],
        1.0,
    )
    .expect("app info gauge");

    let simulator = TickSimulator::new(environment, StdRng::from_os_rng());
    tokio::spawn(run_simulation(simulator, Arc::clone(&sink) as Arc<dyn Sink>));

    let app = Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(|| async { "OK" }))
        .with_state(sink);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await.expect("failed to bind port");
    info!(addr, "exporter listening");

    axum::serve(listener, app).await.expect("server crash");
}
