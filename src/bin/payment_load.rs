use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;

// --- Config ---
const PAYMENT_URL: &str = "http://127.0.0.1:8080/api/payments";
const CONCURRENCY: usize = 16;
const DURATION_SECS: u64 = 30;

const CURRENCIES: &[&str] = &["EUR", "USD", "GBP", "CHF"];

#[tokio::main]
async fn main() {
    println!("Payment load generator starting...");
    println!("Target: {}", PAYMENT_URL);
    println!("Concurrency: {}", CONCURRENCY);

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(CONCURRENCY)
        .tcp_nodelay(true)
        .build()
        .unwrap();

    let completed = Arc::new(AtomicUsize::new(0));
    let declined = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let start_time = Instant::now();
    let mut handles = Vec::new();

    for worker in 0..CONCURRENCY {
        let client = client.clone();
        let completed = completed.clone();
        let declined = declined.clone();
        let errors = errors.clone();

        handles.push(tokio::spawn(async move {
            loop {
                if start_time.elapsed().as_secs() >= DURATION_SECS {
                    break;
                }

                // ~70% of requests let the API pick a realistic amount.
                let amount = if fastrand::f64() < 0.7 {
                    0.0
                } else {
                    ((fastrand::f64() * 990.0 + 10.0) * 100.0).round() / 100.0
                };
                let currency = CURRENCIES[fastrand::usize(0..CURRENCIES.len())];
                let body = serde_json::json!({
                    "amount": amount,
                    "currency": currency,
                    "customer_id": format!("cust_{}", fastrand::u32(0..100_000)),
                });

                let mut request = client.post(PAYMENT_URL).json(&body);
                // Occasionally skew the outcome mix to exercise overrides.
                if fastrand::f64() < 0.05 {
                    request = request
                        .header("X-Success-Rate", "50")
                        .header("X-Failure-Rate", "40")
                        .header("X-Pending-Rate", "10");
                }

                match request.send().await {
                    Ok(resp) if resp.status().is_success() => {
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(resp) if resp.status() == reqwest::StatusCode::PAYMENT_REQUIRED => {
                        declined.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(resp) => {
                        eprintln!("[worker {}] unexpected status {}", worker, resp.status());
                        errors.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => {
                        errors.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }));
    }

    // Monitor Loop
    let monitor_completed = completed.clone();
    let monitor_declined = declined.clone();
    let monitor = tokio::spawn(async move {
        let mut last_count = 0;
        let monitor_start = Instant::now();
        loop {
            time::sleep(Duration::from_secs(1)).await;
            let current = monitor_completed.load(Ordering::Relaxed)
                + monitor_declined.load(Ordering::Relaxed);
            let rps = current - last_count;
            last_count = current;

            let elapsed = monitor_start.elapsed().as_secs();
            println!("[{:02}s] RPS: {:<6} | Total: {}", elapsed, rps, current);

            if monitor_start.elapsed().as_secs() >= DURATION_SECS {
                break;
            }
        }
    });

    for h in handles {
        let _ = h.await;
    }
    let _ = monitor.await;

    let duration = start_time.elapsed();
    let completed = completed.load(Ordering::SeqCst);
    let declined = declined.load(Ordering::SeqCst);
    let errors = errors.load(Ordering::SeqCst);
    let total = completed + declined;

    println!("\n=== Final Load Report ===");
    println!("Completed Payments:   {}", completed);
    println!("Declined (402):       {}", declined);
    println!("Transport Errors:     {}", errors);
    println!("Actual Duration:      {:.2?}", duration);
    println!(
        "Average Throughput:   {:.0} payments/s",
        total as f64 / duration.as_secs_f64()
    );
    if total > 0 {
        println!(
            "Completion Rate:      {:.2}%",
            completed as f64 / total as f64 * 100.0
        );
    }
}
