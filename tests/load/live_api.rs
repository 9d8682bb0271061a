//! Short runs of both scenarios against a live deployment.

use std::sync::Arc;
use std::time::Duration;

use auth_loadtest::client::HttpAuthClient;
use auth_loadtest::runner::Runner;
use auth_loadtest::scenario::{AuthCycle, Smoke};

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
}

fn runner() -> Runner {
    let api = HttpAuthClient::new(base_url(), Duration::from_secs(60)).unwrap();
    Runner::new(Arc::new(api)).unwrap()
}

#[tokio::test]
#[ignore] // needs a running API
async fn test_live_smoke() {
    let summary = runner().run(Arc::new(Smoke)).await.unwrap();

    println!("{}", auth_loadtest::metrics::render_summary(&summary));
    assert!(summary.iterations > 0);
    assert!(summary.checks_passed(), "{:?}", summary.checks);
}

#[tokio::test]
#[ignore] // needs a running API, registers accounts
async fn test_live_auth_cycle_short() {
    let run_id = chrono::Utc::now().timestamp_millis().to_string();
    let scenario = AuthCycle {
        vus: 5,
        duration: Duration::from_secs(15),
        password: "Password123!".into(),
        seed_users: 5,
        skip_register: false,
        allow_overload: true,
        run_id,
    };

    let summary = runner().run(Arc::new(scenario)).await.unwrap();

    println!("{}", auth_loadtest::metrics::render_summary(&summary));
    assert!(summary.iterations > 0);
    assert!(summary.thresholds_passed(), "{:?}", summary.thresholds);
}
