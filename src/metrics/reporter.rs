//! Progress logging while a run is active, and the end-of-run report

use std::io::{self, Write};
use std::path::Path;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::collector::MetricsCollector;
use super::types::RunSummary;
use crate::error::{LoadTestError, Result};

/// Log a progress line every `every` until `stop` is cancelled.
pub async fn start_periodic_reporter(
    collector: MetricsCollector,
    every: Duration,
    stop: CancellationToken,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let counts = collector.request_counts();
                info!(
                    elapsed_secs = collector.elapsed().as_secs(),
                    iterations = collector.iterations(),
                    http_reqs = counts.requests,
                    http_req_failed = counts.failed,
                    "progress"
                );
            }
        }
    }
}

/// Render the summary as the plain-text end-of-test report.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let d = &summary.http_req_duration;

    out.push_str(&format!("\n  scenario: {}\n\n", summary.scenario));

    for check in &summary.checks {
        let mark = if check.fails == 0 { '✓' } else { '✗' };
        out.push_str(&format!("  {mark} {}\n", check.name));
        if check.fails > 0 {
            out.push_str(&format!(
                "   ↳ {:.0}% - ✓ {} / ✗ {}\n",
                check.pass_rate() * 100.0,
                check.passes,
                check.fails
            ));
        }
    }
    if !summary.checks.is_empty() {
        out.push('\n');
    }

    out.push_str(&format!(
        "  http_req_duration..........: avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms p(99)={:.2}ms\n",
        d.avg_ms, d.min_ms, d.p50_ms, d.max_ms, d.p90_ms, d.p95_ms, d.p99_ms
    ));
    out.push_str(&format!(
        "  http_req_failed............: {:.2}% ✓ {} ✗ {}\n",
        summary.http_req_failed_rate * 100.0,
        summary.http_req_failed,
        summary.http_reqs - summary.http_req_failed
    ));
    let rate = if summary.elapsed_secs > 0.0 {
        summary.http_reqs as f64 / summary.elapsed_secs
    } else {
        0.0
    };
    out.push_str(&format!(
        "  http_reqs..................: {} {:.2}/s\n",
        summary.http_reqs, rate
    ));
    for endpoint in &summary.endpoints {
        out.push_str(&format!(
            "    {:<10} {:>8} reqs {:>8} failed\n",
            endpoint.endpoint, endpoint.requests, endpoint.failed
        ));
    }
    out.push_str(&format!(
        "  iterations.................: {}\n",
        summary.iterations
    ));
    out.push_str(&format!(
        "  duration...................: {:.2}s\n",
        summary.elapsed_secs
    ));

    if !summary.thresholds.is_empty() {
        out.push_str("\n  thresholds:\n");
        for t in &summary.thresholds {
            let mark = if t.passed { '✓' } else { '✗' };
            out.push_str(&format!(
                "  {mark} {} {} (observed {:.4})\n",
                t.metric, t.expression, t.observed
            ));
        }
    }

    out
}

pub fn print_summary(summary: &RunSummary) {
    println!("{}", render_summary(summary));
    let _ = io::stdout().flush();
}

/// Write the summary as pretty JSON.
pub fn export_json(summary: &RunSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(summary)?;
    std::fs::write(path, json).map_err(|source| LoadTestError::SummaryExport {
        path: path.to_path_buf(),
        source,
    })
}
