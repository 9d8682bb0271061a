//! Thread-safe collection of request samples, checks and iterations

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::types::{CheckSummary, EndpointSummary, LatencyStats, RequestCounts, RunSummary};
use crate::client::{ApiResponse, Endpoint};
use crate::error::Result;
use crate::thresholds::ThresholdResult;

/// Statuses `200..=399` are expected; anything else, including transport
/// failures (status 0), counts toward `http_req_failed`.
pub fn is_failed_status(status: u16) -> bool {
    !(200..=399).contains(&status)
}

#[derive(Debug, Default)]
struct RequestTally {
    total: RequestCounts,
    per_endpoint: BTreeMap<Endpoint, RequestCounts>,
}

#[derive(Clone)]
pub struct MetricsCollector {
    requests: Arc<RwLock<RequestTally>>,
    /// Request latencies in microseconds.
    latencies: Arc<RwLock<Histogram<u64>>>,
    /// Checks in first-seen order; a run has a handful at most.
    checks: Arc<RwLock<Vec<CheckSummary>>>,
    iterations: Arc<AtomicU64>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        // 3 significant digits, auto-resizing
        let latencies = Histogram::new(3)?;

        Ok(Self {
            requests: Arc::new(RwLock::new(RequestTally::default())),
            latencies: Arc::new(RwLock::new(latencies)),
            checks: Arc::new(RwLock::new(Vec::new())),
            iterations: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        })
    }

    pub fn record_response(&self, response: &ApiResponse) {
        let failed = is_failed_status(response.status);
        {
            let mut requests = self.requests.write();
            requests.total.record(failed);
            requests
                .per_endpoint
                .entry(response.endpoint)
                .or_default()
                .record(failed);
        }

        let micros = u64::try_from(response.latency.as_micros()).unwrap_or(u64::MAX);
        self.latencies.write().saturating_record(micros);
    }

    /// Records a named check and hands the result back.
    pub fn record_check(&self, name: &str, passed: bool) -> bool {
        let mut checks = self.checks.write();
        let entry = match checks.iter_mut().position(|c| c.name == name) {
            Some(idx) => &mut checks[idx],
            None => {
                checks.push(CheckSummary::new(name));
                let last = checks.len() - 1;
                &mut checks[last]
            }
        };
        if passed {
            entry.passes += 1;
        } else {
            entry.fails += 1;
        }
        passed
    }

    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub fn request_counts(&self) -> RequestCounts {
        self.requests.read().total
    }

    pub fn endpoint_counts(&self, endpoint: Endpoint) -> RequestCounts {
        self.requests
            .read()
            .per_endpoint
            .get(&endpoint)
            .copied()
            .unwrap_or_default()
    }

    pub fn checks(&self) -> Vec<CheckSummary> {
        self.checks.read().clone()
    }

    /// Fraction of requests that failed, 0 when nothing was sent.
    pub fn failed_rate(&self) -> f64 {
        self.request_counts().failed_rate()
    }

    /// Latency at `percentile` (0–100), in milliseconds.
    pub fn latency_percentile_ms(&self, percentile: f64) -> f64 {
        let hist = self.latencies.read();
        micros_to_ms(hist.value_at_percentile(percentile))
    }

    pub fn latency_stats(&self) -> LatencyStats {
        let hist = self.latencies.read();
        if hist.len() == 0 {
            return LatencyStats::default();
        }
        LatencyStats {
            min_ms: micros_to_ms(hist.min()),
            avg_ms: hist.mean() / 1000.0,
            p50_ms: micros_to_ms(hist.value_at_quantile(0.50)),
            p90_ms: micros_to_ms(hist.value_at_quantile(0.90)),
            p95_ms: micros_to_ms(hist.value_at_quantile(0.95)),
            p99_ms: micros_to_ms(hist.value_at_quantile(0.99)),
            max_ms: micros_to_ms(hist.max()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn summary(&self, scenario: &str, thresholds: Vec<ThresholdResult>) -> RunSummary {
        let requests = self.requests.read();
        let endpoints = requests
            .per_endpoint
            .iter()
            .map(|(endpoint, counts)| EndpointSummary {
                endpoint: endpoint.to_string(),
                requests: counts.requests,
                failed: counts.failed,
            })
            .collect();

        RunSummary {
            scenario: scenario.to_string(),
            finished_at: chrono::Utc::now(),
            elapsed_secs: self.elapsed().as_secs_f64(),
            iterations: self.iterations(),
            http_reqs: requests.total.requests,
            http_req_failed: requests.total.failed,
            http_req_failed_rate: requests.total.failed_rate(),
            http_req_duration: self.latency_stats(),
            endpoints,
            checks: self.checks(),
            thresholds,
        }
    }
}

fn micros_to_ms(micros: u64) -> f64 {
    micros as f64 / 1000.0
}
