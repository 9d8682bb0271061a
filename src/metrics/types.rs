//! Metric types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::thresholds::ThresholdResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    pub requests: u64,
    pub failed: u64,
}

impl RequestCounts {
    pub fn record(&mut self, failed: bool) {
        self.requests += 1;
        if failed {
            self.failed += 1;
        }
    }

    pub fn failed_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failed as f64 / self.requests as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passes: 0,
            fails: 0,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        let total = self.passes + self.fails;
        if total == 0 {
            0.0
        } else {
            self.passes as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSummary {
    pub endpoint: String,
    pub requests: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

/// End-of-run report, also the shape written to `SUMMARY_EXPORT`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub scenario: String,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub iterations: u64,
    pub http_reqs: u64,
    pub http_req_failed: u64,
    pub http_req_failed_rate: f64,
    pub http_req_duration: LatencyStats,
    pub endpoints: Vec<EndpointSummary>,
    pub checks: Vec<CheckSummary>,
    pub thresholds: Vec<ThresholdResult>,
}

impl RunSummary {
    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    pub fn checks_passed(&self) -> bool {
        self.checks.iter().all(|c| c.fails == 0)
    }
}
