use serde::{Deserialize, Serialize};

use crate::metrics::MetricsCollector;

/// Exit code of a run whose thresholds were breached.
pub const THRESHOLDS_FAILED_EXIT_CODE: u8 = 99;

/// A run-level pass/fail condition over aggregated metrics.
#[derive(Debug, Clone, PartialEq)]
pub enum Threshold {
    /// `http_req_failed` rate must stay strictly below the given fraction.
    FailedRateBelow(f64),
    /// `http_req_duration` at `percentile` must stay strictly below `limit_ms`.
    DurationPercentileBelow { percentile: f64, limit_ms: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub observed: f64,
    pub passed: bool,
}

impl Threshold {
    pub fn metric(&self) -> &'static str {
        match self {
            Threshold::FailedRateBelow(_) => "http_req_failed",
            Threshold::DurationPercentileBelow { .. } => "http_req_duration",
        }
    }

    pub fn expression(&self) -> String {
        match self {
            Threshold::FailedRateBelow(rate) => format!("rate<{rate}"),
            Threshold::DurationPercentileBelow {
                percentile,
                limit_ms,
            } => format!("p({percentile})<{limit_ms}"),
        }
    }

    pub fn evaluate(&self, metrics: &MetricsCollector) -> ThresholdResult {
        let (observed, limit) = match self {
            Threshold::FailedRateBelow(rate) => (metrics.failed_rate(), *rate),
            Threshold::DurationPercentileBelow {
                percentile,
                limit_ms,
            } => (metrics.latency_percentile_ms(*percentile), *limit_ms),
        };
        ThresholdResult {
            metric: self.metric().to_string(),
            expression: self.expression(),
            observed,
            passed: observed < limit,
        }
    }
}

pub fn evaluate_all(thresholds: &[Threshold], metrics: &MetricsCollector) -> Vec<ThresholdResult> {
    thresholds.iter().map(|t| t.evaluate(metrics)).collect()
}
