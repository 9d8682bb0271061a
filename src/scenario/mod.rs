use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::client::{ApiRequest, ApiResponse, AuthApi};
use crate::metrics::MetricsCollector;
use crate::thresholds::Threshold;

pub mod auth_cycle;
pub mod pool;
pub mod smoke;

pub use auth_cycle::*;
pub use pool::*;
pub use smoke::*;

/// How the runner drives a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub vus: usize,
    pub duration: Duration,
    pub thresholds: Vec<Threshold>,
}

/// Scenario logic executed inside each virtual user.
///
/// `setup` runs once before any virtual user starts; its output is shared
/// read-only with every iteration.
#[async_trait]
pub trait Scenario: Send + Sync + 'static {
    type Data: Send + Sync + 'static;

    fn name(&self) -> &'static str;

    fn options(&self) -> RunOptions;

    async fn setup(&self, ctx: &Context) -> Result<Self::Data>;

    async fn iteration(&self, ctx: &Context, data: &Self::Data);
}

/// Per-virtual-user handle: issues requests and records checks.
#[derive(Clone)]
pub struct Context {
    vu: u64,
    api: Arc<dyn AuthApi>,
    metrics: MetricsCollector,
}

impl Context {
    /// `vu` is 1-based for virtual users; setup runs as 0.
    pub fn new(vu: u64, api: Arc<dyn AuthApi>, metrics: MetricsCollector) -> Self {
        Self { vu, api, metrics }
    }

    pub fn vu(&self) -> u64 {
        self.vu
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub async fn send(&self, request: ApiRequest) -> ApiResponse {
        let response = self.api.call(request).await;
        self.metrics.record_response(&response);
        response
    }

    /// Records a named check; a failure never interrupts the caller.
    pub fn check(&self, name: &str, passed: bool) -> bool {
        if !passed {
            debug!(vu = self.vu, check = name, "check failed");
        }
        self.metrics.record_check(name, passed)
    }
}
