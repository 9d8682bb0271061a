use anyhow::{Context as _, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::AuthApi;
use crate::metrics::{reporter, MetricsCollector, RunSummary};
use crate::scenario::{Context, Scenario};
use crate::thresholds;

pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Stand-in deadline when the duration budget overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Virtual-user worker pool.
///
/// Runs the scenario's setup once, then spawns one task per virtual user.
/// Each task repeats the iteration until the duration budget is spent or
/// the run is cancelled; both are checked only between iterations.
pub struct Runner {
    api: Arc<dyn AuthApi>,
    metrics: MetricsCollector,
    cancel: CancellationToken,
    report_interval: Duration,
}

impl Runner {
    pub fn new(api: Arc<dyn AuthApi>) -> crate::error::Result<Self> {
        Ok(Self {
            api,
            metrics: MetricsCollector::new()?,
            cancel: CancellationToken::new(),
            report_interval: DEFAULT_REPORT_INTERVAL,
        })
    }

    pub fn with_report_interval(mut self, every: Duration) -> Self {
        self.report_interval = every;
        self
    }

    /// Cancelling stops every virtual user at its next iteration boundary.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub async fn run<S: Scenario>(&self, scenario: Arc<S>) -> Result<RunSummary> {
        let options = scenario.options();
        info!(
            scenario = scenario.name(),
            vus = options.vus,
            duration_secs = options.duration.as_secs_f64(),
            "starting run"
        );

        let setup_ctx = Context::new(0, self.api.clone(), self.metrics.clone());
        let data = Arc::new(
            scenario
                .setup(&setup_ctx)
                .await
                .with_context(|| format!("{} setup failed", scenario.name()))?,
        );

        let progress_stop = self.cancel.child_token();
        let progress = tokio::spawn(reporter::start_periodic_reporter(
            self.metrics.clone(),
            self.report_interval,
            progress_stop.clone(),
        ));

        let deadline = deadline_after(Instant::now(), options.duration);
        let mut vus = JoinSet::new();
        for vu in 1..=options.vus as u64 {
            let ctx = Context::new(vu, self.api.clone(), self.metrics.clone());
            vus.spawn(run_vu(
                scenario.clone(),
                ctx,
                data.clone(),
                deadline,
                self.cancel.clone(),
            ));
        }

        while let Some(joined) = vus.join_next().await {
            match joined {
                Ok((vu, iterations)) => debug!(vu, iterations, "virtual user finished"),
                Err(e) => error!(error = %e, "virtual user task failed"),
            }
        }

        progress_stop.cancel();
        let _ = progress.await;

        let results = thresholds::evaluate_all(&options.thresholds, &self.metrics);
        let summary = self.metrics.summary(scenario.name(), results);
        info!(
            scenario = scenario.name(),
            iterations = summary.iterations,
            http_reqs = summary.http_reqs,
            thresholds_passed = summary.thresholds_passed(),
            "run complete"
        );
        Ok(summary)
    }
}

fn deadline_after(start: Instant, budget: Duration) -> Instant {
    start
        .checked_add(budget)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

async fn run_vu<S: Scenario>(
    scenario: Arc<S>,
    ctx: Context,
    data: Arc<S::Data>,
    deadline: Instant,
    cancel: CancellationToken,
) -> (u64, u64) {
    let mut iterations = 0u64;
    while Instant::now() < deadline && !cancel.is_cancelled() {
        scenario.iteration(&ctx, &data).await;
        ctx.metrics().record_iteration();
        iterations += 1;
    }
    (ctx.vu(), iterations)
}
