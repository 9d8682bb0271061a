use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use super::{Context, RunOptions, Scenario};
use crate::client::ApiRequest;

const SMOKE_DURATION: Duration = Duration::from_secs(10);
const THINK_TIME: Duration = Duration::from_secs(1);

/// One virtual user probing `/health` and `/ready` for ten seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Smoke;

#[async_trait]
impl Scenario for Smoke {
    type Data = ();

    fn name(&self) -> &'static str {
        "smoke"
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            vus: 1,
            duration: SMOKE_DURATION,
            thresholds: Vec::new(),
        }
    }

    async fn setup(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    async fn iteration(&self, ctx: &Context, _data: &()) {
        let health = ctx.send(ApiRequest::Health).await;
        ctx.check("health 200", health.status == 200);

        let ready = ctx.send(ApiRequest::Ready).await;
        ctx.check("ready 200", ready.status == 200);

        tokio::time::sleep(THINK_TIME).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Endpoint;
    use crate::scenario::testing::{context, ScriptedApi};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_iteration_probes_both_endpoints() {
        let api = Arc::new(
            ScriptedApi::new()
                .respond(Endpoint::Health, 200, "")
                .respond(Endpoint::Ready, 200, ""),
        );
        let ctx = context(1, api.clone());

        Smoke.iteration(&ctx, &()).await;

        assert_eq!(api.calls(), vec![ApiRequest::Health, ApiRequest::Ready]);
        assert!(ctx.metrics().checks().iter().all(|c| c.passes == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_health_still_probes_ready() {
        let api = Arc::new(
            ScriptedApi::new()
                .respond(Endpoint::Health, 500, "")
                .respond(Endpoint::Ready, 200, ""),
        );
        let ctx = context(1, api.clone());

        Smoke.iteration(&ctx, &()).await;

        assert_eq!(api.calls(), vec![ApiRequest::Health, ApiRequest::Ready]);
        let checks = ctx.metrics().checks();
        assert_eq!(checks[0].name, "health 200");
        assert_eq!(checks[0].fails, 1);
        assert_eq!(checks[1].name, "ready 200");
        assert_eq!(checks[1].passes, 1);
    }

    #[test]
    fn test_options() {
        let options = Smoke.options();
        assert_eq!(options.vus, 1);
        assert_eq!(options.duration, Duration::from_secs(10));
        assert!(options.thresholds.is_empty());
    }
}
