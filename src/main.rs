use anyhow::Result;
use auth_loadtest::{cli, client, config, metrics, runner, scenario, telemetry, thresholds};
use clap::Parser;
use cli::{Cli, ScenarioKind};
use config::Config;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    let cfg = Config::load()?;
    init_tracing(cfg.log_format);

    info!(
        scenario = ?args.scenario,
        base_url = %cfg.base_url,
        run_id = %cfg.run_id,
        "starting auth load test"
    );

    let api = client::HttpAuthClient::new(cfg.base_url.clone(), cfg.http_timeout)?;
    let runner = runner::Runner::new(Arc::new(api))?
        .with_report_interval(Duration::from_secs(args.report_interval.max(1)));

    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        telemetry::shutdown_signal().await;
        cancel.cancel();
    });

    let summary = match args.scenario {
        ScenarioKind::Smoke => runner.run(Arc::new(scenario::Smoke)).await?,
        ScenarioKind::AuthCycle => {
            runner
                .run(Arc::new(scenario::AuthCycle::from(&cfg)))
                .await?
        }
    };

    metrics::print_summary(&summary);
    if let Some(path) = &cfg.summary_export {
        metrics::export_json(&summary, path)?;
        info!(path = %path.display(), "summary exported");
    }

    if !summary.thresholds_passed() {
        warn!("thresholds crossed");
        return Ok(ExitCode::from(thresholds::THRESHOLDS_FAILED_EXIT_CODE));
    }
    Ok(ExitCode::SUCCESS)
}
