use clap::{Parser, Subcommand};

/// Load tests for the auth API
#[derive(Parser, Debug)]
#[command(name = "auth-loadtest")]
#[command(about = "Drive virtual users against an auth API and report k6-style metrics")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub scenario: ScenarioKind,

    /// Progress reporting interval in seconds
    #[arg(long, default_value = "5", global = true)]
    pub report_interval: u64,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    /// One virtual user probing /health and /ready for ten seconds
    Smoke,

    /// Register a user pool, then cycle login, refresh and logout
    AuthCycle,
}
