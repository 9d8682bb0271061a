pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod runner;
pub mod scenario;
pub mod telemetry;
pub mod thresholds;
