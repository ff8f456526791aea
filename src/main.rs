use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use utilization_report::collector::Window;
use utilization_report::config::{
    Config, DeploymentMode, PLACEHOLDER_PRIVATE_KEY, PLACEHOLDER_PUBLIC_KEY,
};
use utilization_report::report::{ColumnOrder, ReportAssembler};

/// Collect min/max/median utilization of every host in every project into a CSV report
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Deployment mode, `atlas` or `ops-manager`
    #[arg(long, env = "REPORT_MODE", default_value_t = DeploymentMode::Atlas)]
    mode: DeploymentMode,

    /// API base URL, defaults to the Atlas API in atlas mode
    #[arg(long, env = "REPORT_BASE_URL")]
    base_url: Option<String>,

    /// Public API key
    #[arg(long, env = "REPORT_PUBLIC_API_KEY", default_value = PLACEHOLDER_PUBLIC_KEY)]
    public_key: String,

    /// Private API key
    #[arg(
        long,
        env = "REPORT_PRIVATE_API_KEY",
        default_value = PLACEHOLDER_PRIVATE_KEY,
        hide_env_values = true,
        hide_default_value = true
    )]
    private_key: String,

    /// Accept header sent to the API
    #[arg(long, env = "REPORT_ACCEPT", default_value = "application/json")]
    accept: String,

    /// Lookback period in days
    #[arg(long, env = "REPORT_PERIOD_DAYS", default_value_t = 1)]
    period_days: u32,

    /// Sample granularity in hours
    #[arg(long, env = "REPORT_GRANULARITY_HOURS", default_value_t = 24)]
    granularity_hours: u32,

    /// Directory the report is written to
    #[arg(short, long, env = "REPORT_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Include metric columns reported by any host, not only by the first one
    #[arg(long, env = "REPORT_ALL_COLUMNS")]
    all_columns: bool,

    /// Additional root certificate (PEM) for self-managed deployments
    #[arg(long, env = "REPORT_CA_CERT")]
    ca_cert: Option<PathBuf>,

    /// Do not verify the API certificate
    #[arg(long, env = "REPORT_INSECURE")]
    insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "REPORT_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            base_url: self
                .base_url
                .unwrap_or_else(|| self.mode.default_base_url().to_string()),
            mode: self.mode,
            public_key: self.public_key,
            private_key: self.private_key,
            accept: self.accept,
            window: Window {
                period_days: self.period_days,
                granularity_hours: self.granularity_hours,
            },
            output_dir: self.output_dir,
            column_order: if self.all_columns {
                ColumnOrder::Union
            } else {
                ColumnOrder::FirstHost
            },
            ca_cert: self.ca_cert,
            accept_invalid_certs: self.insecure,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    if let Err(e) = config.validate() {
        warn!("{}. Update the base URL and API keys before running.", e);
        return Ok(());
    }
    info!("Connecting to {} ({})", config.base_url, config.mode);

    let client = config
        .build_client()
        .await
        .context("Failed to create API client")?;

    let output_dir = config.output_dir.clone();
    ReportAssembler::new(client, config)
        .run()
        .await
        .with_context(|| format!("Failed to write report to {}", output_dir.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let config = Args::try_parse_from(["utilization-report", "--public-key", "pub"])
            .unwrap()
            .into_config();
        assert_eq!(config.mode, DeploymentMode::Atlas);
        assert_eq!(config.base_url, "https://cloud.mongodb.com/api/atlas/v1.0");
        assert_eq!(config.public_key, "pub");
        assert_eq!(config.window, Window::default());
        assert_eq!(config.column_order, ColumnOrder::FirstHost);
        assert!(config.validate().is_err());
    }

    #[test]
    fn cli_ops_manager() {
        let config = Args::try_parse_from([
            "utilization-report",
            "--mode",
            "ops-manager",
            "--base-url",
            "https://ops.example.com/api/public/v1.0",
            "--public-key",
            "pub",
            "--private-key",
            "secret",
            "--period-days",
            "30",
            "--granularity-hours",
            "1",
            "--all-columns",
        ])
        .unwrap()
        .into_config();
        assert_eq!(config.mode, DeploymentMode::OpsManager);
        assert_eq!(config.window.period(), "P30D");
        assert_eq!(config.window.granularity(), "PT1H");
        assert_eq!(config.column_order, ColumnOrder::Union);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn cli_rejects_unknown_mode() {
        assert!(Args::try_parse_from(["utilization-report", "--mode", "mongo"]).is_err());
    }

    #[test]
    fn cli_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
