//! Channel Attribution: multi-touch attribution and channel reporting.
//!
//! Matches sessions to conversions, scores the resulting journeys with the
//! external attribution service, persists the credit, and exports a
//! per-channel, per-day report.

use std::path::PathBuf;

use attribution_core::config::{AppConfig, ValidationPolicy};
use attribution_journey::DateRange;
use attribution_pipeline::{Pipeline, RunOptions};
use attribution_reporting::export_to_csv;
use attribution_scoring::{IhcClient, RetryPolicy};
use attribution_storage::Store;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Parser, Debug)]
#[command(name = "channel-attribution")]
#[command(about = "Multi-touch attribution and per-channel cost/revenue reporting")]
#[command(version)]
struct Cli {
    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config)
    #[arg(long, env = "DB_PATH")]
    db_path: Option<String>,

    /// Attribution service API key (overrides config)
    #[arg(long, env = "IHC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Earliest conversion time, inclusive (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS")
    #[arg(long, value_parser = parse_bound)]
    start_date: Option<NaiveDateTime>,

    /// Latest conversion time, inclusive (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS")
    #[arg(long, value_parser = parse_bound)]
    end_date: Option<NaiveDateTime>,

    /// Report CSV path (overrides config)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Retries per failed batch (overrides config)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Abort when credit weights of a conversion do not sum to one
    #[arg(long, default_value_t = false)]
    fail_on_invalid: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

/// Accept a bare date (midnight) or a full timestamp.
fn parse_bound(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid date '{raw}', expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"))
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "channel_attribution=info,attribution_pipeline=info,attribution_journey=info,\
         attribution_scoring=info,attribution_storage=info,attribution_reporting=info"
            .into()
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    info!("Channel attribution starting");

    let mut config = match cli.config.as_deref() {
        Some(path) => AppConfig::load(Some(path))?,
        None => AppConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }),
    };

    // Apply CLI overrides
    if let Some(db_path) = cli.db_path {
        config.storage.db_path = db_path;
    }
    if let Some(api_key) = cli.api_key {
        config.scoring.api_key = api_key;
    }
    if let Some(output) = cli.output {
        config.report.output_path = output.display().to_string();
    }
    if let Some(retries) = cli.max_retries {
        config.scoring.max_retries = retries;
    }
    if cli.fail_on_invalid {
        config.validation.policy = ValidationPolicy::FailFast;
    }
    if config.scoring.api_key.is_empty() {
        warn!("No attribution API key configured; requests will likely be rejected");
    }

    let range = DateRange::new(cli.start_date, cli.end_date);
    info!(
        db_path = %config.storage.db_path,
        endpoint = %config.scoring.endpoint,
        batch_size = config.scoring.batch_size,
        max_retries = config.scoring.max_retries,
        policy = ?config.validation.policy,
        start = ?range.start,
        end = ?range.end,
        "Configuration loaded"
    );

    let mut store = Store::open(&config.storage.db_path)?;

    let pipeline = Pipeline::new(
        IhcClient::new(&config.scoring)?,
        RunOptions::from_config(&config, range),
    )
    .with_retry(RetryPolicy::from_config(&config.scoring));

    let summary = pipeline.run(&mut store).await?;
    export_to_csv(&summary.report, &config.report.output_path)?;
    store.close()?;

    info!(
        journeys = summary.journeys,
        batches_failed = summary.batches_failed,
        saved = summary.saved.inserted,
        duplicates = summary.saved.duplicates,
        report_rows = summary.report.len(),
        output = %config.report.output_path,
        "Main execution completed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bound_accepts_date_and_timestamp() {
        assert_eq!(
            parse_bound("2023-09-01").unwrap(),
            NaiveDate::from_ymd_opt(2023, 9, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_bound("2023-09-30 23:59:59").unwrap(),
            NaiveDate::from_ymd_opt(2023, 9, 30).unwrap().and_hms_opt(23, 59, 59).unwrap()
        );
        assert!(parse_bound("30/09/2023").is_err());
    }

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::try_parse_from([
            "channel-attribution",
            "--db-path",
            "test.db",
            "--start-date",
            "2023-09-01",
            "--fail-on-invalid",
            "--log-format",
            "pretty",
        ])
        .unwrap();
        assert_eq!(cli.db_path.as_deref(), Some("test.db"));
        assert!(cli.start_date.is_some());
        assert!(cli.end_date.is_none());
        assert!(cli.fail_on_invalid);
    }
}
