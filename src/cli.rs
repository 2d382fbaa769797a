//! Command-line interface of the `propcache` binary.

use crate::backend::StatsSource;
use crate::config::DEFAULT_CONFIG_FILE;
use crate::stats::{get_cache_metrics, MetricsReport};
use clap::{Parser, Subcommand};
use console::style;
use std::io::{self, Write};
#[cfg(feature = "redis")]
use std::path::Path;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "propcache", version, about = "Cached property listings over Redis")]
pub struct Cli {
    /// Settings file; missing files are ignored.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the cached listing endpoint over HTTP
    Serve,
    /// Display Redis cache hit/miss metrics
    #[command(name = "show_cache_metrics", alias = "show-cache-metrics")]
    ShowCacheMetrics,
}

/// Lines printed for a metrics report, without styling.
pub fn render_report(report: &MetricsReport) -> Vec<String> {
    match report {
        MetricsReport::Failure { reason, .. } => vec![format!("Error: {}", reason)],
        MetricsReport::Success(snapshot) => vec![
            "Redis Cache Metrics:".to_string(),
            format!("Keyspace Hits: {}", snapshot.hits),
            format!("Keyspace Misses: {}", snapshot.misses),
            format!("Total Requests: {}", snapshot.total),
            format!("Hit Ratio: {}", percent(snapshot.hit_ratio)),
            format!("Miss Ratio: {}", percent(snapshot.miss_ratio)),
        ],
    }
}

fn percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

/// Write `report` to `out`. The first line is styled green on success and
/// red on failure; `console` drops the styling when `out` is not a terminal.
pub fn write_report<W: Write>(out: &mut W, report: &MetricsReport) -> io::Result<()> {
    let lines = render_report(report);
    for (index, line) in lines.iter().enumerate() {
        if index == 0 {
            let styled = if report.is_success() {
                style(line).green()
            } else {
                style(line).red()
            };
            writeln!(out, "{}", styled)?;
        } else {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

/// `show_cache_metrics`: query `source` and print the report.
///
/// Query failures are printed, not returned; only a failing `out` errors.
pub async fn show_cache_metrics<S: StatsSource, W: Write>(
    source: &S,
    out: &mut W,
) -> io::Result<()> {
    let report = get_cache_metrics(source).await;
    write_report(out, &report)
}

/// `show_cache_metrics` as run by the binary: load settings from
/// `config_path`, open the Redis pool and print the report.
///
/// Settings and pool failures are printed as `Error: ...` like any query
/// failure, so the command always completes; only a failing `out` errors.
#[cfg(feature = "redis")]
pub async fn connect_and_show_cache_metrics<W: Write>(
    config_path: &Path,
    out: &mut W,
) -> io::Result<()> {
    let connected = crate::config::Settings::load(config_path)
        .and_then(|settings| crate::backend::RedisBackend::new(settings.redis));

    match connected {
        Ok(backend) => show_cache_metrics(&backend, out).await,
        Err(e) => {
            error!("✗ Error retrieving Redis cache metrics: {}", e);
            write_report(out, &MetricsReport::failure(e.to_string()))
        }
    }
}
