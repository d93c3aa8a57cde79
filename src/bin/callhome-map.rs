use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use async_compat::CompatExt;
use callhome_map::{ClientParams, Dashboard, MapParams, TelemetryFilters};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Plots call-home telemetry as GeoJSON markers and prints the deployment summary.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Base url of the call-home backend
    #[arg(long, env = "CALLHOME_URL")]
    url: String,

    #[arg(long, env = "CALLHOME_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Per-request timeout, in seconds
    #[arg(long, env = "CALLHOME_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Page size
    #[arg(long, default_value_t = 10)]
    limit: u64,

    /// Stop after this many page requests
    #[arg(long, default_value_t = 10_000)]
    max_pages: u64,

    #[arg(long)]
    from: Option<DateTime<Utc>>,
    #[arg(long)]
    to: Option<DateTime<Utc>>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    city: Option<String>,
    /// Only deployments running this release
    #[arg(long = "release")]
    release: Option<String>,
    #[arg(long)]
    service: Option<String>,

    /// Where to write the GeoJSON layer
    #[arg(short, long, default_value = "deployments.geojson")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    smol::block_on(run(args).compat())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let client_params = ClientParams::new(&args.url, &args.api_key)?
        .with_timeout(Duration::from_secs(args.timeout_secs));
    let map_params = MapParams {
        limit: args.limit,
        max_pages: args.max_pages,
        ..Default::default()
    };
    let filters = TelemetryFilters {
        from: args.from,
        to: args.to,
        country: args.country.map(Into::into),
        city: args.city.map(Into::into),
        version: args.release.map(Into::into),
        service: args.service.map(Into::into),
    };
    let dashboard = Dashboard::new(client_params, map_params)?;
    let snapshot = dashboard.snapshot(filters).await?;
    snapshot
        .layer
        .save(&args.output)
        .context("cannot save map layer")?;
    println!(
        "{} markers written to {}",
        snapshot.report.markers,
        args.output.display()
    );
    println!("{}", serde_json::to_string_pretty(&snapshot.counts)?);
    Ok(())
}
