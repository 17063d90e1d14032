use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shock_cli::{exit_with, init_tracing, parse_args, print_json, ConnectionArgs, EXIT_NOT_FOUND};
use shock_core::S3Config;
use shock_migration::{collect_node_ids, IdSources, MigrationDriver, MigrationSettings, RetryPolicy};
use shock_storage::{create_storage, StorageBackend};

#[derive(Parser, Debug)]
#[command(name = "shock-migrate")]
#[command(about = "Copy Shock nodes to an S3 location and record them there")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Target location id
    #[arg(long)]
    location: Option<String>,

    /// Node ids to migrate
    #[arg(long = "node-ids", num_args = 1.., value_name = "ID")]
    node_ids: Vec<String>,

    /// Files with one node id per line
    #[arg(long, num_args = 1.., value_name = "FILE")]
    input: Vec<PathBuf>,

    /// Directory for downloaded content
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Download attempts per node
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Backoff unit; attempt n is followed by n units of waiting
    #[arg(long, default_value_t = 60)]
    retry_delay_secs: u64,

    /// Do not add the nodes the location reports as missing
    #[arg(long)]
    no_scan: bool,

    /// Only report which nodes would be migrated
    #[arg(long)]
    dry_run: bool,

    /// Write the JSON report to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    target: Option<Target>,
}

#[derive(Subcommand, Debug)]
enum Target {
    /// Override the S3 settings taken from the location definition
    S3 {
        #[arg(long)]
        endpoint_url: Option<String>,
        #[arg(long)]
        bucket_name: Option<String>,
        #[arg(long)]
        access_key: Option<String>,
        #[arg(long)]
        secret_access_key: Option<String>,
        #[arg(long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let args: Args = parse_args();
    init_tracing(args.connection.debug);

    if let Err(e) = run(args).await {
        exit_with(e);
    }
}

async fn run(args: Args) -> Result<()> {
    let Some(location) = args.location.clone().filter(|l| !l.trim().is_empty()) else {
        eprintln!("Missing location");
        std::process::exit(EXIT_NOT_FOUND);
    };

    let client = args.connection.client().await?;
    let locations = client.locations();

    let info = locations
        .get_location_info(&location)
        .await
        .with_context(|| format!("Missing or unknown location {}", location))?;
    tracing::debug!(?info, "Location definition");

    let mut s3 = S3Config::from_env().apply_location(&info)?;
    if let Some(Target::S3 {
        endpoint_url,
        bucket_name,
        access_key,
        secret_access_key,
        region,
    }) = args.target
    {
        s3 = s3.with_overrides(access_key, secret_access_key, endpoint_url, bucket_name, region);
    }

    let backend = if args.dry_run {
        StorageBackend::Memory
    } else {
        StorageBackend::S3
    };
    let storage = create_storage(backend, &s3)?;

    let sources = IdSources {
        explicit: args.node_ids,
        files: args.input,
        scan_missing: !args.no_scan,
    };
    let ids = collect_node_ids(&sources, &locations, &location).await?;
    tracing::debug!(?ids, "Node ids to migrate");

    let settings = MigrationSettings::new(&location, args.work_dir)
        .with_retry(RetryPolicy::new(
            args.max_attempts,
            Duration::from_secs(args.retry_delay_secs),
        ))
        .with_dry_run(args.dry_run);

    let report = MigrationDriver::new(client, storage, settings)
        .run(&ids)
        .await?;

    match args.output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&report).context("Serialize report")?;
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
        }
        None => print_json(&report)?,
    }

    Ok(())
}
