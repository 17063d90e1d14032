//! Inspect and edit the location directory of a Shock server.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use shock_cli::{exit_with, init_tracing, parse_args, print_json, ConnectionArgs};
use shock_core::{LocationState, Node, NodeLocation};

#[derive(Parser)]
#[command(name = "shock-locations", about = "Shock location directory CLI")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Write listed node ids to this file, one per line
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Location definition or node listings
    Loc {
        view: LocView,
        /// Location name
        location: String,
    },
    /// Locations recorded for a node
    Get {
        /// Node id
        node_id: String,
        /// Only show this location
        location: Option<String>,
    },
    /// Record that a node is stored at a location
    Set { node_id: String, location: String },
    /// Remove a location from a node
    Delete { node_id: String, location: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LocView {
    Info,
    Missing,
    Present,
    Inflight,
}

impl LocView {
    fn state(self) -> Option<LocationState> {
        match self {
            LocView::Info => None,
            LocView::Missing => Some(LocationState::Missing),
            LocView::Present => Some(LocationState::Present),
            LocView::Inflight => Some(LocationState::Inflight),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli: Cli = parse_args();
    init_tracing(cli.connection.debug);

    if let Err(e) = run(cli).await {
        exit_with(e);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = cli.connection.client().await?;
    let locations = client.locations();

    match cli.command {
        Commands::Loc { view, location } => match view.state() {
            None => print_json(&locations.get_location_info(&location).await?)?,
            Some(state) => {
                let nodes = locations.get_nodes_for_location(&location, state).await?;
                for node in &nodes {
                    println!("{}", listing_line(node));
                }
                if let Some(path) = &cli.output {
                    let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
                    write_ids(path, &ids).await?;
                }
            }
        },
        Commands::Get { node_id, location } => {
            let entries = locations.get_node_locations(&node_id).await?;
            print_json(&select(entries, location.as_deref()))?;
        }
        Commands::Set { node_id, location } => {
            print_json(&locations.set_node_location(&node_id, &location).await?)?;
        }
        Commands::Delete { node_id, location } => {
            locations.delete_node_location(&node_id, &location).await?;
        }
    }

    Ok(())
}

/// `id<TAB>loc1,loc2`
fn listing_line(node: &Node) -> String {
    let ids: Vec<&str> = node.locations().iter().map(|l| l.id.as_str()).collect();
    format!("{}\t{}", node.id, ids.join(","))
}

fn select(entries: Vec<NodeLocation>, location: Option<&str>) -> Vec<NodeLocation> {
    match location {
        Some(location) => entries.into_iter().filter(|l| l.id == location).collect(),
        None => entries,
    }
}

async fn write_ids(path: &Path, ids: &[&str]) -> anyhow::Result<()> {
    let mut text = ids.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write ids to {}", path.display()))
}
