//! Shock CLI: node, ACL, index and query operations against a Shock server.
//!
//! Set SHOCK_URL (or SHOCK_HOST/SHOCK_PORT) and SHOCK_TOKEN, or pass
//! `--shock-host` and `--token`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use shock_api_client::{attributes_json, ApiClient, DownloadOptions, UploadFile};
use shock_cli::{exit_with, init_tracing, parse_args, parse_filter, print_json, ConnectionArgs};
use shock_core::{AclKind, Compression};

#[derive(Parser)]
#[command(name = "shock", about = "Shock object store CLI")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a node's metadata
    Get {
        /// Node id
        id: String,
    },
    /// Create a node, with or without content
    Create {
        /// File to upload
        file: Option<PathBuf>,
        /// JSON file with the node attributes
        #[arg(long)]
        attributes: Option<PathBuf>,
        /// File name to report instead of the file's own
        #[arg(long)]
        name: Option<String>,
    },
    /// Replace a node's content or attributes
    Update {
        /// Node id
        id: String,
        /// File to upload
        file: Option<PathBuf>,
        /// JSON file with the node attributes
        #[arg(long)]
        attributes: Option<PathBuf>,
        /// File name to report instead of the file's own
        #[arg(long)]
        name: Option<String>,
    },
    /// Download a node's content to a file
    Download {
        /// Node id
        id: String,
        /// Destination path
        path: PathBuf,
        /// Server-side compression: zip or gzip
        #[arg(long)]
        compression: Option<Compression>,
        /// Index to take parts from
        #[arg(long, requires = "part")]
        index: Option<String>,
        /// Parts of the index, e.g. 1-3
        #[arg(long, requires = "index")]
        part: Option<String>,
    },
    /// Get a one-time download URL that needs no credentials
    DownloadUrl {
        /// Node id
        id: String,
        /// Server-side compression: zip or gzip
        #[arg(long)]
        compression: Option<Compression>,
    },
    /// Delete a node
    Delete {
        /// Node id
        id: String,
    },
    /// List nodes matching attribute filters
    Query {
        /// Filters as key=value
        #[arg(required = true)]
        filters: Vec<String>,
    },
    /// Build an index on a node
    Index {
        /// Node id
        id: String,
        /// Index name, e.g. size, line or chunkrecord
        name: String,
    },
    /// Access control operations
    Acl {
        #[command(subcommand)]
        sub: AclCommands,
    },
}

#[derive(Subcommand)]
enum AclCommands {
    /// Show a node's ACL
    Get {
        /// Node id
        id: String,
    },
    /// Grant a permission
    Add {
        /// Node id
        id: String,
        /// read, write, delete, owner or all
        kind: AclKind,
        /// User ids or names
        #[arg(required = true)]
        users: Vec<String>,
    },
    /// Revoke a permission
    Remove {
        /// Node id
        id: String,
        /// read, write, delete, owner or all
        kind: AclKind,
        /// User ids or names
        #[arg(required = true)]
        users: Vec<String>,
    },
    /// Change a node's owner
    Chown {
        /// Node id
        id: String,
        /// New owner
        user: String,
    },
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

    match cli.command {
        Commands::Get { id } => {
            print_json(&client.get_node(&id).await?)?;
        }
        Commands::Create {
            file,
            attributes,
            name,
        } => {
            let upload = file.map(|path| upload_file(path, name));
            let attributes = read_attributes(attributes.as_deref()).await?;
            print_json(&client.create_node(upload, attributes).await?)?;
        }
        Commands::Update {
            id,
            file,
            attributes,
            name,
        } => {
            let upload = file.map(|path| upload_file(path, name));
            let attributes = read_attributes(attributes.as_deref()).await?;
            if upload.is_none() && attributes.is_none() {
                anyhow::bail!("Nothing to update: give a file, --attributes or both");
            }
            print_json(&client.upload(Some(&id), upload, attributes).await?)?;
        }
        Commands::Download {
            id,
            path,
            compression,
            index,
            part,
        } => {
            let options = DownloadOptions {
                compression,
                index: index.zip(part),
            };
            let written = client.download_to_path(&id, &path, &options).await?;
            print_json(&json!({ "id": id, "path": written }))?;
        }
        Commands::DownloadUrl { id, compression } => {
            print_json(&client.download_url(&id, compression).await?)?;
        }
        Commands::Delete { id } => {
            client.delete_node(&id).await?;
            print_json(&json!({ "deleted": id }))?;
        }
        Commands::Query { filters } => {
            let filters = filters
                .iter()
                .map(|raw| parse_filter(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let pairs: Vec<(&str, &str)> = filters
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            print_json(&client.query_node(&pairs).await?)?;
        }
        Commands::Index { id, name } => {
            print_json(&client.index_node(&id, &name).await?)?;
        }
        Commands::Acl { sub } => run_acl(&client, sub).await?,
    }

    Ok(())
}

async fn run_acl(client: &ApiClient, command: AclCommands) -> anyhow::Result<()> {
    let acl = match command {
        AclCommands::Get { id } => client.get_acl(&id).await?,
        AclCommands::Add { id, kind, users } => {
            let users: Vec<&str> = users.iter().map(String::as_str).collect();
            client.add_acl(&id, kind, &users).await?
        }
        AclCommands::Remove { id, kind, users } => {
            let users: Vec<&str> = users.iter().map(String::as_str).collect();
            client.delete_acl(&id, kind, &users).await?
        }
        AclCommands::Chown { id, user } => client.chown(&id, &user).await?,
    };
    print_json(&acl)
}

fn upload_file(path: PathBuf, name: Option<String>) -> UploadFile {
    match name {
        Some(name) => UploadFile::named(path, name),
        None => UploadFile::new(path),
    }
}

async fn read_attributes(path: Option<&Path>) -> anyhow::Result<Option<UploadFile>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read attributes from {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Attributes in {} are not valid JSON", path.display()))?;
    Ok(Some(attributes_json(&value)))
}
