//! Predict the S3 location a node belongs to from its attributes.

use clap::Parser;
use shock_cli::{exit_with, init_tracing, parse_args, ConnectionArgs};
use shock_core::{classify, Node};

#[derive(Parser)]
#[command(
    name = "shock-predict-location",
    about = "Print id<TAB>owner:location:bucket for each node"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Node ids
    #[arg(required = true)]
    node_ids: Vec<String>,
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

    for node_id in &cli.node_ids {
        let node = client.get_node(node_id).await?;
        println!("{}", prediction_line(&node));
    }

    Ok(())
}

fn prediction_line(node: &Node) -> String {
    let ownership = classify(node.attributes());
    if let Some(diagnostic) = ownership.diagnostic() {
        tracing::warn!(node_id = %node.id, class = ?ownership.class, "{}", diagnostic);
    }
    format!("{}\t{}", node.id, ownership.triple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(attributes: serde_json::Value) -> Node {
        serde_json::from_value(json!({ "id": "n1", "attributes": attributes })).unwrap()
    }

    #[test]
    fn known_owner_prints_triple() {
        assert_eq!(
            prediction_line(&node(json!({ "owner": "ANL-SEQ-Core" }))),
            "n1\tANL-SEQ-Core:anls3_anlseq:anlseq"
        );
    }

    #[test]
    fn unknown_shape_prints_empty_triple() {
        assert_eq!(prediction_line(&node(json!(null))), "n1\t::");
    }
}
