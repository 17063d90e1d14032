//! Assembly of the node-id list a migration run works through.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use shock_api_client::LocationClient;
use shock_core::{LocationState, ShockError, ShockResult};

/// Where node ids come from. Sources are read in field order.
#[derive(Debug, Clone, Default)]
pub struct IdSources {
    pub explicit: Vec<String>,
    pub files: Vec<PathBuf>,
    /// Also list the nodes the location reports as missing.
    pub scan_missing: bool,
}

/// Ids from a file with one id per line; blank lines are ignored.
pub async fn read_id_file(path: &Path) -> ShockResult<Vec<String>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        ShockError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
    })?;
    Ok(parse_ids(&text))
}

pub fn parse_ids(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Reject ids that would escape the work directory once used as a file name.
pub fn validate_node_id(id: &str) -> ShockResult<()> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
        return Err(ShockError::InvalidInput(format!("invalid node id '{}'", id)));
    }
    Ok(())
}

/// Drop repeated ids, keeping the first occurrence.
pub fn dedupe(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Collect ids from every configured source.
pub async fn collect_node_ids(
    sources: &IdSources,
    locations: &LocationClient,
    location: &str,
) -> ShockResult<Vec<String>> {
    let mut ids: Vec<String> = sources
        .explicit
        .iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    for file in &sources.files {
        ids.extend(read_id_file(file).await?);
    }

    if sources.scan_missing {
        let missing = locations
            .get_ids_for_location(location, LocationState::Missing)
            .await?;
        tracing::info!(location = %location, count = missing.len(), "Nodes missing from location");
        ids.extend(missing);
    }

    let ids = ids.into_iter().filter(|id| match validate_node_id(id) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping node id");
            false
        }
    });
    Ok(dedupe(ids))
}
