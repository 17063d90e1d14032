use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored-object record: metadata plus one blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub file: FileInfo,
    /// Free-form attributes; `null` when the node has none.
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub locations: Option<Vec<NodeLocation>>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Node {
    /// Attribute map, when the node carries an attribute object.
    pub fn attributes(&self) -> Option<&Map<String, Value>> {
        self.attributes.as_object()
    }

    pub fn locations(&self) -> &[NodeLocation] {
        self.locations.as_deref().unwrap_or(&[])
    }

    /// A node counts as migrated to `location` once it carries an entry with that id.
    pub fn has_location(&self, location: &str) -> bool {
        self.locations().iter().any(|l| l.id == location)
    }

    /// MD5 recorded by the service for the node's file.
    pub fn md5(&self) -> Option<&str> {
        self.file
            .checksum
            .as_ref()
            .and_then(|c| c.md5.as_deref())
            .filter(|md5| !md5.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub checksum: Option<Checksum>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checksum {
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
}

/// One entry of a node's `locations` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLocation {
    pub id: String,
    #[serde(default)]
    pub stored: bool,
}

impl NodeLocation {
    pub fn stored(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stored: true,
        }
    }
}

/// One-time download URL issued by `?download_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreauthUrl {
    pub url: String,
    #[serde(default, rename = "validtill")]
    pub valid_till: Option<String>,
}

/// Archive/compression formats the service can apply to a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Zip,
    Gzip,
}

impl FromStr for Compression {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zip" => Ok(Compression::Zip),
            "gzip" => Ok(Compression::Gzip),
            _ => Err(anyhow::anyhow!("Invalid compression: {}", s)),
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Compression::Zip => write!(f, "zip"),
            Compression::Gzip => write!(f, "gzip"),
        }
    }
}
