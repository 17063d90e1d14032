use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Kind of storage tier a location describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationType {
    S3,
    Tsm,
    Other(String),
}

impl FromStr for LocationType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "S3" | "s3" => LocationType::S3,
            "tsm" | "TSM" => LocationType::Tsm,
            other => LocationType::Other(other.to_string()),
        })
    }
}

impl Display for LocationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LocationType::S3 => write!(f, "S3"),
            LocationType::Tsm => write!(f, "tsm"),
            LocationType::Other(other) => write!(f, "{}", other),
        }
    }
}

impl Serialize for LocationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LocationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(LocationType::Other(raw)))
    }
}

/// Server-side definition of a location, as returned by `/location/{name}/info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub region: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(default)]
    pub persistent: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub minpriority: i32,
    #[serde(default)]
    pub tier: i32,
    #[serde(default)]
    pub cost: i32,
}

/// Node listings the location directory can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationState {
    /// Nodes without a stored copy at the location
    Missing,
    /// Nodes stored at the location
    Present,
    /// Nodes whose transfer to the location has started but not completed
    Inflight,
}

impl LocationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationState::Missing => "missing",
            LocationState::Present => "present",
            LocationState::Inflight => "inflight",
        }
    }
}

impl FromStr for LocationState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "missing" => Ok(LocationState::Missing),
            "present" => Ok(LocationState::Present),
            "inflight" => Ok(LocationState::Inflight),
            _ => Err(anyhow::anyhow!("Invalid location state: {}", s)),
        }
    }
}

impl Display for LocationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
