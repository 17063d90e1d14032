use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Access control list of a node.
///
/// User entries are kept as raw JSON: depending on the auth backend the service
/// reports plain user ids or `{uuid, username}` objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Acl {
    #[serde(default)]
    pub owner: Value,
    #[serde(default)]
    pub read: Vec<Value>,
    #[serde(default)]
    pub write: Vec<Value>,
    #[serde(default)]
    pub delete: Vec<Value>,
    #[serde(default)]
    pub public: Option<Value>,
}

/// Permission a user list is granted or revoked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclKind {
    Read,
    Write,
    Delete,
    Owner,
    /// Read, write and delete at once
    All,
}

impl AclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AclKind::Read => "read",
            AclKind::Write => "write",
            AclKind::Delete => "delete",
            AclKind::Owner => "owner",
            AclKind::All => "all",
        }
    }
}

impl FromStr for AclKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(AclKind::Read),
            "write" => Ok(AclKind::Write),
            "delete" => Ok(AclKind::Delete),
            "owner" => Ok(AclKind::Owner),
            "all" => Ok(AclKind::All),
            _ => Err(anyhow::anyhow!("Invalid ACL kind: {}", s)),
        }
    }
}

impl Display for AclKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
