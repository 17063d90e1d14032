//! Ownership classification: predicts which S3 tier a node belongs to from
//! the shape of its attributes. Pure, no I/O, never fails.

use serde::Serialize;
use serde_json::{Map, Value};

const ANL_SEQ_OWNER: &str = "ANL-SEQ-Core";
const MGRAST_OWNER_PREFIX: &str = "mgu";
const MGRAST_JOB_KEYS: [&str; 3] = ["job_id", "type", "project_id"];

/// Which rule decided the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipClass {
    AnlSeqCore,
    MgRastOwner,
    MgRastJob,
    UnknownOwner,
    UnknownType,
}

/// Predicted destination of a node. All three fields are empty when the
/// attributes match no rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ownership {
    pub owner: String,
    pub location: String,
    pub bucket: String,
    pub class: OwnershipClass,
}

impl Ownership {
    fn known(owner: &str, location: &str, bucket: &str, class: OwnershipClass) -> Self {
        Self {
            owner: owner.to_string(),
            location: location.to_string(),
            bucket: bucket.to_string(),
            class,
        }
    }

    fn unknown(class: OwnershipClass) -> Self {
        Self {
            owner: String::new(),
            location: String::new(),
            bucket: String::new(),
            class,
        }
    }

    fn mgrast(class: OwnershipClass) -> Self {
        Self::known("mgrast", "anls3_mgrast", "mgrast", class)
    }

    pub fn is_known(&self) -> bool {
        !self.location.is_empty()
    }

    /// Diagnostic for attribute shapes no rule matched.
    pub fn diagnostic(&self) -> Option<&'static str> {
        match self.class {
            OwnershipClass::UnknownOwner => Some("unknown owner"),
            OwnershipClass::UnknownType => Some("unknown node type"),
            _ => None,
        }
    }

    /// `owner:location:bucket`
    pub fn triple(&self) -> String {
        format!("{}:{}:{}", self.owner, self.location, self.bucket)
    }
}

/// Classify a node by its attributes.
pub fn classify(attributes: Option<&Map<String, Value>>) -> Ownership {
    let Some(attributes) = attributes else {
        return Ownership::unknown(OwnershipClass::UnknownType);
    };

    if let Some(owner) = attributes.get("owner") {
        let owner = owner.as_str().unwrap_or_default();
        return if owner == ANL_SEQ_OWNER {
            Ownership::known(ANL_SEQ_OWNER, "anls3_anlseq", "anlseq", OwnershipClass::AnlSeqCore)
        } else if owner.starts_with(MGRAST_OWNER_PREFIX) {
            Ownership::mgrast(OwnershipClass::MgRastOwner)
        } else {
            Ownership::unknown(OwnershipClass::UnknownOwner)
        };
    }

    if MGRAST_JOB_KEYS.iter().all(|k| attributes.contains_key(*k)) {
        return Ownership::mgrast(OwnershipClass::MgRastJob);
    }

    Ownership::unknown(OwnershipClass::UnknownType)
}
