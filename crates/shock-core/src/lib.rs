//! Shock Core Library
//!
//! This crate provides the domain models, response envelope, error taxonomy,
//! configuration and auth token handling shared by every Shock client component.

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod models;
pub mod ownership;

// Re-export commonly used types
pub use auth::AuthToken;
pub use config::{S3Config, ShockConfig, TransportPreference};
pub use envelope::Envelope;
pub use error::{ErrorMetadata, LogLevel, ShockError, ShockResult};
pub use models::{
    Acl, AclKind, Compression, FileInfo, LocationInfo, LocationState, LocationType, Node,
    NodeLocation, PreauthUrl,
};
pub use ownership::{classify, Ownership, OwnershipClass};
