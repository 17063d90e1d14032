//! Shock Migration Library
//!
//! Moves node content from a Shock service to an S3-compatible location:
//! assembles the node-id list, downloads and verifies each node, pushes it to
//! the store and records the new location with the service.

pub mod digest;
pub mod driver;
pub mod ids;
pub mod report;
pub mod retry;
pub mod state;

// Re-export commonly used types
pub use digest::{md5_file, verify_md5};
pub use driver::{MigrationDriver, MigrationSettings};
pub use ids::{collect_node_ids, dedupe, validate_node_id, IdSources};
pub use report::{MigrationReport, NodeReport};
pub use retry::{retry, RetryPolicy};
pub use state::{NodeOutcome, NodeState};
