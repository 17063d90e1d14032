//! Data models for the Shock service
//!
//! These types mirror the JSON the service returns inside the `data` field of
//! its response envelope. The service owns every record; the client only reads
//! them and asks the service to change them.

mod acl;
mod location;
mod node;

pub use acl::*;
pub use location::*;
pub use node::*;
