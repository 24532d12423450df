//! docscale-core: shared vocabulary for the docscale adapter.
//!
//! Holds the point-in-time cluster and instance snapshots, the desired
//! capacity and scaling status types, the two collaborator traits the
//! scaling adapter is built on, and the daemon configuration file.

pub mod collaborators;
pub mod config;
pub mod types;

pub use collaborators::{CapacityStore, ClusterInspector, capacity_key};
pub use config::DaemonConfig;
pub use types::*;
