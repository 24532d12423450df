//! docscale-state: embedded state store for docscale.
//!
//! Backed by [redb](https://docs.rs/redb), holds the persisted desired
//! capacity per cluster and a registry of clusters and instances that
//! serves as the daemon's cluster inspection backend.
//!
//! # Architecture
//!
//! Desired capacities are stored as decimal strings under
//! `DesiredSize-<clusterId>`. Instances are keyed `<clusterId>:<instanceId>`
//! so identifiers only need to be unique within a cluster. Cluster and
//! instance records are JSON-serialized into `&[u8]` value columns.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and implements both `CapacityStore` and `ClusterInspector`.

pub mod error;
pub mod registry;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use registry::{ClusterRecord, FleetSnapshot, instance_key};
pub use store::StateStore;
