//! redb table definitions for the docscale state store.

use redb::TableDefinition;

/// Desired capacity as a decimal string, keyed by `DesiredSize-{cluster_id}`.
pub const CAPACITY: TableDefinition<&str, &str> = TableDefinition::new("capacity");

/// Cluster records keyed by `{cluster_id}`.
pub const CLUSTERS: TableDefinition<&str, &[u8]> = TableDefinition::new("clusters");

/// Instance snapshots keyed by `{cluster_id}:{instance_id}`.
pub const INSTANCES: TableDefinition<&str, &[u8]> = TableDefinition::new("instances");
