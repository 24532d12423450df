//! Collaborator traits injected into the scaling adapter.
//!
//! Backends are constructed by the caller and passed in explicitly, so
//! tests substitute doubles and the daemon wires a real store. Errors are
//! opaque `anyhow` values: the adapter reports any of them as a
//! dependency failure.

use crate::types::{ClusterSnapshot, DesiredCapacity, InstanceSnapshot, NewInstanceSpec};

/// Cluster and instance inspection plus the two mutation calls.
pub trait ClusterInspector: Send + Sync {
    /// Describe one cluster and its membership.
    fn describe_cluster(&self, cluster_id: &str) -> anyhow::Result<ClusterSnapshot>;

    /// Describe every instance belonging to the cluster.
    fn describe_instances(&self, cluster_id: &str) -> anyhow::Result<Vec<InstanceSnapshot>>;

    /// Request creation of a new reader instance.
    fn create_instance(&self, spec: &NewInstanceSpec) -> anyhow::Result<()>;

    /// Request deletion of an instance.
    fn delete_instance(&self, instance_id: &str) -> anyhow::Result<()>;
}

/// Persisted desired capacity, one value per cluster.
pub trait CapacityStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored for the cluster yet.
    fn get_desired_capacity(&self, cluster_id: &str) -> anyhow::Result<Option<u32>>;

    /// Overwrite the stored value.
    fn put_desired_capacity(&self, cluster_id: &str, capacity: DesiredCapacity)
    -> anyhow::Result<()>;
}

/// Key under which a cluster's desired capacity is persisted.
pub fn capacity_key(cluster_id: &str) -> String {
    format!("DesiredSize-{cluster_id}")
}
