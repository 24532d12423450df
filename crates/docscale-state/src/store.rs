//! StateStore: redb-backed state persistence for docscale.
//!
//! Provides the desired-capacity entries and the cluster/instance
//! registry. The store supports both on-disk and in-memory backends
//! (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use docscale_core::{
    CapacityStore, ClusterInspector, ClusterSnapshot, DesiredCapacity, InstanceSnapshot,
    MemberRef, NewInstanceSpec, capacity_key,
};

use crate::error::{StateError, StateResult};
use crate::registry::{ClusterRecord, FleetSnapshot, instance_key};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(CAPACITY).map_err(map_err!(Table))?;
        txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
        txn.open_table(INSTANCES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Desired capacity ───────────────────────────────────────────

    /// Read the stored desired capacity of a cluster.
    pub fn get_capacity(&self, cluster_id: &str) -> StateResult<Option<u32>> {
        let key = capacity_key(cluster_id);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CAPACITY).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => parse_capacity(&key, guard.value()).map(Some),
            None => Ok(None),
        }
    }

    /// Overwrite the stored desired capacity of a cluster.
    pub fn put_capacity(&self, cluster_id: &str, capacity: DesiredCapacity) -> StateResult<()> {
        let key = capacity_key(cluster_id);
        let value = capacity.to_string();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(CAPACITY).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_str())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, %value, "desired capacity stored");
        Ok(())
    }

    // ── Clusters ───────────────────────────────────────────────────

    /// Insert or update a cluster record.
    pub fn put_cluster(&self, record: &ClusterRecord) -> StateResult<()> {
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
            table
                .insert(record.cluster_id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(cluster = %record.cluster_id, "cluster stored");
        Ok(())
    }

    /// Get a cluster record by identifier.
    pub fn get_cluster(&self, cluster_id: &str) -> StateResult<Option<ClusterRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
        match table.get(cluster_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: ClusterRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List all cluster records.
    pub fn list_clusters(&self) -> StateResult<Vec<ClusterRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: ClusterRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    // ── Instances ──────────────────────────────────────────────────

    /// Insert or update an instance snapshot.
    pub fn put_instance(&self, instance: &InstanceSnapshot) -> StateResult<()> {
        let key = instance_key(&instance.cluster_id, &instance.instance_id);
        let value = serde_json::to_vec(instance).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(INSTANCES).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get one of a cluster's instances by identifier.
    pub fn get_instance(
        &self,
        cluster_id: &str,
        instance_id: &str,
    ) -> StateResult<Option<InstanceSnapshot>> {
        let key = instance_key(cluster_id, instance_id);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(INSTANCES).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let instance: InstanceSnapshot =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(instance))
            }
            None => Ok(None),
        }
    }

    /// List all instances of a cluster, in instance-id order.
    pub fn list_instances_for_cluster(&self, cluster_id: &str) -> StateResult<Vec<InstanceSnapshot>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(INSTANCES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let instance: InstanceSnapshot =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if instance.cluster_id == cluster_id {
                results.push(instance);
            }
        }
        Ok(results)
    }

    /// Register a new reader in status "creating".
    ///
    /// The reader lands in the cluster zone with the fewest instances and
    /// is appended to the cluster's membership.
    pub fn register_reader(&self, spec: &NewInstanceSpec) -> StateResult<InstanceSnapshot> {
        if self.get_instance(&spec.cluster_id, &spec.instance_id)?.is_some() {
            return Err(StateError::AlreadyExists(format!(
                "instance {} in cluster {}",
                spec.instance_id, spec.cluster_id
            )));
        }
        let mut record = self
            .get_cluster(&spec.cluster_id)?
            .ok_or_else(|| StateError::NotFound(format!("cluster {}", spec.cluster_id)))?;
        let existing = self.list_instances_for_cluster(&spec.cluster_id)?;

        let instance = InstanceSnapshot {
            instance_id: spec.instance_id.clone(),
            cluster_id: spec.cluster_id.clone(),
            status: "creating".to_string(),
            instance_class: spec.instance_class.clone(),
            engine: spec.engine.clone(),
            availability_zone: record.least_loaded_zone(&existing),
        };
        record.members.push(MemberRef {
            instance_id: spec.instance_id.clone(),
            is_writer: false,
        });

        let key = instance_key(&instance.cluster_id, &instance.instance_id);
        let instance_value = serde_json::to_vec(&instance).map_err(map_err!(Serialize))?;
        let record_value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut instances = txn.open_table(INSTANCES).map_err(map_err!(Table))?;
            instances
                .insert(key.as_str(), instance_value.as_slice())
                .map_err(map_err!(Write))?;
            let mut clusters = txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
            clusters
                .insert(record.cluster_id.as_str(), record_value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            instance = %instance.instance_id,
            zone = %instance.availability_zone,
            "reader registered"
        );
        Ok(instance)
    }

    /// Mark one of a cluster's instances as "deleting". Membership is left
    /// untouched until the next fleet import drops it.
    pub fn mark_deleting(&self, cluster_id: &str, instance_id: &str) -> StateResult<()> {
        let mut instance = self.get_instance(cluster_id, instance_id)?.ok_or_else(|| {
            StateError::NotFound(format!("instance {instance_id} in cluster {cluster_id}"))
        })?;
        instance.status = "deleting".to_string();
        self.put_instance(&instance)?;
        debug!(cluster = %cluster_id, instance = %instance_id, "instance marked deleting");
        Ok(())
    }

    /// The cluster listing `instance_id` as a member. Fails when no
    /// cluster, or more than one, claims it.
    pub fn owning_cluster(&self, instance_id: &str) -> StateResult<ClusterRecord> {
        let mut owners = self
            .list_clusters()?
            .into_iter()
            .filter(|c| c.has_member(instance_id));
        let owner = owners
            .next()
            .ok_or_else(|| StateError::NotFound(format!("instance {instance_id}")))?;
        if let Some(other) = owners.next() {
            return Err(StateError::InvalidValue(format!(
                "instance {instance_id} is a member of both {} and {}",
                owner.cluster_id, other.cluster_id
            )));
        }
        Ok(owner)
    }

    /// Replace everything known about one cluster with `fleet`.
    pub fn import_fleet(&self, fleet: &FleetSnapshot) -> StateResult<()> {
        let cluster_id = fleet.cluster.cluster_id.as_str();
        if let Some(stray) = fleet.instances.iter().find(|i| i.cluster_id != cluster_id) {
            return Err(StateError::InvalidValue(format!(
                "instance {} belongs to cluster {}, not {cluster_id}",
                stray.instance_id, stray.cluster_id
            )));
        }

        let stale: Vec<String> = self
            .list_instances_for_cluster(cluster_id)?
            .iter()
            .map(|i| instance_key(cluster_id, &i.instance_id))
            .collect();
        let record_value = serde_json::to_vec(&fleet.cluster).map_err(map_err!(Serialize))?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut instances = txn.open_table(INSTANCES).map_err(map_err!(Table))?;
            for key in &stale {
                instances.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            for instance in &fleet.instances {
                let key = instance_key(cluster_id, &instance.instance_id);
                let value = serde_json::to_vec(instance).map_err(map_err!(Serialize))?;
                instances
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
            let mut clusters = txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
            clusters
                .insert(cluster_id, record_value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            cluster = %cluster_id,
            replaced = stale.len(),
            imported = fleet.instances.len(),
            "fleet imported"
        );
        Ok(())
    }
}

/// Stored values must be all-digit decimals.
fn parse_capacity(key: &str, raw: &str) -> StateResult<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StateError::InvalidValue(format!("{key} = {raw:?}")));
    }
    raw.parse::<u32>()
        .map_err(|e| StateError::InvalidValue(format!("{key} = {raw:?}: {e}")))
}

impl CapacityStore for StateStore {
    fn get_desired_capacity(&self, cluster_id: &str) -> anyhow::Result<Option<u32>> {
        Ok(self.get_capacity(cluster_id)?)
    }

    fn put_desired_capacity(
        &self,
        cluster_id: &str,
        capacity: DesiredCapacity,
    ) -> anyhow::Result<()> {
        Ok(self.put_capacity(cluster_id, capacity)?)
    }
}

impl ClusterInspector for StateStore {
    fn describe_cluster(&self, cluster_id: &str) -> anyhow::Result<ClusterSnapshot> {
        let record = self
            .get_cluster(cluster_id)?
            .ok_or_else(|| StateError::NotFound(format!("cluster {cluster_id}")))?;
        Ok(record.to_snapshot())
    }

    fn describe_instances(&self, cluster_id: &str) -> anyhow::Result<Vec<InstanceSnapshot>> {
        Ok(self.list_instances_for_cluster(cluster_id)?)
    }

    fn create_instance(&self, spec: &NewInstanceSpec) -> anyhow::Result<()> {
        self.register_reader(spec)?;
        Ok(())
    }

    fn delete_instance(&self, instance_id: &str) -> anyhow::Result<()> {
        let owner = self.owning_cluster(instance_id)?;
        Ok(self.mark_deleting(&owner.cluster_id, instance_id)?)
    }
}
