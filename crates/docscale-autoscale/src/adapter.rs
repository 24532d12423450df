//! ScalingAdapter: the two operations a custom-resource scalable target
//! exposes to the autoscaling controller.
//!
//! Every call reads a fresh cluster snapshot; nothing is cached. There
//! is no locking around the read-then-act sequence in `apply_scaling`;
//! the controller's retry cadence is the only guard against overlapping
//! convergence attempts.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use docscale_core::*;

use crate::error::{ScalingError, ScalingResult};
use crate::evaluator::ReaderCounts;
use crate::selector::{AzTally, ReaderTemplate, plan_creation, plan_removal};

/// Produces the uniqueness suffix of new reader identifiers.
pub type SeedFn = Box<dyn Fn() -> String + Send + Sync>;

/// Fresh view of one cluster's readers.
struct Observation {
    readers: ReaderSet,
    instances: Vec<InstanceSnapshot>,
    counts: ReaderCounts,
}

/// Orchestrates capacity persistence, inspection, evaluation and
/// create/delete calls for one request at a time.
pub struct ScalingAdapter {
    capacity: Arc<dyn CapacityStore>,
    inspector: Arc<dyn ClusterInspector>,
    seed_fn: SeedFn,
}

impl ScalingAdapter {
    /// Create an adapter; new reader names are seeded with the Unix time.
    pub fn new(capacity: Arc<dyn CapacityStore>, inspector: Arc<dyn ClusterInspector>) -> Self {
        Self {
            capacity,
            inspector,
            seed_fn: Box::new(|| epoch_secs().to_string()),
        }
    }

    /// Replace the seed used for new reader names.
    pub fn with_seed_fn(mut self, f: SeedFn) -> Self {
        self.seed_fn = f;
        self
    }

    /// Report the scaling status against the stored desired capacity.
    pub fn get_status(&self, cluster_id: &str) -> ScalingResult<StatusReport> {
        info!(cluster = %cluster_id, "getting scaling status");

        let desired = match self.capacity.get_desired_capacity(cluster_id) {
            Ok(Some(desired)) => desired,
            Ok(None) => {
                return Err(ScalingError::CapacityUnavailable {
                    cluster_id: cluster_id.to_string(),
                    reason: "not set".to_string(),
                });
            }
            Err(e) => {
                return Err(ScalingError::CapacityUnavailable {
                    cluster_id: cluster_id.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        debug!(cluster = %cluster_id, desired, "loaded desired capacity");

        let cluster = self.inspector.describe_cluster(cluster_id)?;
        let observed = self.observe(&cluster)?;

        let desired = i64::from(desired);
        let status = observed.counts.status(desired, true);
        info!(cluster = %cluster_id, %status, "scaling status");

        Ok(StatusReport::new(
            cluster_id,
            observed.counts.available,
            desired,
            status,
        ))
    }

    /// Record a new desired capacity and, if the fleet is settled but the
    /// wrong size, create or delete readers to converge.
    ///
    /// Out-of-range requests are not persisted and report `Successful`
    /// without acting. The report always echoes `requested`.
    pub fn apply_scaling(&self, cluster_id: &str, requested: i64) -> ScalingResult<StatusReport> {
        info!(cluster = %cluster_id, requested, "scaling action");

        let desired_is_valid = match DesiredCapacity::new(requested) {
            Ok(desired) => {
                self.capacity.put_desired_capacity(cluster_id, desired)?;
                debug!(cluster = %cluster_id, %desired, "desired capacity persisted");
                true
            }
            Err(e) => {
                warn!(
                    cluster = %cluster_id,
                    error = %ScalingError::from(e),
                    "invalid desired capacity (may happen during registration), not persisting"
                );
                false
            }
        };

        let cluster = self.inspector.describe_cluster(cluster_id)?;
        debug!(cluster = %cluster_id, status = %cluster.status, "cluster status");
        if !cluster.is_available() {
            return Err(ScalingError::ClusterNotReady {
                cluster_id: cluster_id.to_string(),
                status: cluster.status,
            });
        }

        let observed = self.observe(&cluster)?;
        let status = observed.counts.status(requested, desired_is_valid);
        info!(cluster = %cluster_id, %status, "scaling status");

        if status == ScalingStatus::Pending {
            self.converge(cluster_id, requested, &observed)?;
        }

        Ok(StatusReport::new(
            cluster_id,
            observed.counts.available,
            requested,
            status,
        ))
    }

    /// Load readers and instance states for a cluster.
    fn observe(&self, cluster: &ClusterSnapshot) -> ScalingResult<Observation> {
        let readers = cluster.readers();
        debug!(cluster = %cluster.cluster_id, readers = readers.len(), "found readers");

        let instances = self.inspector.describe_instances(&cluster.cluster_id)?;
        let counts = ReaderCounts::count(&readers, &instances);
        debug!(
            cluster = %cluster.cluster_id,
            available = counts.available,
            pending = counts.pending,
            failed = counts.failed,
            "reader states"
        );

        Ok(Observation {
            readers,
            instances,
            counts,
        })
    }

    /// Issue the create or delete calls that close the gap between the
    /// available readers and `desired`.
    fn converge(&self, cluster_id: &str, desired: i64, observed: &Observation) -> ScalingResult<()> {
        let available = i64::from(observed.counts.available);
        info!(
            cluster = %cluster_id,
            available,
            desired,
            "initiating scaling actions, actual count does not equal desired count"
        );

        let delta = available - desired;
        if delta < 0 {
            let template = ReaderTemplate::from_instances(&observed.readers, &observed.instances)
                .ok_or_else(|| ScalingError::NoTemplateReader(cluster_id.to_string()))?;
            let prefix = observed
                .readers
                .first()
                .ok_or_else(|| ScalingError::NoTemplateReader(cluster_id.to_string()))?;

            let specs = plan_creation(
                &template,
                cluster_id,
                delta.unsigned_abs() as usize,
                prefix,
                &*self.seed_fn,
            );
            for spec in &specs {
                info!(
                    cluster = %cluster_id,
                    instance = %spec.instance_id,
                    class = %spec.instance_class,
                    engine = %spec.engine,
                    "creating read replica"
                );
                self.inspector.create_instance(spec)?;
            }
        } else if delta > 0 {
            let tally = AzTally::from_instances(&observed.readers, &observed.instances);
            for removal in plan_removal(tally, delta as usize) {
                info!(
                    cluster = %cluster_id,
                    zone = %removal.zone,
                    zone_replicas = removal.zone_tally,
                    instance = %removal.instance_id,
                    "removing read replica from zone with the most replicas"
                );
                self.inspector.delete_instance(&removal.instance_id)?;
            }
        }
        Ok(())
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
