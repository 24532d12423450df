//! Registry records for the store-backed cluster inspector.

use serde::{Deserialize, Serialize};

use docscale_core::{ClusterId, ClusterSnapshot, InstanceSnapshot, MemberRef};

/// Zone assigned to new instances when a cluster lists none.
pub const UNKNOWN_ZONE: &str = "unknown";

/// Build the composite key for the instances table.
pub fn instance_key(cluster_id: &str, instance_id: &str) -> String {
    format!("{cluster_id}:{instance_id}")
}

/// Persisted view of one cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    pub cluster_id: ClusterId,
    pub status: String,
    /// Zones new readers may be placed in.
    #[serde(default)]
    pub availability_zones: Vec<String>,
    pub members: Vec<MemberRef>,
}

impl ClusterRecord {
    pub fn has_member(&self, instance_id: &str) -> bool {
        self.members.iter().any(|m| m.instance_id == instance_id)
    }

    pub fn to_snapshot(&self) -> ClusterSnapshot {
        ClusterSnapshot {
            cluster_id: self.cluster_id.clone(),
            status: self.status.clone(),
            members: self.members.clone(),
        }
    }

    /// Zone holding the fewest of `instances`, lexical order on ties.
    pub fn least_loaded_zone(&self, instances: &[InstanceSnapshot]) -> String {
        let mut zones: Vec<&String> = self.availability_zones.iter().collect();
        zones.sort();
        zones
            .into_iter()
            .min_by_key(|zone| {
                instances
                    .iter()
                    .filter(|i| &i.availability_zone == *zone)
                    .count()
            })
            .cloned()
            .unwrap_or_else(|| UNKNOWN_ZONE.to_string())
    }
}

/// A cluster together with all of its instances, as imported by
/// `docscaled fleet import`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    pub cluster: ClusterRecord,
    #[serde(default)]
    pub instances: Vec<InstanceSnapshot>,
}
