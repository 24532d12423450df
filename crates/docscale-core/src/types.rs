//! Domain types for cluster state and scaling reports.
//!
//! Snapshots are fetched fresh for every operation and never cached.
//! `DesiredCapacity` is the only value with identity beyond one call.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a database cluster (also the scalable target dimension).
pub type ClusterId = String;

/// Identifier of a single database instance.
pub type InstanceId = String;

/// Cluster lifecycle status that allows scaling actions.
pub const CLUSTER_AVAILABLE: &str = "available";

/// Version string reported to the autoscaling controller.
pub const REPORT_VERSION: &str = "1.0";

// ── Cluster ───────────────────────────────────────────────────────

/// One entry of a cluster's membership list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    pub instance_id: InstanceId,
    pub is_writer: bool,
}

/// Point-in-time view of a cluster and its members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    pub cluster_id: ClusterId,
    /// Lifecycle status: "available", "creating", "modifying", ...
    pub status: String,
    /// Members in the order the inspection API returned them.
    pub members: Vec<MemberRef>,
}

impl ClusterSnapshot {
    /// Whether the cluster accepts scaling actions right now.
    pub fn is_available(&self) -> bool {
        self.status == CLUSTER_AVAILABLE
    }

    /// The non-writer members, in membership order.
    pub fn readers(&self) -> ReaderSet {
        ReaderSet::from_members(&self.members)
    }
}

/// The reader (replica) members of a cluster. Derived, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderSet {
    ids: Vec<InstanceId>,
}

impl ReaderSet {
    pub fn from_members(members: &[MemberRef]) -> Self {
        let ids = members
            .iter()
            .filter(|m| !m.is_writer)
            .map(|m| m.instance_id.clone())
            .collect();
        Self { ids }
    }

    pub fn contains(&self, instance_id: &str) -> bool {
        self.ids.iter().any(|id| id == instance_id)
    }

    /// First reader in membership order.
    pub fn first(&self) -> Option<&str> {
        self.ids.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<InstanceId>> FromIterator<S> for ReaderSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ── Instance ──────────────────────────────────────────────────────

/// Point-in-time view of one database instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSnapshot {
    pub instance_id: InstanceId,
    pub cluster_id: ClusterId,
    /// Raw lifecycle status string; see [`Lifecycle::of`].
    pub status: String,
    pub instance_class: String,
    pub engine: String,
    pub availability_zone: String,
}

impl InstanceSnapshot {
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::of(&self.status)
    }
}

/// Coarse classification of an instance lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// "available"
    Available,
    /// "creating", "deleting", "starting" or "stopping".
    Transitioning,
    /// "failed"
    Failed,
    /// Anything else ("modifying", "rebooting", ...). Not counted.
    Other,
}

impl Lifecycle {
    pub fn of(status: &str) -> Self {
        match status {
            "available" => Lifecycle::Available,
            "creating" | "deleting" | "starting" | "stopping" => Lifecycle::Transitioning,
            "failed" => Lifecycle::Failed,
            _ => Lifecycle::Other,
        }
    }
}

/// Parameters for a reader instance to be created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewInstanceSpec {
    pub instance_id: InstanceId,
    pub cluster_id: ClusterId,
    pub instance_class: String,
    pub engine: String,
}

// ── Capacity ──────────────────────────────────────────────────────

/// Requested capacity outside the accepted reader range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("desired capacity {requested} outside [{min}, {max}]", min = DesiredCapacity::MIN, max = DesiredCapacity::MAX)]
pub struct CapacityOutOfRange {
    pub requested: i64,
}

/// A validated desired reader count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DesiredCapacity(u32);

impl DesiredCapacity {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 15;

    pub fn new(requested: i64) -> Result<Self, CapacityOutOfRange> {
        if requested < i64::from(Self::MIN) || requested > i64::from(Self::MAX) {
            return Err(CapacityOutOfRange { requested });
        }
        Ok(Self(requested as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DesiredCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Scaling status ────────────────────────────────────────────────

/// Convergence state reported to the autoscaling controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingStatus {
    Successful,
    Pending,
    InProgress,
    Failed,
}

impl ScalingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalingStatus::Successful => "Successful",
            ScalingStatus::Pending => "Pending",
            ScalingStatus::InProgress => "InProgress",
            ScalingStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for ScalingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body of both scaling operations.
///
/// Capacities serialize as JSON floats (`5.0`), which is what the
/// controller's custom-resource contract was built against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub actual_capacity: f64,
    pub desired_capacity: f64,
    pub dimension_name: String,
    pub resource_name: String,
    pub scalable_target_dimension_id: String,
    pub scaling_status: ScalingStatus,
    pub version: String,
}

impl StatusReport {
    pub fn new(cluster_id: &str, actual: u32, desired: i64, status: ScalingStatus) -> Self {
        Self {
            actual_capacity: f64::from(actual),
            desired_capacity: desired as f64,
            dimension_name: cluster_id.to_string(),
            resource_name: cluster_id.to_string(),
            scalable_target_dimension_id: cluster_id.to_string(),
            scaling_status: status,
            version: REPORT_VERSION.to_string(),
        }
    }
}
