//! Status evaluation: derives a `ScalingStatus` from reader states.
//!
//! Pure functions of their inputs; no I/O.

use docscale_core::{InstanceSnapshot, Lifecycle, ReaderSet, ScalingStatus};

/// Reader instances by lifecycle bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderCounts {
    /// Status "available".
    pub available: u32,
    /// Status creating, deleting, starting or stopping.
    pub pending: u32,
    /// Status "failed".
    pub failed: u32,
}

impl ReaderCounts {
    /// Count the instances whose identifier is in `readers`.
    pub fn count(readers: &ReaderSet, instances: &[InstanceSnapshot]) -> Self {
        let mut counts = Self::default();
        for instance in instances
            .iter()
            .filter(|i| readers.contains(&i.instance_id))
        {
            match instance.lifecycle() {
                Lifecycle::Available => counts.available += 1,
                Lifecycle::Transitioning => counts.pending += 1,
                Lifecycle::Failed => counts.failed += 1,
                Lifecycle::Other => {}
            }
        }
        counts
    }

    /// Apply status precedence: Failed > InProgress > Pending > Successful.
    ///
    /// An out-of-range `desired` always reports `Successful`.
    pub fn status(&self, desired: i64, desired_is_valid: bool) -> ScalingStatus {
        if !desired_is_valid {
            return ScalingStatus::Successful;
        }
        let mut status = ScalingStatus::Successful;
        if i64::from(self.available) != desired {
            status = ScalingStatus::Pending;
        }
        if self.pending > 0 {
            status = ScalingStatus::InProgress;
        }
        if self.failed > 0 {
            status = ScalingStatus::Failed;
        }
        status
    }
}

/// Evaluate the scaling status of a reader fleet.
pub fn evaluate(
    readers: &ReaderSet,
    instances: &[InstanceSnapshot],
    desired: i64,
    desired_is_valid: bool,
) -> ScalingStatus {
    ReaderCounts::count(readers, instances).status(desired, desired_is_valid)
}
