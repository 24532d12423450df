//! Error types for the scaling adapter.

use thiserror::Error;

use docscale_core::CapacityOutOfRange;

/// Result type alias for scaling operations.
pub type ScalingResult<T> = Result<T, ScalingError>;

/// Why a scaling operation did not produce a status report.
#[derive(Debug, Error)]
pub enum ScalingError {
    /// Requested capacity outside the accepted range. The adapter logs and
    /// continues with this one; it never fails a call.
    #[error(transparent)]
    InvalidCapacity(#[from] CapacityOutOfRange),

    /// The cluster is not in the "available" lifecycle state.
    #[error("cluster {cluster_id} is not available (status: {status})")]
    ClusterNotReady { cluster_id: String, status: String },

    #[error("desired capacity for cluster {cluster_id} is unavailable: {reason}")]
    CapacityUnavailable { cluster_id: String, reason: String },

    #[error("cluster {0} has no reader to copy instance class and engine from")]
    NoTemplateReader(String),

    /// Inspection, persistence, or a create/delete call failed.
    #[error(transparent)]
    Dependency(#[from] anyhow::Error),
}

impl ScalingError {
    /// Precondition failures get the degraded response instead of an error.
    pub fn is_precondition(&self) -> bool {
        matches!(self, ScalingError::ClusterNotReady { .. })
    }
}
