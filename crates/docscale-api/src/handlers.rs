//! REST API handlers.
//!
//! Each handler runs one adapter operation and maps its outcome onto the
//! controller's response contract.

use std::num::ParseIntError;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use docscale_autoscale::{ScalingError, ScalingResult};
use docscale_core::StatusReport;

use crate::ApiState;

/// Body of the degraded response for a cluster that is not available.
pub const INVALID_CLUSTER_STATUS: &str = "Invalid cluster status";

/// PATCH body sent by the autoscaling controller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleRequest {
    pub desired_capacity: CapacityValue,
}

/// The controller sends a number; hand-written calls may quote it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CapacityValue {
    Number(f64),
    Text(String),
}

impl ScaleRequest {
    /// Fractional numbers truncate toward zero. Quoted values must be
    /// whole integers.
    pub fn requested(&self) -> Result<i64, ParseIntError> {
        match &self.desired_capacity {
            CapacityValue::Number(n) => Ok(n.trunc() as i64),
            CapacityValue::Text(s) => s.trim().parse(),
        }
    }
}

fn not_found(cluster_id: &str, error: &ScalingError) -> Response {
    warn!(cluster = %cluster_id, %error, "scaling operation failed");
    (StatusCode::NOT_FOUND, error.to_string()).into_response()
}

fn report_response(cluster_id: &str, result: ScalingResult<StatusReport>) -> Response {
    match result {
        Ok(report) => {
            debug!(cluster = %cluster_id, ?report, "response");
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(e) if e.is_precondition() => {
            debug!(cluster = %cluster_id, error = %e, "cluster not ready");
            (StatusCode::OK, INVALID_CLUSTER_STATUS).into_response()
        }
        Err(e) => not_found(cluster_id, &e),
    }
}

/// GET /scalableTargetDimensions/:id
pub async fn get_status(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    report_response(&id, state.adapter.get_status(&id))
}

/// PATCH /scalableTargetDimensions/:id
///
/// The body is parsed here rather than with the `Json` extractor so a
/// malformed body answers `404` like every other failure.
pub async fn apply_scaling(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let request: ScaleRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(cluster = %id, error = %e, "unreadable scaling request");
            return (StatusCode::NOT_FOUND, e.to_string()).into_response();
        }
    };
    let requested = match request.requested() {
        Ok(requested) => requested,
        Err(e) => {
            warn!(cluster = %id, error = %e, "unreadable desired capacity");
            return (StatusCode::NOT_FOUND, e.to_string()).into_response();
        }
    };
    debug!(cluster = %id, requested, "scaling request");

    report_response(&id, state.adapter.apply_scaling(&id, requested))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::to_bytes;
    use docscale_autoscale::ScalingAdapter;
    use docscale_core::{DesiredCapacity, InstanceSnapshot, MemberRef};
    use docscale_state::{ClusterRecord, FleetSnapshot, StateStore};

    fn test_state(cluster_status: &str) -> (ApiState, StateStore) {
        let store = StateStore::open_in_memory().unwrap();
        let reader = |id: &str, zone: &str| InstanceSnapshot {
            instance_id: id.to_string(),
            cluster_id: "docs".to_string(),
            status: "available".to_string(),
            instance_class: "db.r5.large".to_string(),
            engine: "docdb".to_string(),
            availability_zone: zone.to_string(),
        };
        store
            .import_fleet(&FleetSnapshot {
                cluster: ClusterRecord {
                    cluster_id: "docs".to_string(),
                    status: cluster_status.to_string(),
                    availability_zones: vec!["zone-a".to_string(), "zone-b".to_string()],
                    members: vec![
                        MemberRef { instance_id: "r1".to_string(), is_writer: false },
                        MemberRef { instance_id: "r2".to_string(), is_writer: false },
                    ],
                },
                instances: vec![reader("r1", "zone-a"), reader("r2", "zone-b")],
            })
            .unwrap();
        let shared = Arc::new(store.clone());
        let adapter = ScalingAdapter::new(shared.clone(), shared)
            .with_seed_fn(Box::new(|| "7".to_string()));
        (
            ApiState {
                adapter: Arc::new(adapter),
            },
            store,
        )
    }

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn request(value: CapacityValue) -> ScaleRequest {
        ScaleRequest {
            desired_capacity: value,
        }
    }

    #[test]
    fn requested_truncates_fraction() {
        assert_eq!(request(CapacityValue::Number(7.0)).requested(), Ok(7));
        assert_eq!(request(CapacityValue::Number(3.9)).requested(), Ok(3));
        assert_eq!(request(CapacityValue::Number(-0.5)).requested(), Ok(0));
    }

    #[test]
    fn requested_accepts_quoted_integer() {
        let parsed: ScaleRequest = serde_json::from_str(r#"{"desiredCapacity": "7"}"#).unwrap();
        assert_eq!(parsed.desired_capacity, CapacityValue::Text("7".to_string()));
        assert_eq!(parsed.requested(), Ok(7));
        assert_eq!(request(CapacityValue::Text(" 4 ".to_string())).requested(), Ok(4));
        assert!(request(CapacityValue::Text("7.5".to_string())).requested().is_err());
        assert!(request(CapacityValue::Text("seven".to_string())).requested().is_err());
    }

    #[tokio::test]
    async fn get_status_ok() {
        let (state, store) = test_state("available");
        store.put_capacity("docs", DesiredCapacity::new(2).unwrap()).unwrap();

        let resp = get_status(State(state), Path("docs".to_string())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert_eq!(content_type, "application/json");

        let report: StatusReport = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(report.actual_capacity, 2.0);
        assert_eq!(report.scaling_status.as_str(), "Successful");
    }

    #[tokio::test]
    async fn get_status_without_capacity_is_not_found() {
        let (state, _store) = test_state("available");

        let resp = get_status(State(state), Path("docs".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_text(resp).await.contains("desired capacity"));
    }

    #[tokio::test]
    async fn apply_scaling_malformed_body_is_not_found() {
        let (state, _store) = test_state("available");

        let resp = apply_scaling(
            State(state),
            Path("docs".to_string()),
            Bytes::from_static(b"{\"capacity\": 3}"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_text(resp).await.contains("desiredCapacity"));
    }

    #[tokio::test]
    async fn apply_scaling_cluster_not_ready() {
        let (state, _store) = test_state("modifying");

        let resp = apply_scaling(
            State(state),
            Path("docs".to_string()),
            Bytes::from_static(b"{\"desiredCapacity\": 3}"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, INVALID_CLUSTER_STATUS);
    }

    #[tokio::test]
    async fn apply_scaling_scale_out() {
        let (state, store) = test_state("available");

        let resp = apply_scaling(
            State(state),
            Path("docs".to_string()),
            Bytes::from_static(b"{\"desiredCapacity\": 3.0}"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let report: StatusReport = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(report.desired_capacity, 3.0);
        assert_eq!(report.scaling_status.as_str(), "Pending");
        assert!(store.get_instance("docs", "r1-0-7").unwrap().is_some());
        assert_eq!(store.get_capacity("docs").unwrap(), Some(3));
    }

    #[tokio::test]
    async fn apply_scaling_quoted_capacity() {
        let (state, store) = test_state("available");

        let resp = apply_scaling(
            State(state.clone()),
            Path("docs".to_string()),
            Bytes::from_static(b"{\"desiredCapacity\": \"4\"}"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(store.get_capacity("docs").unwrap(), Some(4));

        let resp = apply_scaling(
            State(state),
            Path("docs".to_string()),
            Bytes::from_static(b"{\"desiredCapacity\": \"four\"}"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(store.get_capacity("docs").unwrap(), Some(4));
    }
}
