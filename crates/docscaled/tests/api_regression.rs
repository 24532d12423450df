//! API regression tests.
//!
//! Drives the router end to end against an in-memory store: status
//! queries, scale-out, scale-in across zones, invalid requests, and the
//! cluster-not-ready response.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use docscale_api::build_router;
use docscale_autoscale::ScalingAdapter;
use docscale_core::*;
use docscale_state::{ClusterRecord, FleetSnapshot, StateStore};

fn test_store() -> StateStore {
    StateStore::open_in_memory().unwrap()
}

fn reader(id: &str, zone: &str, status: &str) -> InstanceSnapshot {
    InstanceSnapshot {
        instance_id: id.to_string(),
        cluster_id: "docs".to_string(),
        status: status.to_string(),
        instance_class: "db.r5.large".to_string(),
        engine: "docdb".to_string(),
        availability_zone: zone.to_string(),
    }
}

/// Writer plus readers r1..r5 spread 3/2 over zoneA/zoneB.
fn seed_fleet(store: &StateStore, cluster_status: &str) {
    let readers = [
        ("r1", "zoneA"),
        ("r2", "zoneB"),
        ("r3", "zoneA"),
        ("r4", "zoneB"),
        ("r5", "zoneA"),
    ];
    let mut members = vec![MemberRef {
        instance_id: "w1".to_string(),
        is_writer: true,
    }];
    let mut instances = vec![reader("w1", "zoneA", "available")];
    for (id, zone) in readers {
        members.push(MemberRef {
            instance_id: id.to_string(),
            is_writer: false,
        });
        instances.push(reader(id, zone, "available"));
    }
    store
        .import_fleet(&FleetSnapshot {
            cluster: ClusterRecord {
                cluster_id: "docs".to_string(),
                status: cluster_status.to_string(),
                availability_zones: vec!["zoneA".to_string(), "zoneB".to_string()],
                members,
            },
            instances,
        })
        .unwrap();
}

fn router(store: &StateStore, base_path: &str) -> Router {
    let shared = Arc::new(store.clone());
    let adapter = ScalingAdapter::new(shared.clone(), shared)
        .with_seed_fn(Box::new(|| "1700000000".to_string()));
    build_router(Arc::new(adapter), base_path)
}

fn patch(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn text_body(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn status_query_reports_successful() {
    let store = test_store();
    seed_fleet(&store, "available");
    store.put_capacity("docs", DesiredCapacity::new(5).unwrap()).unwrap();

    let req = Request::builder()
        .uri("/scalableTargetDimensions/docs")
        .body(Body::empty())
        .unwrap();
    let resp = router(&store, "").oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["actualCapacity"], 5.0);
    assert_eq!(body["desiredCapacity"], 5.0);
    assert_eq!(body["dimensionName"], "docs");
    assert_eq!(body["resourceName"], "docs");
    assert_eq!(body["scalableTargetDimensionId"], "docs");
    assert_eq!(body["scalingStatus"], "Successful");
    assert_eq!(body["version"], "1.0");
}

#[tokio::test]
async fn status_query_unknown_cluster_is_not_found() {
    let store = test_store();
    store.put_capacity("ghost", DesiredCapacity::new(2).unwrap()).unwrap();

    let req = Request::builder()
        .uri("/scalableTargetDimensions/ghost")
        .body(Body::empty())
        .unwrap();
    let resp = router(&store, "").oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(text_body(resp).await.contains("cluster ghost"));
}

#[tokio::test]
async fn scale_out_creates_two_readers() {
    let store = test_store();
    seed_fleet(&store, "available");

    let resp = router(&store, "")
        .oneshot(patch("/scalableTargetDimensions/docs", r#"{"desiredCapacity": 7}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["desiredCapacity"], 7.0);
    assert_eq!(body["actualCapacity"], 5.0);
    assert_eq!(body["scalingStatus"], "Pending");

    for id in ["r1-0-1700000000", "r1-1-1700000000"] {
        let created = store.get_instance("docs", id).unwrap().unwrap();
        assert_eq!(created.status, "creating");
        assert_eq!(created.instance_class, "db.r5.large");
        assert_eq!(created.engine, "docdb");
    }
    assert_eq!(store.get_capacity("docs").unwrap(), Some(7));
}

#[tokio::test]
async fn scale_in_removes_from_largest_zone_first() {
    let store = test_store();
    seed_fleet(&store, "available");

    let resp = router(&store, "")
        .oneshot(patch("/scalableTargetDimensions/docs", r#"{"desiredCapacity": 3}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["scalingStatus"], "Pending");

    let deleting: Vec<String> = store
        .list_instances_for_cluster("docs")
        .unwrap()
        .into_iter()
        .filter(|i| i.status == "deleting")
        .map(|i| i.instance_id)
        .collect();
    assert_eq!(deleting, ["r1", "r3"]);
}

#[tokio::test]
async fn second_patch_reports_in_progress() {
    let store = test_store();
    seed_fleet(&store, "available");
    let app = router(&store, "");

    let resp = app
        .clone()
        .oneshot(patch("/scalableTargetDimensions/docs", r#"{"desiredCapacity": 3}"#))
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["scalingStatus"], "Pending");

    let resp = app
        .oneshot(patch("/scalableTargetDimensions/docs", r#"{"desiredCapacity": 3}"#))
        .await
        .unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["scalingStatus"], "InProgress");
    assert_eq!(body["actualCapacity"], 3.0);
}

#[tokio::test]
async fn invalid_request_skips_persistence() {
    let store = test_store();
    seed_fleet(&store, "available");
    store.put_capacity("docs", DesiredCapacity::new(5).unwrap()).unwrap();

    let resp = router(&store, "")
        .oneshot(patch("/scalableTargetDimensions/docs", r#"{"desiredCapacity": 20}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["scalingStatus"], "Successful");
    assert_eq!(body["desiredCapacity"], 20.0);
    assert_eq!(store.get_capacity("docs").unwrap(), Some(5));
    assert!(
        store
            .list_instances_for_cluster("docs")
            .unwrap()
            .iter()
            .all(|i| i.status == "available")
    );
}

#[tokio::test]
async fn cluster_not_ready_returns_minimal_response() {
    let store = test_store();
    seed_fleet(&store, "creating");

    let resp = router(&store, "")
        .oneshot(patch("/scalableTargetDimensions/docs", r#"{"desiredCapacity": 3}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(text_body(resp).await, "Invalid cluster status");
    assert!(
        store
            .list_instances_for_cluster("docs")
            .unwrap()
            .iter()
            .all(|i| i.status == "available")
    );
}

#[tokio::test]
async fn malformed_patch_is_not_found() {
    let store = test_store();
    seed_fleet(&store, "available");

    let resp = router(&store, "")
        .oneshot(patch("/scalableTargetDimensions/docs", "not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn routes_nest_under_base_path() {
    let store = test_store();
    seed_fleet(&store, "available");
    store.put_capacity("docs", DesiredCapacity::new(5).unwrap()).unwrap();

    let req = Request::builder()
        .uri("/prod/scalableTargetDimensions/docs")
        .body(Body::empty())
        .unwrap();
    let resp = router(&store, "/prod/").oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder()
        .uri("/scalableTargetDimensions/docs")
        .body(Body::empty())
        .unwrap();
    let resp = router(&store, "prod").oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
