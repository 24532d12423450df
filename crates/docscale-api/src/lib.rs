//! docscale-api: REST API for docscale.
//!
//! Exposes the scaling adapter under the path shape the autoscaling
//! controller calls for a custom-resource scalable target.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `{base}/scalableTargetDimensions/:id` | Report scaling status |
//! | PATCH | `{base}/scalableTargetDimensions/:id` | Apply a new desired capacity |
//!
//! Failures answer `404` with a plain-text body. A cluster that is not
//! available answers `200` with the plain-text body
//! `Invalid cluster status`.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use docscale_autoscale::ScalingAdapter;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub adapter: Arc<ScalingAdapter>,
}

/// Build the API router, optionally nested under `base_path` (e.g. "/prod").
pub fn build_router(adapter: Arc<ScalingAdapter>, base_path: &str) -> Router {
    let api_state = ApiState { adapter };

    let routes = Router::new()
        .route(
            "/scalableTargetDimensions/{id}",
            get(handlers::get_status).patch(handlers::apply_scaling),
        )
        .with_state(api_state);

    let base = base_path.trim_end_matches('/');
    if base.is_empty() {
        routes
    } else if base.starts_with('/') {
        Router::new().nest(base, routes)
    } else {
        Router::new().nest(&format!("/{base}"), routes)
    }
}
