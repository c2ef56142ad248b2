// HTTP routes

mod http;

use axum::{
    Router,
    routing::{get, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::bucket_repo::BucketRepo;
use crate::sample_repo::SampleRepo;
use crate::worker::RenderSettings;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) buckets: Arc<BucketRepo>,
    pub(crate) samples: Arc<SampleRepo>,
    pub(crate) render: Arc<RenderSettings>,
}

pub fn app(
    buckets: Arc<BucketRepo>,
    samples: Arc<SampleRepo>,
    render: RenderSettings,
) -> Router {
    let state = AppState {
        buckets,
        samples,
        render: Arc::new(render),
    };
    Router::new()
        .route("/", get(|| async { "bucketwatch: bucket size tracker" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route(
            "/objects/{*key}", // PUT/GET/DELETE /objects/<key>
            put(http::put_object_handler)
                .get(http::get_object_handler)
                .delete(http::delete_object_handler),
        )
        .route("/plot", get(http::plot_handler)) // GET /plot (render trigger)
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
