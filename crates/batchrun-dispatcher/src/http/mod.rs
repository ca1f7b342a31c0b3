//! HTTP server for the dispatcher.
//!
//! Provides endpoints for:
//! - Batch submission (`/v1/batches`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // API routes
        .route("/v1/batches", post(handlers::submit_batch))
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use batchrun_core::{BatchResult, ItemError, Target};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::DispatcherConfig;
    use crate::dispatcher::Dispatcher;
    use crate::executor::{ExecutorError, ItemExecutor};

    struct EchoExecutor;

    #[async_trait]
    impl ItemExecutor for EchoExecutor {
        async fn execute(&self, target: &Target) -> Result<Value, ExecutorError> {
            match target.endpoint.as_str() {
                "http://svc/down" => Err(ExecutorError::Unavailable("no route".to_string())),
                "http://svc/slow" => Err(ItemError::Timeout.into()),
                endpoint => Ok(json!({ "echo": endpoint })),
            }
        }
    }

    fn app() -> (Router, Arc<AppState>) {
        let config = DispatcherConfig {
            max_items: 5,
            ..DispatcherConfig::default()
        };
        let dispatcher = Dispatcher::new(&config, Arc::new(EchoExecutor));
        let state = AppState::new(dispatcher);
        (create_router(state.clone()), state)
    }

    fn router() -> Router {
        app().0
    }

    fn post_batch(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/batches")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_submit_batch_returns_result() {
        let response = router()
            .oneshot(post_batch(json!({
                "items": [
                    {"endpoint": "http://svc/a"},
                    {"endpoint": "http://svc/slow"},
                    {"endpoint": "http://svc/c", "method": "post", "payload": {"k": 1}}
                ],
                "concurrency_limit": 2
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let result: BatchResult = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(result.total(), 3);
        assert_eq!(result.succeeded_count, 2);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.outcomes[1].error_detail, Some(ItemError::Timeout));
    }

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let response = router()
            .oneshot(post_batch(json!({
                "items": [{"endpoint": "http://svc/a"}, {"endpoint": ""}]
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["field"], "items[1].endpoint");
    }

    #[tokio::test]
    async fn test_oversized_batch_is_bad_request() {
        let items: Vec<Value> = (0..6)
            .map(|i| json!({ "endpoint": format!("http://svc/{i}") }))
            .collect();
        let response = router()
            .oneshot(post_batch(json!({ "items": items })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_mistyped_body_is_validation_error() {
        let (router, state) = app();
        let bodies = [
            json!({ "items": "x" }),
            json!({ "items": [{ "endpoint": 5 }] }),
            json!({ "items": [], "concurrency_limit": -1 }),
        ];

        for body in bodies {
            let response = router.clone().oneshot(post_batch(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = body_json(response).await;
            assert_eq!(body["error"], "validation_error");
            assert_eq!(body["field"], "body");
            assert!(body["message"].as_str().is_some());
        }

        let text = state.dispatcher.metrics().render();
        assert!(text.contains("batchrun_batches_total{result=\"rejected\"} 3"));
    }

    #[tokio::test]
    async fn test_unavailable_executor_is_service_unavailable() {
        let response = router()
            .oneshot(post_batch(json!({
                "items": [{"endpoint": "http://svc/down"}]
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"], "scheduler_error");
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let router = router();

        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("batchrun_items_in_flight 0"));
    }
}
