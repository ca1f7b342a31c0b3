//! Batch submission handler.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use batchrun_core::{BatchRequest, ValidationError};

use crate::dispatcher::DispatchError;
use crate::http::responses::ErrorResponse;
use crate::scheduler::SchedulerError;
use crate::state::AppState;

/// Run a batch and return its result.
///
/// The response is sent once every item has resolved. A body that does not
/// decode as a batch request is rejected like any other invalid batch.
pub async fn submit_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let error = ValidationError::MalformedBody {
                message: rejection.body_text(),
            };
            state.dispatcher.record_rejection(&error);
            return validation_response(&error);
        }
    };

    match state.dispatcher.dispatch(request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(DispatchError::Validation(e)) => validation_response(&e),
        Err(DispatchError::Scheduler(e)) => scheduler_response(&e),
    }
}

fn validation_response(error: &ValidationError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "validation_error".to_string(),
            message: error.to_string(),
            field: Some(error.field()),
        }),
    )
        .into_response()
}

fn scheduler_response(error: &SchedulerError) -> Response {
    let status = match error {
        SchedulerError::ExecutorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: "scheduler_error".to_string(),
            message: error.to_string(),
            field: None,
        }),
    )
        .into_response()
}
