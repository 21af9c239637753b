use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use marketplace_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::usecase::AppUsKsError;

use super::{json_header, WebApiResponse};

// single place converting use-case errors to http responses, details of
// unexpected errors are logged and never sent back to clients
pub(super) fn translate(e: AppUsKsError, logctx: &Arc<AppLogContext>) -> WebApiResponse {
    let (status, body) = match e {
        AppUsKsError::Validation(fields) => (
            StatusCode::BAD_REQUEST,
            json!({"reason": "validation", "fields": fields}),
        ),
        AppUsKsError::NotFound {
            resource,
            id,
            from_body,
        } => {
            let status = if from_body {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::NOT_FOUND
            };
            let body = json!({"reason": "not-found", "resource": resource, "id": id});
            (status, body)
        }
        AppUsKsError::InvalidState(detail) => (
            StatusCode::BAD_REQUEST,
            json!({"reason": "invalid-state", "detail": detail}),
        ),
        AppUsKsError::PermissionDenied(detail) => {
            app_log_event!(logctx, AppLogLevel::INFO, "permission-denied, {detail}");
            (
                StatusCode::FORBIDDEN,
                json!({"reason": "permission-denied"}),
            )
        }
        AppUsKsError::Unexpected(e) => {
            app_log_event!(logctx, AppLogLevel::ERROR, "{e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"reason": "internal-error"}),
            )
        }
    };
    (status, json_header(), body.to_string())
}
