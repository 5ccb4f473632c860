//! Escalated fault records

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::api_ok;
use axum::{extract::State, Json};
use fanmon_core::api::{ApiResponse, ErrorListResponse};

use tracing::debug;

/// List faults raised when a sensor stayed nonfunctional past its error delay.
///
/// # Endpoint
///
/// `GET /api/v0/errors`
pub(crate) async fn list_errors(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ErrorListResponse>>, ApiError> {
    debug!("Request: GET /api/v0/errors");

    let snapshot = state.snapshot.read().await;
    api_ok!(ErrorListResponse {
        errors: snapshot.errors.clone(),
    })
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{body_string, test_app};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_list_errors() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v0/errors")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response.into_body()).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let errors = json["data"]["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["sensor"], "fan0_0");
    }
}
