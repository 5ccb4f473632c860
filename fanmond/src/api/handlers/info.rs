//! Info handlers for service information and root endpoint

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::api_ok;

use axum::{extract::State, Json};
use fanmon_core::api::{ApiResponse, InfoResponse};
use serde_json::{json, Value};
use tracing::debug;

/// Handle the root endpoint.
///
/// Useful for health checks and verifying the API is accessible.
///
/// # Endpoint
///
/// `GET /`
pub(crate) async fn root() -> Result<Json<ApiResponse<Value>>, ApiError> {
    debug!("Request: GET /");

    api_ok!(json!({
        "service": "fanmon",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok"
    }))
}

/// Retrieve monitor information.
///
/// # Endpoint
///
/// `GET /api/v0/info`
///
/// # Returns
///
/// - `version` - Daemon version
/// - `mode` - `init` or `monitor`
/// - `uptime` - Seconds since the API started
/// - `fan_count`, `sensor_count` - Size of the monitored object graph
/// - `watched_properties` - Number of registered bus properties
pub(crate) async fn get_info(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<InfoResponse>>, ApiError> {
    debug!("Request: GET /api/v0/info");

    let snapshot = state.snapshot.read().await;
    api_ok!(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: snapshot.mode.to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        fan_count: snapshot.fans.fans.len(),
        sensor_count: snapshot.sensor_count,
        watched_properties: snapshot.watched_properties,
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
    async fn test_root() {
        let response = test_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response.into_body()).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["service"], "fanmon");
    }

    #[tokio::test]
    async fn test_get_info() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v0/info")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response.into_body()).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["data"]["mode"], "init");
        assert_eq!(json["data"]["fan_count"], 2);
        assert_eq!(json["data"]["sensor_count"], 3);
        assert_eq!(json["data"]["watched_properties"], 4);
    }
}
