//! Fan handlers for presence and functional status

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::api_ok;
use axum::{
    extract::{Path, State},
    Json,
};
use fanmon_core::api::{ApiResponse, FanListResponse, FanStatus};
use fanmon_core::FanMonError;

use tracing::debug;

/// List every monitored fan with its rotor sensors.
///
/// Presence is `indeterminate` until a presence sensor has been read.
///
/// # Endpoint
///
/// `GET /api/v0/fans`
pub(crate) async fn list_fans(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<FanListResponse>>, ApiError> {
    debug!("Request: GET /api/v0/fans");

    let snapshot = state.snapshot.read().await;
    api_ok!(snapshot.fans.clone())
}

/// Status of a single fan by name.
///
/// # Endpoint
///
/// `GET /api/v0/fan/:name`
///
/// # Errors
///
/// Returns 404 if no fan has that name.
pub(crate) async fn get_fan(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<FanStatus>>, ApiError> {
    debug!("Request: GET /api/v0/fan/{}", name);

    let snapshot = state.snapshot.read().await;
    let fan = snapshot
        .fans
        .fans
        .iter()
        .find(|fan| fan.name == name)
        .cloned()
        .ok_or(FanMonError::FanNotFound(name))?;
    api_ok!(fan)
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{body_string, test_app};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = body_string(response.into_body()).await;
        (status, serde_json::from_str(&body).unwrap())
    }

    #[tokio::test]
    async fn test_list_fans() {
        let (status, json) = get("/api/v0/fans").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");

        let fans = json["data"]["fans"].as_array().unwrap();
        assert_eq!(fans.len(), 2);
        assert_eq!(fans[0]["presence"], "present");
        assert_eq!(fans[0]["functional"], false);
        assert_eq!(fans[1]["presence"], "indeterminate");
    }

    #[tokio::test]
    async fn test_get_fan() {
        let (status, json) = get("/api/v0/fan/fan0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["inventory"], "/system/chassis/motherboard/fan0");
        assert_eq!(json["data"]["sensors"][0]["name"], "fan0_0");
        assert_eq!(json["data"]["sensors"][0]["functional"], false);
        assert_eq!(json["data"]["sensors"][0]["target"], 10000);
    }

    #[tokio::test]
    async fn test_get_unknown_fan() {
        let (status, json) = get("/api/v0/fan/fan7").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "Fan not found: fan7");
    }
}
