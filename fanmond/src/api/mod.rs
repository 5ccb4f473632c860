//! Status API
//!
//! Read-only REST views of the monitor, built on Axum. Handlers only read
//! the snapshot the monitor loop publishes; they never touch the engine.

pub(crate) mod handlers;

use crate::service::SharedSnapshot;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Application state shared across all handlers
#[derive(Clone)]
pub(crate) struct AppState {
    /// Latest monitor state
    pub snapshot: SharedSnapshot,
    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    pub fn new(snapshot: SharedSnapshot) -> Self {
        Self {
            snapshot,
            start_time: Instant::now(),
        }
    }
}

/// Create the API router with all endpoints
pub(crate) fn create_router(state: AppState) -> Router {
    info!("Setting up API router...");

    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET])
        .allow_headers(tower_http::cors::Any);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Router::new()
        // Fan status endpoints
        .route("/api/v0/fans", get(handlers::fans::list_fans))
        .route("/api/v0/fan/:name", get(handlers::fans::get_fan))
        // Escalated faults
        .route("/api/v0/errors", get(handlers::errors::list_errors))
        // System info endpoint
        .route("/api/v0/info", get(handlers::info::get_info))
        // Root endpoint
        .route("/", get(handlers::info::root))
        .layer(middleware_stack)
        .with_state(state)
}

/// Error handling utilities
pub(crate) mod error {
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use fanmon_core::api::ApiResponse;
    use fanmon_core::FanMonError;

    use tracing::error;

    /// Custom error type for API responses
    #[derive(Debug)]
    pub struct ApiError {
        pub status_code: StatusCode,
        pub message: String,
    }

    impl ApiError {
        pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
            Self {
                status_code,
                message: message.into(),
            }
        }

        pub fn bad_request(message: impl Into<String>) -> Self {
            Self::new(StatusCode::BAD_REQUEST, message)
        }

        pub fn not_found(message: impl Into<String>) -> Self {
            Self::new(StatusCode::NOT_FOUND, message)
        }

        pub fn internal_error(message: impl Into<String>) -> Self {
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
        }

        /// Hardware could not be read
        pub fn service_unavailable(message: impl Into<String>) -> Self {
            Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            error!("API Error {}: {}", self.status_code, self.message);

            let response: ApiResponse<()> = ApiResponse::error(self.message);

            (self.status_code, Json(response)).into_response()
        }
    }

    impl From<FanMonError> for ApiError {
        fn from(err: FanMonError) -> Self {
            match err {
                FanMonError::FanNotFound(name) => {
                    Self::not_found(format!("Fan not found: {}", name))
                }
                FanMonError::InvalidInput(msg) => Self::bad_request(msg),
                FanMonError::Hardware(msg) | FanMonError::SensorUnavailable(msg) => {
                    Self::service_unavailable(msg)
                }
                _ => Self::internal_error(err.to_string()),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_error_mapping() {
            let err = ApiError::from(FanMonError::FanNotFound("fan9".to_string()));
            assert_eq!(err.status_code, StatusCode::NOT_FOUND);
            assert_eq!(err.message, "Fan not found: fan9");

            let err = ApiError::from(FanMonError::SensorUnavailable("gpio".to_string()));
            assert_eq!(err.status_code, StatusCode::SERVICE_UNAVAILABLE);

            let err = ApiError::from(FanMonError::Other("boom".to_string()));
            assert_eq!(err.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

/// Helper macro for successful responses
#[macro_export]
macro_rules! api_ok {
    ($data:expr) => {
        Ok(axum::Json(fanmon_core::api::ApiResponse::success($data)))
    };
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::service::MonitorSnapshot;
    use axum::body::Body;
    use fanmon_core::api::{FanListResponse, FanStatus, SensorStatus};
    use fanmon_core::{FaultRecord, MonitorMode, Presence};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// Router over a fixed two-fan snapshot
    pub fn test_app() -> Router {
        let snapshot = MonitorSnapshot {
            mode: MonitorMode::Init,
            sensor_count: 3,
            watched_properties: 4,
            fans: FanListResponse {
                fans: vec![
                    FanStatus {
                        name: "fan0".to_string(),
                        inventory: "/system/chassis/motherboard/fan0".to_string(),
                        presence: Presence::Present,
                        functional: false,
                        sensors: vec![
                            SensorStatus {
                                name: "fan0_0".to_string(),
                                functional: false,
                                input: Some(1200.0),
                                target: Some(10000),
                                fault_count: 0,
                            },
                            SensorStatus {
                                name: "fan0_1".to_string(),
                                functional: true,
                                input: Some(9800.0),
                                target: None,
                                fault_count: 0,
                            },
                        ],
                    },
                    FanStatus {
                        name: "fan1".to_string(),
                        inventory: "/system/chassis/motherboard/fan1".to_string(),
                        presence: Presence::Indeterminate,
                        functional: true,
                        sensors: vec![SensorStatus {
                            name: "fan1_0".to_string(),
                            functional: true,
                            input: None,
                            target: None,
                            fault_count: 0,
                        }],
                    },
                ],
            },
            errors: vec![FaultRecord {
                fan: "fan0".to_string(),
                sensor: "fan0_0".to_string(),
                inventory: "/system/chassis/motherboard/fan0/fan0_0".to_string(),
                timestamp: 1_700_000_000,
                message: "nonfunctional longer than error delay".to_string(),
            }],
        };

        create_router(AppState::new(Arc::new(RwLock::new(snapshot))))
    }

    pub async fn body_string(body: Body) -> String {
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
