//! API request handlers for the fanmon status API.
//!
//! # Handler Modules
//!
//! - [`info`] - Service information and root endpoint
//! - [`fans`] - Presence and functional state of each fan and rotor
//! - [`errors`] - Escalated sensor faults
//!
//! All handlers take `State<AppState>`, read the published snapshot, and
//! return `Result<Json<ApiResponse<T>>, ApiError>`.

pub mod errors;
pub mod fans;
pub mod info;
