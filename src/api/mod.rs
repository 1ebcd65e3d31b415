//! # API Module
//!
//! Thin HTTP automation front end over the prefab service.
//!
//! ## Endpoints Overview
//!
//! - `POST /api/v1/prefabs` - Serialize a live node into a new prefab
//! - `POST /api/v1/prefabs/validate` - Validate a stored prefab or an inline document
//! - `GET /api/v1/prefabs/info?path=` - Describe a stored prefab
//! - `GET /api/v1/health` - Health check
//! - `GET /metrics` - Prometheus metrics
//!
//! Every JSON response is `{ "success", "data", "message" }`.

pub mod handlers;
pub mod server;

// Re-export commonly used items
pub use handlers::ApiResponse;
pub use server::{create_app, start_server};
