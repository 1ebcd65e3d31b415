//! System utilities and monitoring
//!
//! Metrics and the health report served by the HTTP front end.

pub mod metrics;

pub mod health {
    //! Process health report
    use once_cell::sync::Lazy;
    use serde::Serialize;
    use std::time::Instant;

    static STARTED: Lazy<Instant> = Lazy::new(Instant::now);

    /// Health report returned by `GET /api/v1/health`
    #[derive(Debug, Clone, Serialize)]
    pub struct HealthStatus {
        /// Always `"ok"` while the process serves requests
        pub status: String,
        /// Crate version
        pub version: String,
        /// Seconds since [`mark_started`] was first called
        pub uptime_seconds: u64,
        /// Active asset store backend
        pub storage_backend: String,
    }

    /// Record the process start time
    pub fn mark_started() {
        Lazy::force(&STARTED);
    }

    /// Build a health report
    pub fn check(storage_backend: &str) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            version: crate::VERSION.to_string(),
            uptime_seconds: STARTED.elapsed().as_secs(),
            storage_backend: storage_backend.to_string(),
        }
    }
}
