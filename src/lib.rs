//! Scene Prefab - live scene graph to prefab document serializer
//!
//! Takes a node of an editor's live scene graph, together with its descendants
//! and components, and turns it into a flat, reference-indexed prefab document
//! plus its metadata record. Cross-object pointers in the live graph become
//! `{ "__id__": n }` indices into the document; asset pointers become compact
//! `{ "__uuid__" }` identifiers.
#![warn(missing_docs)]

// Core foundational modules
pub mod core;

// Main functional modules
pub mod inspector;
pub mod prefab;
pub mod storage;

// Outer surfaces
pub mod api;
pub mod system;

// Re-export commonly used items for convenience
pub use crate::core::{AppState, Config, Error, Result};
pub use prefab::{CreatePrefabRequest, PrefabService, ToolResult};

use crate::core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize tracing and metrics.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| Error::config(format!("Invalid log filter: {}", e)))?;

    let installed = match logging.format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };
    installed.map_err(|e| Error::config(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!("Initializing {} v{}", NAME, VERSION);

    system::metrics::init_registry();
    system::health::mark_started();

    Ok(())
}
