//! Global initialization utilities for the pipeline

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the process environment
///
/// Called once at the start of a stage entry point to:
/// - Load environment variables from a .env file if present
/// - Install the global tracing subscriber (filter from `RUST_LOG`,
///   default `info`)
///
/// Safe to call multiple times - will only run once
pub fn initialize_environment() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        // A subscriber may already be installed by a test harness; that is
        // fine, first writer wins.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
