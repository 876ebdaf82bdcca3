// src/lib.rs
// Public library surface for the CLI binary and integration tests.

pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod metrics;
pub mod payload;
pub mod render;

// Background notification pipeline (poll, prioritize, format)
pub mod heartbeat;

// ---- Re-exports for stable public API ----
pub use crate::client::ArenaClient;
pub use crate::commands::Commands;
pub use crate::config::ArenaConfig;
pub use crate::error::ArenaError;
pub use crate::heartbeat::{Heartbeat, HeartbeatOutcome, Notification, HEARTBEAT_OK};

use tracing::info;

/// Heartbeat wired to the live API, using the configured cap and request timeout.
pub fn build_heartbeat(cfg: &ArenaConfig) -> Result<Heartbeat<ArenaClient>, ArenaError> {
    let client = ArenaClient::new(cfg)?;
    info!(
        api_url = %cfg.api_url,
        max_notifications = cfg.heartbeat.max_notifications,
        "heartbeat ready"
    );
    Ok(Heartbeat::from_config(client, &cfg.heartbeat, cfg.timeout()))
}
