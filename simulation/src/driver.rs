//! The real-time driver loop, mirroring the teacher's
//! `start_scheduler_loop`: one `tokio::time::interval` advancing every
//! running simulation, plus a slower sweeper evicting expired ones (§4.7, §5).
use std::sync::Arc;
use std::time::Duration;

use model::AppConfig;
use store::{Clock, Transport};
use tracing::debug;

use crate::registry::SimulationRegistry;

/// Runs forever, ticking `registry` every `config.driver_tick_ms` and
/// sweeping it every `config.cleanup_interval_secs`. Intended to be spawned
/// as its own task by the runner binary.
pub async fn run_forever(
    registry: Arc<SimulationRegistry>,
    clock: Arc<dyn Clock>,
    transport: Arc<dyn Transport>,
    config: AppConfig,
) {
    let mut tick_interval = tokio::time::interval(Duration::from_millis(config.driver_tick_ms));
    let mut sweep_interval = tokio::time::interval(Duration::from_secs(config.cleanup_interval_secs));

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                registry.advance_all_to_now(clock.as_ref(), &config.business_hours, transport.as_ref()).await;
            }
            _ = sweep_interval.tick() => {
                debug!("running simulation registry sweep");
                registry.sweep_expired(config.simulation_ttl_secs).await;
            }
        }
    }
}
