use async_trait::async_trait;
use model::{Inventory, SimulationId, Snapshot};
use tracing::info;

/// Outbound fan-out for simulation state, standing in for the push channel
/// to connected operator clients (§3, §6 — the core never blocks on a
/// subscriber, so every method here returns `()`, not a `Result`).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish_simulation_update(&self, simulation_id: SimulationId, snapshot: &Snapshot);
    async fn publish_inventory_update(&self, simulation_id: SimulationId, inventory: &Inventory);
}

/// Default transport for the headless runner: logs what would have been
/// pushed, at debug level so it stays quiet under normal operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingTransport;

#[async_trait]
impl Transport for LoggingTransport {
    async fn publish_simulation_update(&self, simulation_id: SimulationId, snapshot: &Snapshot) {
        if snapshot.recent_events.is_empty() {
            return;
        }
        info!(
            %simulation_id,
            status = ?snapshot.status,
            current_time = %snapshot.current_time_hhmm,
            count = snapshot.recent_events.len(),
            "simulation update"
        );
    }

    async fn publish_inventory_update(&self, simulation_id: SimulationId, inventory: &Inventory) {
        info!(%simulation_id, items = inventory.items().count(), "inventory update");
    }
}
