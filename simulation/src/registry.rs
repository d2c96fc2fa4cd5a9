//! The process-wide set of live simulations, mirroring the teacher's
//! `SessionManager`'s `Arc<Mutex<HashMap<...>>>` plus secondary-index split
//! (here: running vs stopped/completed) (§5).
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use model::{BusinessHours, SimStatus, SimulationId};
use store::Transport;
use tokio::sync::RwLock;
use tracing::info;

use crate::handle::SimulationHandle;

#[derive(Default)]
pub struct SimulationRegistry {
    simulations: RwLock<HashMap<SimulationId, Arc<SimulationHandle>>>,
}

impl SimulationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, handle: Arc<SimulationHandle>) {
        self.simulations.write().await.insert(handle.id, handle);
    }

    pub async fn get(&self, id: SimulationId) -> Option<Arc<SimulationHandle>> {
        self.simulations.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: SimulationId) -> Option<Arc<SimulationHandle>> {
        self.simulations.write().await.remove(&id)
    }

    pub async fn all(&self) -> Vec<Arc<SimulationHandle>> {
        self.simulations.read().await.values().cloned().collect()
    }

    /// Advances every registered simulation to "now" (§5: the global driver
    /// iterates the registry and serialises into each simulation's writer),
    /// then publishes a `simulation_update` snapshot for each one (§6: "on
    /// every driver tick... the engine publishes a simulation_update
    /// snapshot to subscribers of that simulation id").
    pub async fn advance_all_to_now(&self, clock: &dyn store::Clock, business_hours: &BusinessHours, transport: &dyn Transport) {
        for handle in self.all().await {
            handle.advance_to_now(clock, business_hours).await;
            let snapshot = handle.snapshot().await;
            transport.publish_simulation_update(handle.id, &snapshot).await;
        }
    }

    /// Evicts simulations whose status is `stopped`/`completed` and whose
    /// `started_at_real` is older than `ttl_secs` (§5: sweeper every 10 min,
    /// TTL 3600s by default).
    pub async fn sweep_expired(&self, ttl_secs: u64) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_millis() as u64;
        let ttl_ms = ttl_secs.saturating_mul(1000);

        let mut expired = Vec::new();
        for handle in self.all().await {
            let status = handle.status().await;
            if matches!(status, SimStatus::Stopped | SimStatus::Completed) {
                let started_at = handle.started_at_real_ms().await;
                if now_ms.saturating_sub(started_at) > ttl_ms {
                    expired.push(handle.id);
                }
            }
        }

        for id in expired {
            self.remove(id).await;
            info!(simulation_id = %id, "evicted expired simulation from registry");
        }
    }
}
