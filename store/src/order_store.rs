use async_trait::async_trait;
use chrono::NaiveDate;
use model::PresetOrder;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Source of the historical orders replayed during preset-mode simulation
/// (§3). Preset orders are test/demo fixtures, never live traffic (§4.6).
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn load_preset_orders(&self, date: NaiveDate) -> anyhow::Result<Vec<PresetOrder>>;
}

/// In-memory fixture store, keyed by date.
#[derive(Default)]
pub struct InMemoryOrderStore {
    by_date: Mutex<HashMap<NaiveDate, Vec<PresetOrder>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, date: NaiveDate, orders: Vec<PresetOrder>) {
        self.by_date.lock().await.insert(date, orders);
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn load_preset_orders(&self, date: NaiveDate) -> anyhow::Result<Vec<PresetOrder>> {
        Ok(self.by_date.lock().await.get(&date).cloned().unwrap_or_default())
    }
}
