use async_trait::async_trait;
use chrono::NaiveDate;
use model::{Batch, BatchId, Schedule};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// The durable twin for batch mutations the operator performs during
/// simulation (§3). Writes are best-effort and never block or abort the
/// simulation (§7) — callers treat every method here as fallible but
/// non-fatal.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn upsert_schedule(&self, schedule: &Schedule) -> anyhow::Result<()>;
    async fn get_by_date(&self, date: NaiveDate) -> anyhow::Result<Option<Schedule>>;
    async fn upsert_batch(&self, schedule_id: &str, batch: &Batch) -> anyhow::Result<()>;
    async fn delete_batch(&self, schedule_id: &str, batch_id: BatchId) -> anyhow::Result<()>;
}

/// `HashMap`-backed store for tests and the default runner configuration,
/// mirroring the teacher's `SessionManager`'s in-memory map guarded by a
/// single `Mutex` (`session::manager::SessionManager`).
#[derive(Default)]
pub struct InMemoryScheduleStore {
    by_id: Mutex<HashMap<String, Schedule>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn upsert_schedule(&self, schedule: &Schedule) -> anyhow::Result<()> {
        self.by_id
            .lock()
            .await
            .insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn get_by_date(&self, date: NaiveDate) -> anyhow::Result<Option<Schedule>> {
        let id = Schedule::id_for_date(date);
        Ok(self.by_id.lock().await.get(&id).cloned())
    }

    async fn upsert_batch(&self, schedule_id: &str, batch: &Batch) -> anyhow::Result<()> {
        let mut guard = self.by_id.lock().await;
        let Some(schedule) = guard.get_mut(schedule_id) else {
            anyhow::bail!("schedule {schedule_id} not found");
        };
        if let Some(existing) = schedule.batches.iter_mut().find(|b| b.batch_id == batch.batch_id) {
            *existing = batch.clone();
        } else {
            schedule.batches.push(batch.clone());
        }
        Ok(())
    }

    async fn delete_batch(&self, schedule_id: &str, batch_id: BatchId) -> anyhow::Result<()> {
        let mut guard = self.by_id.lock().await;
        let Some(schedule) = guard.get_mut(schedule_id) else {
            anyhow::bail!("schedule {schedule_id} not found");
        };
        schedule.batches.retain(|b| b.batch_id != batch_id);
        Ok(())
    }
}
