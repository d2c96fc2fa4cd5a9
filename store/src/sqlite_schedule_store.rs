//! SqliteScheduleStore
//! -------------------
//! SQLite-backed implementation of `ScheduleStore`. Schedules are stored as
//! one row per date with their batch list, unplaced list and forecasts
//! serialized to JSON columns, following the teacher's `thresholds_json`
//! pattern for nested structures it didn't want a join for.
use async_trait::async_trait;
use chrono::NaiveDate;
use model::{Batch, BatchId, Schedule};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use crate::schedule_store::ScheduleStore;

pub struct SqliteScheduleStore {
    pool: SqlitePool,
}

impl SqliteScheduleStore {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects and ensures schema exists.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schedules (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                batches_json TEXT NOT NULL,
                unplaced_json TEXT NOT NULL,
                daily_forecast_json TEXT NOT NULL,
                time_interval_forecast_json TEXT NOT NULL
            );
        "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    async fn load_row(&self, id: &str) -> anyhow::Result<Option<Schedule>> {
        let row = sqlx::query("SELECT * FROM schedules WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let date_str: String = row.get("date");
        let date = NaiveDate::from_str(&date_str)?;
        let batches_json: String = row.get("batches_json");
        let unplaced_json: String = row.get("unplaced_json");
        let daily_forecast_json: String = row.get("daily_forecast_json");
        let time_interval_forecast_json: String = row.get("time_interval_forecast_json");

        Ok(Some(Schedule {
            id: id.to_string(),
            date,
            batches: serde_json::from_str(&batches_json)?,
            unplaced: serde_json::from_str(&unplaced_json)?,
            daily_forecast: serde_json::from_str(&daily_forecast_json)?,
            time_interval_forecast: serde_json::from_str(&time_interval_forecast_json)?,
        }))
    }

    async fn save_row(&self, schedule: &Schedule) -> anyhow::Result<()> {
        let batches_json = serde_json::to_string(&schedule.batches)?;
        let unplaced_json = serde_json::to_string(&schedule.unplaced)?;
        let daily_forecast_json = serde_json::to_string(&schedule.daily_forecast)?;
        let time_interval_forecast_json = serde_json::to_string(&schedule.time_interval_forecast)?;

        sqlx::query(
            r#"
            INSERT INTO schedules (
                id, date, batches_json, unplaced_json,
                daily_forecast_json, time_interval_forecast_json
            )
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                date = excluded.date,
                batches_json = excluded.batches_json,
                unplaced_json = excluded.unplaced_json,
                daily_forecast_json = excluded.daily_forecast_json,
                time_interval_forecast_json = excluded.time_interval_forecast_json;
        "#,
        )
        .bind(&schedule.id)
        .bind(schedule.date.format("%Y-%m-%d").to_string())
        .bind(batches_json)
        .bind(unplaced_json)
        .bind(daily_forecast_json)
        .bind(time_interval_forecast_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for SqliteScheduleStore {
    async fn upsert_schedule(&self, schedule: &Schedule) -> anyhow::Result<()> {
        self.save_row(schedule).await
    }

    async fn get_by_date(&self, date: NaiveDate) -> anyhow::Result<Option<Schedule>> {
        self.load_row(&Schedule::id_for_date(date)).await
    }

    async fn upsert_batch(&self, schedule_id: &str, batch: &Batch) -> anyhow::Result<()> {
        let Some(mut schedule) = self.load_row(schedule_id).await? else {
            anyhow::bail!("schedule {schedule_id} not found");
        };
        if let Some(existing) = schedule.batches.iter_mut().find(|b| b.batch_id == batch.batch_id) {
            *existing = batch.clone();
        } else {
            schedule.batches.push(batch.clone());
        }
        self.save_row(&schedule).await
    }

    async fn delete_batch(&self, schedule_id: &str, batch_id: BatchId) -> anyhow::Result<()> {
        let Some(mut schedule) = self.load_row(schedule_id).await? else {
            anyhow::bail!("schedule {schedule_id} not found");
        };
        schedule.batches.retain(|b| b.batch_id != batch_id);
        self.save_row(&schedule).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    async fn store() -> SqliteScheduleStore {
        SqliteScheduleStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn roundtrips_schedule_through_json_columns() {
        let store = store().await;
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let schedule = Schedule {
            id: Schedule::id_for_date(date),
            date,
            batches: vec![Batch::new_unplaced("croissant", 24, 20, 10)],
            unplaced: vec![],
            daily_forecast: Map::new(),
            time_interval_forecast: Map::new(),
        };

        store.upsert_schedule(&schedule).await.unwrap();
        let loaded = store.get_by_date(date).await.unwrap().unwrap();
        assert_eq!(loaded.batches.len(), 1);
        assert_eq!(loaded.batches[0].item_guid, "croissant");
    }

    #[tokio::test]
    async fn delete_batch_on_missing_schedule_errors() {
        let store = store().await;
        let result = store.delete_batch("missing", uuid::Uuid::new_v4()).await;
        assert!(result.is_err());
    }
}
