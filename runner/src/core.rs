//! `ProductionCore`: the transport-agnostic facade exposing every command
//! in the command surface (§6) as an async method. A real transport (HTTP,
//! gRPC, ...) would wrap each of these in its own encoding; the headless
//! runner and tests call them directly, mirroring how the teacher's
//! `SessionStore`/`Scheduler` are driven straight from `main` and from
//! integration tests alike.
use std::sync::Arc;

use chrono::NaiveDate;
use model::{
    AppConfig, BatchId, CateringItem, CateringOrderId, CoreError, CoreResult, Schedule, SimMode,
    SimulationId,
};
use simulation::{SimulationHandle, SimulationRegistry, Snapshot};
use store::{Clock, ForecastSvc, OrderStore, ScheduleStore, SpecStore, Transport};
use suggestion::{Algorithm, Proposal};

fn store_err(err: anyhow::Error) -> CoreError {
    CoreError::StoreIoError(err.to_string())
}

pub struct ProductionCore {
    pub config: AppConfig,
    pub spec_store: Arc<dyn SpecStore>,
    pub order_store: Arc<dyn OrderStore>,
    pub forecast_svc: Arc<dyn ForecastSvc>,
    pub schedule_store: Arc<dyn ScheduleStore>,
    pub transport: Arc<dyn Transport>,
    pub clock: Arc<dyn Clock>,
    pub registry: Arc<SimulationRegistry>,
}

impl ProductionCore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        spec_store: Arc<dyn SpecStore>,
        order_store: Arc<dyn OrderStore>,
        forecast_svc: Arc<dyn ForecastSvc>,
        schedule_store: Arc<dyn ScheduleStore>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            spec_store,
            order_store,
            forecast_svc,
            schedule_store,
            transport,
            clock,
            registry: Arc::new(SimulationRegistry::new()),
        }
    }

    /// `schedule.generate`.
    pub async fn schedule_generate(&self, date: NaiveDate) -> CoreResult<Schedule> {
        let specs = self.spec_store.load_active().await.map_err(store_err)?;
        let daily = self.forecast_svc.daily_forecast(date).await.map_err(store_err)?;
        let intraday = self.forecast_svc.intraday_forecast(date).await.map_err(store_err)?;

        scheduling::plan_and_persist(
            self.schedule_store.as_ref(),
            date,
            &daily,
            &intraday,
            &specs,
            &self.config.business_hours,
            &self.config.oven,
            self.config.grid_minutes,
        )
        .await
        .map_err(store_err)
    }

    /// `schedule.getByDate`.
    pub async fn schedule_get_by_date(&self, date: NaiveDate) -> CoreResult<Option<Schedule>> {
        self.schedule_store.get_by_date(date).await.map_err(store_err)
    }

    /// `simulation.start`.
    pub async fn simulation_start(
        &self,
        date: NaiveDate,
        mode: SimMode,
        speed_multiplier: f64,
    ) -> CoreResult<SimulationId> {
        let schedule = self
            .schedule_store
            .get_by_date(date)
            .await
            .map_err(store_err)?
            .ok_or_else(|| CoreError::NotFound(format!("no schedule planned for {date}")))?;

        let specs = self.spec_store.load_active().await.map_err(store_err)?;
        let preset_orders = if mode == SimMode::Preset {
            self.order_store.load_preset_orders(date).await.map_err(store_err)?
        } else {
            Vec::new()
        };

        let handle = Arc::new(SimulationHandle::start_with_batches(
            self.clock.as_ref(),
            self.schedule_store.clone(),
            schedule.id,
            mode,
            speed_multiplier,
            &self.config.business_hours,
            specs,
            schedule.batches,
            preset_orders,
            schedule.daily_forecast,
            schedule.time_interval_forecast,
        ));

        let id = handle.id;
        self.registry.insert(handle).await;
        Ok(id)
    }

    async fn handle(&self, id: SimulationId) -> CoreResult<Arc<SimulationHandle>> {
        self.registry.get(id).await.ok_or_else(|| CoreError::NotFound(format!("simulation {id}")))
    }

    /// `simulation.status`. Also publishes the snapshot via [`Transport`],
    /// matching the broadcast the driver performs on every tick (§6).
    pub async fn simulation_status(&self, id: SimulationId) -> CoreResult<Snapshot> {
        let handle = self.handle(id).await?;
        let snapshot = handle.snapshot().await;
        self.transport.publish_simulation_update(id, &snapshot).await;
        Ok(snapshot)
    }

    pub async fn simulation_pause(&self, id: SimulationId) -> CoreResult<Snapshot> {
        let handle = self.handle(id).await?;
        handle.pause(self.clock.as_ref()).await?;
        Ok(handle.snapshot().await)
    }

    pub async fn simulation_resume(&self, id: SimulationId) -> CoreResult<Snapshot> {
        let handle = self.handle(id).await?;
        handle.resume(self.clock.as_ref()).await?;
        Ok(handle.snapshot().await)
    }

    pub async fn simulation_stop(&self, id: SimulationId) -> CoreResult<Snapshot> {
        let handle = self.handle(id).await?;
        handle.stop().await?;
        Ok(handle.snapshot().await)
    }

    pub async fn simulation_batch_add(
        &self,
        id: SimulationId,
        item_guid: &str,
        quantity: u32,
        desired_start: u32,
    ) -> CoreResult<BatchId> {
        let handle = self.handle(id).await?;
        let spec = self
            .spec_store
            .get(item_guid)
            .await
            .map_err(store_err)?
            .ok_or_else(|| CoreError::InvalidBakeSpec {
                item_guid: item_guid.to_string(),
                reason: "no bake spec on file".into(),
            })?;
        handle
            .add_batch(&spec, quantity, desired_start, &self.config.business_hours, &self.config.oven, self.config.grid_minutes)
            .await
    }

    pub async fn simulation_batch_move(
        &self,
        id: SimulationId,
        batch_id: BatchId,
        new_start: u32,
        new_rack: u32,
    ) -> CoreResult<()> {
        let handle = self.handle(id).await?;
        handle
            .move_batch(batch_id, new_start, new_rack, &self.config.business_hours, &self.config.oven, self.config.grid_minutes)
            .await
    }

    pub async fn simulation_batch_delete(&self, id: SimulationId, batch_id: BatchId) -> CoreResult<()> {
        let handle = self.handle(id).await?;
        handle.delete_batch(batch_id).await
    }

    /// `simulation.suggestedBatches`.
    pub async fn simulation_suggested_batches(&self, id: SimulationId, algorithm: Algorithm) -> CoreResult<Vec<Proposal>> {
        let handle = self.handle(id).await?;
        Ok(handle
            .suggested_batches(algorithm, &self.config.business_hours, self.config.grid_minutes, &self.config.suggestion)
            .await)
    }

    /// `simulation.pos.purchase`.
    pub async fn simulation_purchase(&self, id: SimulationId, item_guid: &str, quantity: u32) -> CoreResult<Snapshot> {
        let handle = self.handle(id).await?;
        handle.purchase(item_guid, quantity).await?;
        let inventory = handle.inventory().await;
        self.transport.publish_inventory_update(id, &inventory).await;
        Ok(handle.snapshot().await)
    }

    /// `simulation.catering.create`.
    pub async fn simulation_catering_create(
        &self,
        id: SimulationId,
        items: Vec<CateringItem>,
        required_available_time: u32,
        auto_approve: bool,
    ) -> CoreResult<CateringOrderId> {
        let handle = self.handle(id).await?;
        handle
            .catering_create(
                items,
                required_available_time,
                auto_approve,
                &self.config.business_hours,
                &self.config.oven,
                self.config.grid_minutes,
            )
            .await
    }

    /// `simulation.catering.approve`.
    pub async fn simulation_catering_approve(&self, id: SimulationId, order_id: CateringOrderId) -> CoreResult<()> {
        let handle = self.handle(id).await?;
        handle.catering_approve(order_id).await
    }

    /// `simulation.catering.reject`.
    pub async fn simulation_catering_reject(&self, id: SimulationId, order_id: CateringOrderId) -> CoreResult<()> {
        let handle = self.handle(id).await?;
        handle.catering_reject(order_id, &self.config.oven).await
    }

    /// `simulation.catering.autoApprove`.
    pub async fn simulation_catering_auto_approve(&self, id: SimulationId, enabled: bool) -> CoreResult<()> {
        let handle = self.handle(id).await?;
        handle.auto_approve_catering(enabled).await;
        Ok(())
    }
}
