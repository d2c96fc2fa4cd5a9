//! `headless.run`: the non-interactive driver mirroring the teacher's
//! `backend::main` + `cli` split, but looping `advanceTo` in fixed steps
//! instead of reacting to real time, so a full business day can be
//! replayed in a single process invocation (§4.7).
use std::collections::HashMap;

use chrono::NaiveDate;
use model::{CoreError, CoreResult, MissedOrder, SimMode, SimStatus, SimulationId, Stats};
use serde::{Deserialize, Serialize};
use suggestion::Algorithm;

use crate::core::ProductionCore;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeadlessReport {
    pub date: NaiveDate,
    pub simulation_id: SimulationId,
    pub ticks: u32,
    pub batches_auto_added: u32,
    pub final_stats: Stats,
    pub missed_orders: Vec<MissedOrder>,
    pub final_inventory: HashMap<String, usize>,
}

/// Generates the day's schedule, starts a simulation, and advances it in
/// `interval_minutes` steps until it completes, optionally auto-adding
/// suggestion-engine proposals that clear `min_confidence` (up to
/// `max_per_interval` per step).
#[allow(clippy::too_many_arguments)]
pub async fn run(
    core: &ProductionCore,
    date: NaiveDate,
    mode: SimMode,
    algorithm: Algorithm,
    interval_minutes: u32,
    auto_add: bool,
    max_per_interval: u32,
    min_confidence: u32,
) -> CoreResult<HeadlessReport> {
    if interval_minutes == 0 {
        return Err(CoreError::InvalidInput("interval_minutes must be positive".into()));
    }

    core.schedule_generate(date).await?;
    let simulation_id = core.simulation_start(date, mode, 1.0).await?;
    let handle = core
        .registry
        .get(simulation_id)
        .await
        .expect("just started this simulation");

    let business_hours = &core.config.business_hours;
    let mut minute = business_hours.start_minutes as f64;
    let mut ticks = 0u32;
    let mut batches_auto_added = 0u32;

    loop {
        minute += interval_minutes as f64;
        handle.advance_to_minute(minute, business_hours).await;
        ticks += 1;

        if auto_add {
            let proposals = handle
                .suggested_batches(algorithm, business_hours, core.config.grid_minutes, &core.config.suggestion)
                .await;

            let mut added_this_interval = 0u32;
            for proposal in proposals {
                if added_this_interval >= max_per_interval {
                    break;
                }
                if proposal.reason.confidence_percent < min_confidence {
                    continue;
                }
                let Some(spec) = core
                    .spec_store
                    .get(&proposal.item_guid)
                    .await
                    .map_err(|e| CoreError::StoreIoError(e.to_string()))?
                else {
                    continue;
                };

                let placed = handle
                    .add_batch(
                        &spec,
                        proposal.quantity,
                        proposal.start_time,
                        business_hours,
                        &core.config.oven,
                        core.config.grid_minutes,
                    )
                    .await
                    .is_ok();
                if placed {
                    added_this_interval += 1;
                    batches_auto_added += 1;
                }
            }
        }

        if handle.status().await == SimStatus::Completed {
            break;
        }
    }

    let snapshot = handle.snapshot().await;
    Ok(HeadlessReport {
        date,
        simulation_id,
        ticks,
        batches_auto_added,
        final_stats: snapshot.stats,
        missed_orders: snapshot.missed_orders,
        final_inventory: snapshot.inventory_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use model::{BakeSpec, ForecastInterval, Oven};
    use store::{
        InMemoryOrderStore, InMemoryScheduleStore, LoggingTransport, ManualClock, StaticForecastSvc,
        StaticSpecStore,
    };

    fn croissant() -> BakeSpec {
        BakeSpec {
            item_guid: "croissant".into(),
            display_name: "Croissant".into(),
            capacity_per_rack: 24,
            bake_time_minutes: 20,
            cool_time_minutes: 10,
            oven: Oven::Any,
            fresh_window_minutes: 120,
            restock_threshold: 10,
            par_min: 10,
            par_max: Some(200),
            active: true,
        }
    }

    async fn core_with_one_spec() -> ProductionCore {
        let mut config = model::AppConfig::from_env();
        config.business_hours = model::BusinessHours { start_minutes: 360, end_minutes: 420 };

        let forecast = Arc::new(StaticForecastSvc::new());
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        forecast.seed_daily(date, HashMap::from([("croissant".to_string(), 48)])).await;
        forecast
            .seed_intraday(date, HashMap::from([("croissant".to_string(), vec![ForecastInterval { time_interval: 400, forecast: 48 }])]))
            .await;

        ProductionCore::new(
            config,
            Arc::new(StaticSpecStore::new(vec![croissant()])),
            Arc::new(InMemoryOrderStore::new()),
            forecast,
            Arc::new(InMemoryScheduleStore::new()),
            Arc::new(LoggingTransport),
            Arc::new(ManualClock::new(0)),
        )
    }

    #[tokio::test]
    async fn runs_to_completion_and_reports_final_state() {
        let core = core_with_one_spec().await;
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();

        let report = run(&core, date, SimMode::Manual, Algorithm::Predictive, 20, false, 0, 100)
            .await
            .unwrap();

        assert_eq!(report.date, date);
        assert!(report.ticks > 0);
    }

    #[tokio::test]
    async fn rejects_a_zero_interval() {
        let core = core_with_one_spec().await;
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let result = run(&core, date, SimMode::Manual, Algorithm::Predictive, 0, false, 0, 100).await;
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }
}
