pub mod allocator;
pub mod planner;

pub use allocator::{Placement, SlotFailure, conflicts, find_earliest_slot, find_slot_at};
pub use planner::plan_schedule;

use std::collections::HashMap;

use chrono::NaiveDate;
use model::{BakeSpec, BusinessHours, ForecastInterval, OvenConfig, Schedule};
use store::ScheduleStore;

/// Plans a schedule and upserts it via `schedule_store` before returning,
/// satisfying the planner's "persisted before return" post-condition (§4.2).
pub async fn plan_and_persist(
    schedule_store: &dyn ScheduleStore,
    date: NaiveDate,
    daily_forecast: &HashMap<String, u32>,
    time_interval_forecast: &HashMap<String, Vec<ForecastInterval>>,
    specs: &[BakeSpec],
    business_hours: &BusinessHours,
    oven: &OvenConfig,
    grid: u32,
) -> anyhow::Result<Schedule> {
    let schedule = plan_schedule(
        date,
        daily_forecast,
        time_interval_forecast,
        specs,
        business_hours,
        oven,
        grid,
    );
    schedule_store.upsert_schedule(&schedule).await?;
    Ok(schedule)
}
