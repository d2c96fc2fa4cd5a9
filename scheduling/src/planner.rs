//! Turns a daily forecast and a set of bake specs into a placed schedule
//! (§4.2). Pure with respect to time: callers own the wall clock and pass in
//! whatever `date` they like, so this module is trivially testable.
use std::collections::HashMap;

use chrono::NaiveDate;
use model::{BakeSpec, Batch, BusinessHours, ForecastInterval, OvenConfig, Schedule, UnplacedItem};
use tracing::{debug, instrument, warn};

use crate::allocator::{SlotFailure, find_earliest_slot, find_slot_at};

struct RequiredBatch {
    quantity: u32,
    desired_start: u32,
}

/// §4.2 step 1: batch count an item needs for the day, or `None` if the
/// spec is missing the fields required to plan it.
fn batch_count(spec: &BakeSpec, daily_forecast: u32) -> Option<u32> {
    if !spec.is_schedulable() {
        return None;
    }
    let target = daily_forecast + spec.restock_threshold.max(spec.par_min);
    Some(target.div_ceil(spec.capacity_per_rack).max(1))
}

/// §4.2 step 2: walks the intraday forecast maintaining cumulative
/// demand/supply, emitting a required batch each time supply would fall
/// below `demand + par_min`, then nudges batches that would overshoot
/// `par_max` later to avoid waste.
fn par_aware_required_batches(
    spec: &BakeSpec,
    intraday: &[ForecastInterval],
    total_batch_count: u32,
    business_hours: &BusinessHours,
    grid: u32,
) -> Vec<RequiredBatch> {
    let mut sorted = intraday.to_vec();
    sorted.sort_by_key(|f| f.time_interval);

    let mut required = Vec::new();
    let mut cumulative_demand: u64 = 0;
    let mut cumulative_supply: u64 = 0;

    for interval in &sorted {
        cumulative_demand += interval.forecast as u64;

        while cumulative_supply < cumulative_demand + spec.par_min as u64
            && (required.len() as u32) < total_batch_count
        {
            let earliest_start = interval
                .time_interval
                .saturating_sub(spec.bake_time_minutes + spec.cool_time_minutes)
                .max(business_hours.start_minutes);
            let mut desired_start = model::round_to_grid_ceil(earliest_start, grid);

            if let Some(par_max) = spec.par_max {
                let would_be_supply = cumulative_supply + spec.capacity_per_rack as u64;
                if would_be_supply > par_max as u64 {
                    let delay = (par_max.saturating_sub(spec.par_min)) / 2;
                    let delayed = desired_start + delay;
                    let available_time =
                        delayed + spec.bake_time_minutes + spec.cool_time_minutes;
                    if available_time <= interval.time_interval {
                        desired_start = delayed;
                    }
                }
            }

            required.push(RequiredBatch {
                quantity: spec.capacity_per_rack,
                desired_start,
            });
            cumulative_supply += spec.capacity_per_rack as u64;
        }
    }

    required
}

/// Builds a schedule for `date` from a daily forecast, an optional intraday
/// forecast per item, and the active bake specs. Does not persist; callers
/// that need the "persisted before return" guarantee (§4.2) should pass the
/// result to a `ScheduleStore` themselves.
#[instrument(skip(specs, daily_forecast, time_interval_forecast), fields(item_count = specs.len()))]
pub fn plan_schedule(
    date: NaiveDate,
    daily_forecast: &HashMap<String, u32>,
    time_interval_forecast: &HashMap<String, Vec<ForecastInterval>>,
    specs: &[BakeSpec],
    business_hours: &BusinessHours,
    oven: &OvenConfig,
    grid: u32,
) -> Schedule {
    let mut placed: Vec<Batch> = Vec::new();
    let mut unplaced: Vec<UnplacedItem> = Vec::new();
    let mut fallback_queue: Vec<Batch> = Vec::new();

    for spec in specs.iter().filter(|s| s.active) {
        let forecast_qty = daily_forecast.get(&spec.item_guid).copied().unwrap_or(0);

        let Some(count) = batch_count(spec, forecast_qty) else {
            warn!(item = %spec.item_guid, "spec missing fields required to plan, rejecting");
            unplaced.push(UnplacedItem {
                item_guid: spec.item_guid.clone(),
                quantity: forecast_qty,
                reason: "invalid bake spec: missing capacity, bake time, or cool time".into(),
            });
            continue;
        };

        let intraday = time_interval_forecast.get(&spec.item_guid);

        let target_total = count * spec.capacity_per_rack;
        let remainder = target_total.saturating_sub((count.saturating_sub(1)) * spec.capacity_per_rack);

        match intraday {
            Some(intervals) if !intervals.is_empty() => {
                let required =
                    par_aware_required_batches(spec, intervals, count, business_hours, grid);

                for (idx, req) in required.iter().enumerate() {
                    let refs: Vec<&Batch> = placed.iter().collect();
                    match find_slot_at(spec, req.desired_start, &refs, business_hours, oven, grid) {
                        Ok(placement) => {
                            let quantity = if idx as u32 == count - 1 { remainder } else { req.quantity };
                            let mut batch =
                                Batch::new_unplaced(&spec.item_guid, quantity, spec.bake_time_minutes, spec.cool_time_minutes);
                            batch.place(placement.rack, placement.start_time, oven.racks_per_oven);
                            placed.push(batch);
                        }
                        Err(_) => {
                            unplaced.push(UnplacedItem {
                                item_guid: spec.item_guid.clone(),
                                quantity: req.quantity,
                                reason: "no rack slot available near demand interval".into(),
                            });
                        }
                    }
                }

                let excess = count.saturating_sub(required.len() as u32);
                for i in 0..excess {
                    let quantity = if required.len() as u32 + i == count - 1 {
                        remainder
                    } else {
                        spec.capacity_per_rack
                    };
                    push_sequential(
                        &mut placed,
                        &mut unplaced,
                        spec,
                        quantity,
                        business_hours,
                        oven,
                        grid,
                    );
                }
            }
            _ => {
                for i in 0..count {
                    let quantity = if i == count - 1 { remainder } else { spec.capacity_per_rack };
                    let batch = Batch::new_unplaced(&spec.item_guid, quantity, spec.bake_time_minutes, spec.cool_time_minutes);
                    fallback_queue.push(batch);
                }
            }
        }
    }

    // §4.2 step 3: sequential fallback for items without an intraday curve —
    // sort ascending bake_time, then descending quantity, place in that order.
    fallback_queue.sort_by(|a, b| a.bake_time.cmp(&b.bake_time).then(b.quantity.cmp(&a.quantity)));

    for batch in fallback_queue {
        let spec = specs
            .iter()
            .find(|s| s.item_guid == batch.item_guid)
            .expect("fallback batch built from a known spec");
        push_sequential(
            &mut placed,
            &mut unplaced,
            spec,
            batch.quantity,
            business_hours,
            oven,
            grid,
        );
    }

    debug!(placed = placed.len(), unplaced = unplaced.len(), "schedule planned");

    Schedule {
        id: Schedule::id_for_date(date),
        date,
        batches: placed,
        unplaced,
        daily_forecast: daily_forecast.clone(),
        time_interval_forecast: time_interval_forecast.clone(),
    }
}

fn push_sequential(
    placed: &mut Vec<Batch>,
    unplaced: &mut Vec<UnplacedItem>,
    spec: &BakeSpec,
    quantity: u32,
    business_hours: &BusinessHours,
    oven: &OvenConfig,
    grid: u32,
) {
    let refs: Vec<&Batch> = placed.iter().collect();
    match find_earliest_slot(spec, business_hours.start_minutes, &refs, business_hours, oven, grid) {
        Ok(placement) => {
            let mut batch = Batch::new_unplaced(&spec.item_guid, quantity, spec.bake_time_minutes, spec.cool_time_minutes);
            batch.place(placement.rack, placement.start_time, oven.racks_per_oven);
            placed.push(batch);
        }
        Err(SlotFailure::NoSlotBeforeClose) | Err(SlotFailure::OvenMismatch) => {
            unplaced.push(UnplacedItem {
                item_guid: spec.item_guid.clone(),
                quantity,
                reason: "no rack slot available before close".into(),
            });
        }
    }
}
