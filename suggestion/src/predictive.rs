//! Predictive suggestion engine (§4.4): projects remaining demand from the
//! intraday forecast curve and the consumption observed so far today.
use model::{BatchStatus, BusinessHours, SimulationState, SuggestionConfig};

use crate::proposal::{Algorithm, Proposal, ProposalReason};

pub fn predictive_proposals(
    state: &SimulationState,
    business_hours: &BusinessHours,
    grid: u32,
    config: &SuggestionConfig,
) -> Vec<Proposal> {
    let mut proposals = Vec::new();
    let current_time = state.current_time;

    for (item_guid, intervals) in state.time_interval_forecast.iter() {
        let Some(spec) = state.spec_for(item_guid) else { continue };
        if !spec.is_schedulable() {
            continue;
        }

        let expected: u32 = intervals
            .iter()
            .filter(|f| (f.time_interval as f64) <= current_time)
            .map(|f| f.forecast)
            .sum();
        let remaining_expected: u32 = intervals
            .iter()
            .filter(|f| (f.time_interval as f64) > current_time)
            .map(|f| f.forecast)
            .sum();

        let actual = state
            .processed_orders_by_item
            .get(item_guid)
            .map(|a| a.total_quantity)
            .unwrap_or(0);

        let consumption_ratio = if expected > 0 {
            actual as f64 / expected as f64
        } else if actual > 0 {
            1.5
        } else {
            1.0
        };

        let projected_remaining_demand = remaining_expected as f64 * consumption_ratio.max(1.0);

        let current_inventory = state.inventory.count(item_guid) as f64;
        let not_yet_available: u32 = state
            .all_batches()
            .filter(|b| &b.item_guid == item_guid && b.status != BatchStatus::Available)
            .map(|b| b.quantity)
            .sum();
        let future_inventory = current_inventory + not_yet_available as f64;

        let mut shortfall = (projected_remaining_demand - future_inventory).max(0.0);
        if let Some(par_max) = spec.par_max {
            if future_inventory < par_max as f64 {
                shortfall = shortfall.min(par_max as f64 - future_inventory);
            }
        }

        if shortfall <= 5.0 {
            continue;
        }

        let confidence_percent =
            ((expected as f64 / config.confidence_target_units).min(1.0) * 100.0).floor() as u32;

        if confidence_percent < 50 {
            continue;
        }

        let minutes_until_shortfall = if remaining_expected > 0 && consumption_ratio > 0.0 {
            let denom = (consumption_ratio * consumption_ratio).max(0.01);
            (remaining_expected as f64 / denom / 10.0).clamp(60.0, 300.0)
        } else {
            120.0
        };

        let target_available = current_time + minutes_until_shortfall;
        let earliest_start = (current_time + 20.0)
            .max(target_available - spec.bake_time_minutes as f64 - spec.cool_time_minutes as f64);
        let target_start = model::round_to_grid_ceil(earliest_start.max(0.0) as u32, grid);

        let available_time = target_start + spec.bake_time_minutes + spec.cool_time_minutes;
        if available_time as f64 > business_hours.end_minutes as f64 - 60.0 {
            continue;
        }

        let count = (shortfall / spec.capacity_per_rack as f64).ceil() as u32;
        for _ in 0..count {
            proposals.push(Proposal {
                item_guid: item_guid.clone(),
                quantity: spec.capacity_per_rack,
                start_time: target_start,
                reason: ProposalReason {
                    algorithm: Algorithm::Predictive,
                    confidence_percent,
                },
            });
        }
    }

    proposals
}
