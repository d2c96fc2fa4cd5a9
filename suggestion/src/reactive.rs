//! Reactive suggestion engine (§4.4): extrapolates a trailing consumption
//! rate rather than relying on a forecast curve.
use model::{BusinessHours, EventKind, SimulationState, SuggestionConfig};

use crate::proposal::{Algorithm, Proposal, ProposalReason};

fn future_supply_within(state: &SimulationState, item_guid: &str, horizon_minutes: f64) -> u32 {
    let current_time = state.current_time;
    state
        .all_batches()
        .filter(|b| b.item_guid == item_guid)
        .filter_map(|b| b.available_time().map(|t| (t, b.quantity)))
        .filter(|(available_time, _)| {
            let t = *available_time as f64;
            t > current_time && t <= current_time + horizon_minutes
        })
        .map(|(_, quantity)| quantity)
        .sum()
}

pub fn reactive_proposals(
    state: &SimulationState,
    business_hours: &BusinessHours,
    grid: u32,
    config: &SuggestionConfig,
) -> Vec<Proposal> {
    let mut proposals = Vec::new();
    let current_time = state.current_time;

    let elapsed_since_start = (current_time - business_hours.start_minutes as f64).max(0.0);
    let window_minutes = elapsed_since_start
        .min(config.reactive_window_minutes as f64)
        .max(1.0);
    let window_start = current_time - window_minutes;

    for spec in state.specs.iter().filter(|s| s.active && s.is_schedulable()) {
        let item_guid = &spec.item_guid;

        let observed_units: u32 = state
            .events
            .iter()
            .filter(|e| (e.timestamp as f64) > window_start && (e.timestamp as f64) <= current_time)
            .filter_map(|e| match &e.kind {
                EventKind::OrderProcessed { item_guid: g, quantity, .. } if g == item_guid => Some(*quantity),
                EventKind::Purchase { item_guid: g, quantity } if g == item_guid => Some(*quantity),
                _ => None,
            })
            .sum();

        if (observed_units as f64) < config.reactive_min_observed_units {
            continue;
        }

        let consumption_rate = observed_units as f64 / window_minutes;
        if consumption_rate < config.reactive_min_consumption_rate {
            continue;
        }

        let current_inventory = state.inventory.count(item_guid) as f64;

        let minutes_until_shortage = (current_inventory
            + future_supply_within(state, item_guid, config.reactive_depletion_threshold_minutes))
            / consumption_rate;
        if minutes_until_shortage > config.reactive_depletion_threshold_minutes {
            continue;
        }

        let projected_inventory =
            current_inventory + future_supply_within(state, item_guid, config.reactive_target_buffer_minutes) as f64;
        let target_inventory = consumption_rate * config.reactive_target_buffer_minutes;
        let shortfall = (target_inventory - projected_inventory).max(0.0);
        if shortfall < spec.capacity_per_rack as f64 * 0.5 {
            continue;
        }

        let earliest_start = (current_time + 10.0).max(business_hours.start_minutes as f64);
        let start_time = model::round_to_grid_ceil(earliest_start.max(0.0) as u32, grid);
        let available_time = start_time + spec.bake_time_minutes + spec.cool_time_minutes;
        if available_time > business_hours.end_minutes {
            continue;
        }

        let confidence_percent =
            ((observed_units as f64 / config.reactive_confidence_target_units).min(1.0) * 100.0).floor() as u32;

        let count = (shortfall / spec.capacity_per_rack as f64).ceil() as u32;
        for _ in 0..count {
            proposals.push(Proposal {
                item_guid: item_guid.clone(),
                quantity: spec.capacity_per_rack,
                start_time,
                reason: ProposalReason {
                    algorithm: Algorithm::Reactive,
                    confidence_percent,
                },
            });
        }
    }

    proposals
}
