//! Clock math and the edge-triggered batch/order advancement that runs on
//! every driver tick (§4.3).
use model::{
    BatchStatus, BusinessHours, CoreError, CoreResult, EventKind, MissedOrder, SimStatus,
    SimulationState, order_key,
};
use tracing::{instrument, warn};

/// Converts real elapsed time (minus accumulated pause) into simulated
/// minutes, quantised to 0.1-minute precision and clamped at close.
pub fn compute_current_time(state: &SimulationState, now_ms: u64, business_hours: &BusinessHours) -> f64 {
    if !matches!(state.status, SimStatus::Running) {
        return state.current_time;
    }

    let elapsed_ms = now_ms
        .saturating_sub(state.started_at_real_ms)
        .saturating_sub(state.paused_duration_ms);
    let elapsed_minutes = elapsed_ms as f64 / 60_000.0;
    let simulated = business_hours.start_minutes as f64 + elapsed_minutes * state.speed_multiplier;
    model::quantize_tenth(simulated.min(business_hours.end_minutes as f64))
}

/// Advances the simulation to `target_time`, running every batch transition
/// and preset-order consumption that falls in `(previousTime, currentTime]`.
/// No-op when the simulation isn't `running`.
#[instrument(skip(state), fields(simulation_id = %state.id))]
pub fn advance_to(state: &mut SimulationState, target_time: f64, business_hours: &BusinessHours) {
    if !matches!(state.status, SimStatus::Running) {
        return;
    }

    let previous_time = state.current_time;
    let end = business_hours.end_minutes as f64;
    let current_time = target_time.max(previous_time).min(end);
    state.current_time = current_time;

    process_batch_transitions(state, previous_time, current_time);
    consume_preset_orders(state, previous_time, current_time);

    if current_time >= end {
        state.status = SimStatus::Completed;
        state.current_time = end;
        state.push_event(EventKind::SimulationCompleted);
    }
}

fn process_batch_transitions(state: &mut SimulationState, previous_time: f64, current_time: f64) {
    let ids: Vec<_> = state.active_batches().map(|b| b.batch_id).collect();

    for id in ids {
        loop {
            let Some(batch) = state.batch(id) else { break };
            match batch.status {
                BatchStatus::Scheduled => {
                    let Some(start) = batch.start_time else { break };
                    if previous_time <= start as f64 && (start as f64) <= current_time {
                        state.batch_mut(id).expect("batch just read").status = BatchStatus::Baking;
                        state.stats.batches_started += 1;
                        state.push_event(EventKind::BatchStarted { batch_id: id });
                    } else {
                        break;
                    }
                }
                BatchStatus::Baking => {
                    let Some(end) = batch.end_time() else { break };
                    if previous_time < end as f64 && (end as f64) <= current_time {
                        state.batch_mut(id).expect("batch just read").status = BatchStatus::Pulling;
                        state.stats.batches_pulled += 1;
                        state.push_event(EventKind::BatchPulled { batch_id: id });
                    } else {
                        break;
                    }
                }
                BatchStatus::Pulling => {
                    let Some(available) = batch.available_time() else { break };
                    if previous_time < available as f64 && (available as f64) <= current_time {
                        let item_guid = batch.item_guid.clone();
                        let quantity = batch.quantity;
                        state.batch_mut(id).expect("batch just read").status = BatchStatus::Available;

                        let available_at = current_time as u32;
                        state.inventory.list_mut(&item_guid).push_batch(available_at, id, quantity);
                        let total = state.inventory.total();
                        if total > state.stats.peak_inventory {
                            state.stats.peak_inventory = total;
                        }
                        state.stats.batches_available += 1;
                        state.complete_batch(id);
                        state.push_event(EventKind::BatchAvailable { batch_id: id, quantity });
                    }
                    break;
                }
                BatchStatus::Available => break,
            }
        }
    }
}

fn consume_preset_orders(state: &mut SimulationState, previous_time: f64, current_time: f64) {
    let due: Vec<_> = state
        .preset_orders
        .iter()
        .filter(|o| !state.processed_order_keys.contains(&order_key(o.order_id, &o.item_guid)))
        .filter(|o| (o.order_time_minutes as f64) > previous_time && (o.order_time_minutes as f64) <= current_time)
        .cloned()
        .collect();

    for order in due {
        let key = order_key(order.order_id, &order.item_guid);
        let available = state.inventory.count(&order.item_guid);

        if available >= order.quantity as usize {
            state.inventory.list_mut(&order.item_guid).try_remove_fifo(order.quantity as usize);
            state.stats.items_processed += order.quantity;

            let aggregate = state.processed_orders_by_item.entry(order.item_guid.clone()).or_default();
            aggregate.total_quantity += order.quantity;
            aggregate.order_count += 1;

            state.push_event(EventKind::OrderProcessed {
                order_id: order.order_id,
                item_guid: order.item_guid.clone(),
                quantity: order.quantity,
            });
        } else {
            state.stats.items_missed += order.quantity;
            state.missed_orders.push(MissedOrder {
                order_id: order.order_id,
                item_guid: order.item_guid.clone(),
                requested_quantity: order.quantity,
                available_inventory: available,
                at_time: current_time as u32,
            });

            state.push_event(EventKind::OrderMissed {
                order_id: order.order_id,
                item_guid: order.item_guid.clone(),
                requested: order.quantity,
                available,
            });

            warn!(order_id = %order.order_id, item = %order.item_guid, requested = order.quantity, available, "order missed");
        }

        state.processed_order_keys.insert(key);
    }
}

/// Manual-mode purchase: best-effort FIFO deduction, credited to the same
/// aggregate preset processing uses (§4.3).
pub fn purchase(state: &mut SimulationState, item_guid: &str, quantity: u32) -> CoreResult<()> {
    if !matches!(state.status, SimStatus::Running | SimStatus::Paused) {
        return Err(CoreError::InvalidState("simulation is not running or paused".into()));
    }

    let available = state.inventory.count(item_guid);
    if available < quantity as usize {
        return Err(CoreError::CannotFulfil(format!(
            "only {available} of {item_guid} available, requested {quantity}"
        )));
    }

    state.inventory.list_mut(item_guid).try_remove_fifo(quantity as usize);

    let aggregate = state.processed_orders_by_item.entry(item_guid.to_string()).or_default();
    aggregate.total_quantity += quantity;
    aggregate.order_count += 1;

    state.push_event(EventKind::Purchase {
        item_guid: item_guid.to_string(),
        quantity,
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{BakeSpec, Batch, Oven, SimMode, SimulationId};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn hours() -> BusinessHours {
        BusinessHours { start_minutes: 360, end_minutes: 1020 }
    }

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
            par_max: Some(60),
            active: true,
        }
    }

    fn state_with_one_batch() -> (SimulationState, model::BatchId) {
        let mut state = SimulationState::new(
            SimulationId::new_v4(),
            SimMode::Manual,
            "sched-1".into(),
            0,
            1.0,
            360,
            vec![croissant()],
            vec![],
            HashMap::new(),
            HashMap::new(),
        );
        let mut batch = Batch::new_unplaced("croissant", 24, 20, 10);
        batch.place(1, 360, 6);
        let id = batch.batch_id;
        state.insert_batch(batch);
        (state, id)
    }

    #[test]
    fn full_lifecycle_chains_within_one_wide_tick() {
        let (mut state, id) = state_with_one_batch();
        advance_to(&mut state, 400.0, &hours());

        assert_eq!(state.batch(id).unwrap().status, BatchStatus::Available);
        assert_eq!(state.stats.batches_started, 1);
        assert_eq!(state.stats.batches_pulled, 1);
        assert_eq!(state.stats.batches_available, 1);
        assert_eq!(state.inventory.count("croissant"), 24);
        assert!(!state.is_active(id));
    }

    #[test]
    fn transitions_fire_exactly_once_across_successive_ticks() {
        let (mut state, id) = state_with_one_batch();
        advance_to(&mut state, 360.0, &hours());
        assert_eq!(state.batch(id).unwrap().status, BatchStatus::Baking);
        assert_eq!(state.stats.batches_started, 1);

        advance_to(&mut state, 360.0, &hours());
        assert_eq!(state.stats.batches_started, 1, "re-advancing to the same time must not re-fire");

        advance_to(&mut state, 380.0, &hours());
        assert_eq!(state.batch(id).unwrap().status, BatchStatus::Pulling);

        advance_to(&mut state, 390.0, &hours());
        assert_eq!(state.batch(id).unwrap().status, BatchStatus::Available);
        assert_eq!(state.stats.batches_available, 1);
    }

    #[test]
    fn reaching_close_completes_the_simulation() {
        let (mut state, _id) = state_with_one_batch();
        advance_to(&mut state, 2000.0, &hours());
        assert_eq!(state.status, SimStatus::Completed);
        assert_eq!(state.current_time, 1020.0);
    }

    #[test]
    fn preset_order_miss_does_not_partially_consume_inventory() {
        let mut state = SimulationState::new(
            SimulationId::new_v4(),
            SimMode::Preset,
            "sched-1".into(),
            0,
            1.0,
            360,
            vec![croissant()],
            vec![model::PresetOrder {
                order_id: Uuid::new_v4(),
                item_guid: "croissant".into(),
                quantity: 10,
                display_name: "Croissant".into(),
                order_time_minutes: 365,
            }],
            HashMap::new(),
            HashMap::new(),
        );
        state.inventory.list_mut("croissant").push_batch(360, model::BatchId::new_v4(), 4);

        advance_to(&mut state, 370.0, &hours());

        assert_eq!(state.inventory.count("croissant"), 4, "miss must not touch inventory");
        assert_eq!(state.stats.items_missed, 10);
        assert_eq!(state.missed_orders.len(), 1);
    }

    #[test]
    fn preset_order_is_settled_exactly_once_even_with_overlapping_ticks() {
        let mut state = SimulationState::new(
            SimulationId::new_v4(),
            SimMode::Preset,
            "sched-1".into(),
            0,
            1.0,
            360,
            vec![croissant()],
            vec![model::PresetOrder {
                order_id: Uuid::new_v4(),
                item_guid: "croissant".into(),
                quantity: 5,
                display_name: "Croissant".into(),
                order_time_minutes: 365,
            }],
            HashMap::new(),
            HashMap::new(),
        );
        state.inventory.list_mut("croissant").push_batch(360, model::BatchId::new_v4(), 20);

        advance_to(&mut state, 366.0, &hours());
        advance_to(&mut state, 400.0, &hours());

        assert_eq!(state.stats.items_processed, 5);
    }

    #[test]
    fn purchase_rejects_when_inventory_insufficient() {
        let (mut state, _id) = state_with_one_batch();
        let result = purchase(&mut state, "croissant", 1);
        assert!(matches!(result, Err(CoreError::CannotFulfil(_))));
    }

    #[test]
    fn purchase_deducts_fifo_and_credits_aggregate() {
        let (mut state, _id) = state_with_one_batch();
        state.inventory.list_mut("croissant").push_batch(360, model::BatchId::new_v4(), 10);

        purchase(&mut state, "croissant", 4).unwrap();

        assert_eq!(state.inventory.count("croissant"), 6);
        assert_eq!(state.processed_orders_by_item["croissant"].total_quantity, 4);
    }
}
