//! Operator-driven batch mutations (§4.3: `moveBatch`/`addBatch`/`deleteBatch`).
//! Pure with respect to the store — durability mirroring is the caller's job
//! (see [`crate::handle`]).
use model::{BakeSpec, BatchId, BatchStatus, BusinessHours, CoreError, CoreResult, EventKind, OvenConfig, SimulationState};
use scheduling::conflicts;
use tracing::instrument;

#[instrument(skip(state), fields(simulation_id = %state.id, %batch_id))]
pub fn move_batch(
    state: &mut SimulationState,
    batch_id: BatchId,
    new_start: u32,
    new_rack: u32,
    business_hours: &BusinessHours,
    oven: &OvenConfig,
    grid: u32,
) -> CoreResult<()> {
    let batch = state
        .batch(batch_id)
        .ok_or_else(|| CoreError::NotFound(format!("batch {batch_id}")))?
        .clone();

    if batch.status != BatchStatus::Scheduled {
        return Err(CoreError::InvalidState(
            "only a scheduled batch may be moved".into(),
        ));
    }

    if new_rack < 1 || new_rack > oven.total_racks() {
        return Err(CoreError::InvalidInput(format!(
            "rack {new_rack} out of range 1..={}",
            oven.total_racks()
        )));
    }

    let spec = state
        .spec_for(&batch.item_guid)
        .ok_or_else(|| CoreError::NotFound(format!("spec for {}", batch.item_guid)))?
        .clone();

    let new_oven = oven.oven_for_rack(new_rack);
    if !spec.oven.matches(new_oven) {
        return Err(CoreError::OvenMismatch(format!(
            "rack {new_rack} is in oven {new_oven}, spec requires {:?}",
            spec.oven
        )));
    }

    let rounded_start = model::round_to_grid_nearest(new_start, grid);
    let end_time = rounded_start + batch.bake_time;
    if end_time > business_hours.end_minutes {
        return Err(CoreError::NoSlotBeforeClose(format!(
            "end time {end_time} would fall past close"
        )));
    }

    let mut candidate = batch.clone();
    candidate.place(new_rack, rounded_start, oven.racks_per_oven);

    let has_conflict = state
        .all_batches()
        .any(|other| other.batch_id != batch_id && conflicts(&candidate, other));
    if has_conflict {
        return Err(CoreError::RackConflict(format!(
            "rack {new_rack} busy at minute {rounded_start}"
        )));
    }

    state
        .batch_mut(batch_id)
        .expect("batch just read")
        .place(new_rack, rounded_start, oven.racks_per_oven);
    state.push_event(EventKind::BatchMoved { batch_id });

    Ok(())
}

#[instrument(skip(state, spec), fields(simulation_id = %state.id, item = %spec.item_guid))]
pub fn add_batch(
    state: &mut SimulationState,
    spec: &BakeSpec,
    quantity: u32,
    desired_start: u32,
    business_hours: &BusinessHours,
    oven: &OvenConfig,
    grid: u32,
) -> CoreResult<BatchId> {
    let existing: Vec<_> = state.all_batches().cloned().collect();
    let refs: Vec<&model::Batch> = existing.iter().collect();

    let placement = scheduling::find_slot_at(spec, desired_start, &refs, business_hours, oven, grid)
        .or_else(|_| scheduling::find_earliest_slot(spec, desired_start, &refs, business_hours, oven, grid))
        .map_err(|_| CoreError::NoSlotBeforeClose(format!("no rack slot for {}", spec.item_guid)))?;

    if placement.start_time + spec.bake_time_minutes > business_hours.end_minutes {
        return Err(CoreError::NoSlotBeforeClose(
            "resulting end time falls past close".into(),
        ));
    }

    let mut batch = model::Batch::new_unplaced(&spec.item_guid, quantity, spec.bake_time_minutes, spec.cool_time_minutes);
    batch.place(placement.rack, placement.start_time, oven.racks_per_oven);
    let batch_id = batch.batch_id;

    state.insert_batch(batch);
    state.push_event(EventKind::BatchAdded { batch_id });

    Ok(batch_id)
}

#[instrument(skip(state), fields(simulation_id = %state.id, %batch_id))]
pub fn delete_batch(state: &mut SimulationState, batch_id: BatchId) -> CoreResult<()> {
    state
        .remove_batch(batch_id)
        .ok_or_else(|| CoreError::NotFound(format!("batch {batch_id}")))?;
    state.push_event(EventKind::BatchDeleted { batch_id });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Batch, Oven, SimMode, SimulationId, SimulationState};
    use std::collections::HashMap;

    fn hours() -> BusinessHours {
        BusinessHours { start_minutes: 360, end_minutes: 1020 }
    }

    fn ovens() -> OvenConfig {
        OvenConfig { oven_count: 2, racks_per_oven: 6 }
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

    fn base_state() -> SimulationState {
        SimulationState::new(
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
        )
    }

    #[test]
    fn move_batch_rejects_non_scheduled_batch() {
        let mut state = base_state();
        let mut batch = Batch::new_unplaced("croissant", 24, 20, 10);
        batch.place(1, 360, 6);
        batch.status = BatchStatus::Baking;
        let id = batch.batch_id;
        state.insert_batch(batch);

        let result = move_batch(&mut state, id, 400, 2, &hours(), &ovens(), 20);
        assert!(matches!(result, Err(CoreError::InvalidState(_))));
    }

    #[test]
    fn move_batch_detects_rack_conflict() {
        let mut state = base_state();
        let mut a = Batch::new_unplaced("croissant", 24, 20, 10);
        a.place(1, 360, 6);
        let a_id = a.batch_id;
        state.insert_batch(a);

        let mut b = Batch::new_unplaced("croissant", 24, 20, 10);
        b.place(2, 360, 6);
        state.insert_batch(b);

        let result = move_batch(&mut state, a_id, 360, 2, &hours(), &ovens(), 20);
        assert!(matches!(result, Err(CoreError::RackConflict(_))));
    }

    #[test]
    fn move_batch_rounds_to_nearest_grid_slot() {
        let mut state = base_state();
        let mut a = Batch::new_unplaced("croissant", 24, 20, 10);
        a.place(1, 360, 6);
        let id = a.batch_id;
        state.insert_batch(a);

        move_batch(&mut state, id, 411, 1, &hours(), &ovens(), 20).unwrap();
        assert_eq!(state.batch(id).unwrap().start_time, Some(420));
    }

    #[test]
    fn add_batch_finds_a_free_rack() {
        let mut state = base_state();
        let spec = croissant();
        let id = add_batch(&mut state, &spec, 24, 360, &hours(), &ovens(), 20).unwrap();
        assert!(state.batch(id).unwrap().is_placed());
    }

    #[test]
    fn delete_batch_removes_it_from_the_arena() {
        let mut state = base_state();
        let mut batch = Batch::new_unplaced("croissant", 24, 20, 10);
        batch.place(1, 360, 6);
        let id = batch.batch_id;
        state.insert_batch(batch);

        delete_batch(&mut state, id).unwrap();
        assert!(state.batch(id).is_none());
    }

    #[test]
    fn delete_batch_on_unknown_id_errors() {
        let mut state = base_state();
        let result = delete_batch(&mut state, model::BatchId::new_v4());
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }
}
