//! Catering order allocator (§4.5): places a multi-item order atomically,
//! staggering earlier and, failing that, displacing conflicting scheduled
//! batches before giving up.
use std::collections::HashMap;

use model::{
    BakeSpec, Batch, BatchId, BatchStatus, BusinessHours, CateringItem, CateringOrder,
    CateringOrderId, CateringStatus, CoreError, CoreResult, EventKind, MovedBatch, OvenConfig,
    SimulationState,
};
use scheduling::{conflicts, Placement};
use tracing::{instrument, warn};
use uuid::Uuid;

/// A catering order must promise availability at least this far out.
const MIN_LEAD_MINUTES: f64 = 120.0;

/// First pass staggers this far earlier than the ideal start before giving
/// up and trying to displace a conflicting batch.
const MAX_STAGGER_MINUTES: u32 = 120;
const STAGGER_STEP: u32 = 20;

fn round_down_to_grid(minutes: u32, grid: u32) -> u32 {
    if grid == 0 {
        return minutes;
    }
    (minutes / grid) * grid
}

fn eligible_racks(spec: &BakeSpec, oven: &OvenConfig) -> Vec<u32> {
    (1..=oven.total_racks())
        .filter(|&rack| spec.oven.matches(oven.oven_for_rack(rack)))
        .collect()
}

/// Resolves a batch's *effective* placement: the relocated position if this
/// order has already moved it, otherwise its position in `state`.
fn effective<'a>(batch: &'a Batch, relocated: &'a HashMap<BatchId, Batch>) -> &'a Batch {
    relocated.get(&batch.batch_id).unwrap_or(batch)
}

fn rack_free(
    rack: u32,
    start_time: u32,
    bake_time: u32,
    exclude: Option<BatchId>,
    state: &SimulationState,
    reservations: &[Batch],
    relocated: &HashMap<BatchId, Batch>,
) -> bool {
    let mut probe = Batch::new_unplaced("probe", 0, bake_time, 0);
    probe.place(rack, start_time, 1);

    let blocked_by_existing = state.all_batches().any(|b| {
        if Some(b.batch_id) == exclude {
            return false;
        }
        conflicts(&probe, effective(b, relocated))
    });
    if blocked_by_existing {
        return false;
    }
    !reservations.iter().any(|r| conflicts(&probe, r))
}

fn occupant_at(
    rack: u32,
    start_time: u32,
    bake_time: u32,
    state: &SimulationState,
    relocated: &HashMap<BatchId, Batch>,
) -> Option<BatchId> {
    let end_time = start_time + bake_time;
    state.all_batches().find_map(|b| {
        let eb = effective(b, relocated);
        let (Some(r), Some(s), Some(e)) = (eb.rack_position, eb.start_time, eb.end_time()) else {
            return None;
        };
        if r == rack && start_time < e && s < end_time {
            Some(b.batch_id)
        } else {
            None
        }
    })
}

/// Greedy first pass: try the ideal start, then stagger 20 minutes earlier
/// at a time (up to [`MAX_STAGGER_MINUTES`]) across eligible racks.
fn try_place(
    spec: &BakeSpec,
    ideal_start: u32,
    business_hours: &BusinessHours,
    oven: &OvenConfig,
    grid: u32,
    state: &SimulationState,
    reservations: &[Batch],
    relocated: &HashMap<BatchId, Batch>,
) -> Option<Placement> {
    let racks = eligible_racks(spec, oven);
    if racks.is_empty() {
        return None;
    }

    let base = round_down_to_grid(ideal_start, grid);
    let mut offset = 0;
    while offset <= MAX_STAGGER_MINUTES {
        if offset > base || base - offset < business_hours.start_minutes {
            break;
        }
        let candidate = base - offset;
        for &rack in &racks {
            if rack_free(rack, candidate, spec.bake_time_minutes, None, state, reservations, relocated) {
                return Some(Placement { rack, start_time: candidate });
            }
        }
        offset += STAGGER_STEP;
    }
    None
}

/// Searches outward from `occ`'s current slot for a new home honouring its
/// own oven affinity, so it can be displaced out of a catering order's way.
fn find_relocation_spot(
    occ: &Batch,
    occ_spec: &BakeSpec,
    business_hours: &BusinessHours,
    oven: &OvenConfig,
    grid: u32,
    state: &SimulationState,
    reservations: &[Batch],
    relocated: &HashMap<BatchId, Batch>,
) -> Option<Placement> {
    let racks = eligible_racks(occ_spec, oven);
    if racks.is_empty() {
        return None;
    }
    let original_start = occ.start_time?;

    let mut offset = STAGGER_STEP;
    while offset <= MAX_STAGGER_MINUTES {
        for candidate in [original_start.saturating_add(offset), original_start.saturating_sub(offset)] {
            if candidate == original_start {
                continue;
            }
            let candidate = round_down_to_grid(candidate, grid);
            if candidate < business_hours.start_minutes
                || candidate + occ_spec.bake_time_minutes > business_hours.end_minutes
            {
                continue;
            }
            for &rack in &racks {
                if rack_free(
                    rack,
                    candidate,
                    occ_spec.bake_time_minutes,
                    Some(occ.batch_id),
                    state,
                    reservations,
                    relocated,
                ) {
                    return Some(Placement { rack, start_time: candidate });
                }
            }
        }
        offset += STAGGER_STEP;
    }
    None
}

/// Second pass: at each staggered slot, displace whichever scheduled batch
/// blocks it (if it can itself find a new home) and retry that slot.
fn try_place_by_displacing(
    spec: &BakeSpec,
    ideal_start: u32,
    business_hours: &BusinessHours,
    oven: &OvenConfig,
    grid: u32,
    state: &SimulationState,
    reservations: &[Batch],
    relocated: &mut HashMap<BatchId, Batch>,
    moves: &mut Vec<MovedBatch>,
) -> Option<Placement> {
    let racks = eligible_racks(spec, oven);
    if racks.is_empty() {
        return None;
    }

    let base = round_down_to_grid(ideal_start, grid);
    let mut offset = 0;
    while offset <= MAX_STAGGER_MINUTES {
        if offset > base || base - offset < business_hours.start_minutes {
            break;
        }
        let candidate = base - offset;
        for &rack in &racks {
            if rack_free(rack, candidate, spec.bake_time_minutes, None, state, reservations, relocated) {
                return Some(Placement { rack, start_time: candidate });
            }

            let Some(occupant_id) = occupant_at(rack, candidate, spec.bake_time_minutes, state, relocated) else {
                continue;
            };
            if relocated.contains_key(&occupant_id) {
                continue;
            }
            let Some(occ) = state.batch(occupant_id) else { continue };
            if occ.status != BatchStatus::Scheduled || occ.is_catering {
                continue;
            }
            let Some(occ_spec) = state.spec_for(&occ.item_guid) else { continue };

            if let Some(new_spot) =
                find_relocation_spot(occ, occ_spec, business_hours, oven, grid, state, reservations, relocated)
            {
                let old_rack = occ.rack_position.expect("scheduled batch is placed");
                let old_start = occ.start_time.expect("scheduled batch is placed");
                let mut moved = occ.clone();
                moved.place(new_spot.rack, new_spot.start_time, oven.racks_per_oven);
                relocated.insert(occupant_id, moved);
                moves.push(MovedBatch { batch_id: occupant_id, old_rack, old_start_time: old_start });

                if rack_free(rack, candidate, spec.bake_time_minutes, None, state, reservations, relocated) {
                    return Some(Placement { rack, start_time: candidate });
                }
            }
        }
        offset += STAGGER_STEP;
    }
    None
}

fn make_batch(spec: &BakeSpec, quantity: u32, placement: Placement, oven: &OvenConfig) -> Batch {
    let mut batch = Batch::new_unplaced(spec.item_guid.clone(), quantity, spec.bake_time_minutes, spec.cool_time_minutes);
    batch.place(placement.rack, placement.start_time, oven.racks_per_oven);
    batch
}

/// Allocates and commits a catering order, or fails atomically leaving
/// `state` untouched (§4.5 step 7).
#[instrument(skip(state, items), fields(simulation_id = %state.id, item_count = items.len()))]
pub fn create_catering_order(
    state: &mut SimulationState,
    items: Vec<CateringItem>,
    required_available_time: u32,
    auto_approve: bool,
    business_hours: &BusinessHours,
    oven: &OvenConfig,
    grid: u32,
) -> CoreResult<CateringOrderId> {
    if items.is_empty() {
        return Err(CoreError::InvalidInput("catering order must contain at least one item".into()));
    }
    for item in &items {
        if item.quantity == 0 {
            return Err(CoreError::InvalidInput(format!("quantity must be positive for {}", item.item_guid)));
        }
        let spec = state.spec_for(&item.item_guid).ok_or_else(|| CoreError::InvalidBakeSpec {
            item_guid: item.item_guid.clone(),
            reason: "no bake spec on file".into(),
        })?;
        if !spec.is_schedulable() {
            return Err(CoreError::InvalidBakeSpec {
                item_guid: item.item_guid.clone(),
                reason: "spec is not schedulable".into(),
            });
        }
    }

    let pickup = model::round_to_grid_ceil(required_available_time, grid);
    if (pickup as f64) < state.current_time + MIN_LEAD_MINUTES {
        return Err(CoreError::InvalidInput(format!(
            "required_available_time must be at least {} minutes out",
            MIN_LEAD_MINUTES as u32
        )));
    }
    if pickup > business_hours.end_minutes {
        return Err(CoreError::NoSlotBeforeClose("required_available_time falls after close".into()));
    }

    let mut reservations: Vec<Batch> = Vec::new();
    let mut relocated: HashMap<BatchId, Batch> = HashMap::new();
    let mut moves: Vec<MovedBatch> = Vec::new();

    for item in &items {
        let spec = state.spec_for(&item.item_guid).expect("validated above").clone();
        let ideal_start = pickup.saturating_sub(spec.bake_time_minutes + spec.cool_time_minutes);
        let batches_needed = item.quantity.div_ceil(spec.capacity_per_rack);

        let mut remaining = item.quantity;
        for _ in 0..batches_needed {
            let quantity = remaining.min(spec.capacity_per_rack);
            remaining -= quantity;

            let placement = try_place(&spec, ideal_start, business_hours, oven, grid, state, &reservations, &relocated)
                .or_else(|| {
                    try_place_by_displacing(
                        &spec,
                        ideal_start,
                        business_hours,
                        oven,
                        grid,
                        state,
                        &reservations,
                        &mut relocated,
                        &mut moves,
                    )
                });

            let Some(placement) = placement else {
                warn!(item = %item.item_guid, quantity, "catering order cannot be fulfilled, rolling back");
                return Err(CoreError::CannotFulfil(format!(
                    "no slot available for {} x{quantity} by {pickup}",
                    item.item_guid
                )));
            };

            reservations.push(make_batch(&spec, quantity, placement, oven));
        }
    }

    let order_id = Uuid::new_v4();

    for mv in &moves {
        let new_spot = relocated.get(&mv.batch_id).expect("recorded move has a relocated entry");
        let (rack, start) = (
            new_spot.rack_position.expect("relocated batch is placed"),
            new_spot.start_time.expect("relocated batch is placed"),
        );
        state
            .batch_mut(mv.batch_id)
            .expect("moved batch still exists")
            .place(rack, start, oven.racks_per_oven);
    }

    let mut created_batches = Vec::with_capacity(reservations.len());
    for mut batch in reservations {
        batch.is_catering = true;
        batch.catering_order_id = Some(order_id);
        created_batches.push(batch.batch_id);
        state.insert_batch(batch);
    }

    let approved = auto_approve || state.auto_approve_catering;
    let order = CateringOrder {
        order_id,
        items,
        required_available_time: pickup,
        order_placed_at: state.current_time as u32,
        status: if approved { CateringStatus::Approved } else { CateringStatus::Pending },
        created_batches,
        moved_batches: moves,
    };
    state.catering_orders.insert(order_id, order);
    state.push_event(EventKind::CateringCreated { order_id });
    if approved {
        state.push_event(EventKind::CateringApproved { order_id });
    }

    Ok(order_id)
}

#[instrument(skip(state), fields(simulation_id = %state.id, %order_id))]
pub fn approve_catering_order(state: &mut SimulationState, order_id: CateringOrderId) -> CoreResult<()> {
    let order = state
        .catering_orders
        .get_mut(&order_id)
        .ok_or_else(|| CoreError::NotFound(format!("catering order {order_id}")))?;
    if order.status != CateringStatus::Pending {
        return Err(CoreError::InvalidState(format!("catering order {order_id} is not pending")));
    }
    order.status = CateringStatus::Approved;
    state.push_event(EventKind::CateringApproved { order_id });
    Ok(())
}

/// Rejects a pending order, restoring every batch it displaced to its
/// recorded old position and dropping the batches it created (§4.5 step 7).
#[instrument(skip(state, oven), fields(simulation_id = %state.id, %order_id))]
pub fn reject_catering_order(
    state: &mut SimulationState,
    order_id: CateringOrderId,
    oven: &OvenConfig,
) -> CoreResult<()> {
    let order = state
        .catering_orders
        .get(&order_id)
        .ok_or_else(|| CoreError::NotFound(format!("catering order {order_id}")))?;
    if order.status != CateringStatus::Pending {
        return Err(CoreError::InvalidState(format!("catering order {order_id} is not pending")));
    }

    let created = order.created_batches.clone();
    let moved = order.moved_batches.clone();

    for batch_id in &created {
        state.remove_batch(*batch_id);
    }
    for mv in &moved {
        if let Some(b) = state.batch_mut(mv.batch_id) {
            b.place(mv.old_rack, mv.old_start_time, oven.racks_per_oven);
        }
    }

    let order = state.catering_orders.get_mut(&order_id).expect("checked above");
    order.status = CateringStatus::Rejected;
    state.push_event(EventKind::CateringRejected { order_id });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Oven, SimMode, SimulationId};
    use std::collections::HashMap as Map;

    pub(super) fn hours() -> BusinessHours {
        BusinessHours { start_minutes: 360, end_minutes: 1020 }
    }

    pub(super) fn ovens() -> OvenConfig {
        OvenConfig { oven_count: 2, racks_per_oven: 6 }
    }

    pub(super) fn croissant() -> BakeSpec {
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

    pub(super) fn base_state() -> SimulationState {
        SimulationState::new(
            SimulationId::new_v4(),
            SimMode::Manual,
            "sched-1".into(),
            0,
            1.0,
            360,
            vec![croissant()],
            vec![],
            Map::new(),
            Map::new(),
        )
    }

    #[test]
    fn rejects_order_with_lead_time_too_short() {
        let mut state = base_state();
        state.current_time = 600.0;
        let result = create_catering_order(
            &mut state,
            vec![CateringItem { item_guid: "croissant".into(), quantity: 24 }],
            650,
            false,
            &hours(),
            &ovens(),
            20,
        );
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn rejects_order_for_unknown_item() {
        let mut state = base_state();
        let result = create_catering_order(
            &mut state,
            vec![CateringItem { item_guid: "bagel".into(), quantity: 24 }],
            800,
            false,
            &hours(),
            &ovens(),
            20,
        );
        assert!(matches!(result, Err(CoreError::InvalidBakeSpec { .. })));
    }

    #[test]
    fn places_batches_on_a_clear_schedule_and_defaults_to_pending() {
        let mut state = base_state();
        let order_id = create_catering_order(
            &mut state,
            vec![CateringItem { item_guid: "croissant".into(), quantity: 48 }],
            800,
            false,
            &hours(),
            &ovens(),
            20,
        )
        .unwrap();

        let order = state.catering_orders.get(&order_id).unwrap();
        assert_eq!(order.status, CateringStatus::Pending);
        assert_eq!(order.created_batches.len(), 2);
        for batch_id in &order.created_batches {
            let batch = state.batch(*batch_id).unwrap();
            assert!(batch.is_catering);
            assert!(batch.available_time().unwrap() <= order.required_available_time);
        }
    }

    #[test]
    fn auto_approve_flag_on_the_order_bypasses_pending() {
        let mut state = base_state();
        let order_id = create_catering_order(
            &mut state,
            vec![CateringItem { item_guid: "croissant".into(), quantity: 24 }],
            800,
            true,
            &hours(),
            &ovens(),
            20,
        )
        .unwrap();
        assert_eq!(state.catering_orders.get(&order_id).unwrap().status, CateringStatus::Approved);
    }

    #[test]
    fn displaces_a_conflicting_scheduled_batch_to_make_room() {
        let mut state = base_state();
        let total_racks = ovens().total_racks();
        // Fill every stagger candidate (760 down to 640) on every rack, so the
        // greedy first pass has nowhere to go and must displace something.
        let mut t = 640;
        while t <= 760 {
            for rack in 1..=total_racks {
                let mut b = Batch::new_unplaced("croissant", 24, 20, 10);
                b.place(rack, t, 6);
                state.insert_batch(b);
            }
            t += 20;
        }

        let order_id = create_catering_order(
            &mut state,
            vec![CateringItem { item_guid: "croissant".into(), quantity: 24 }],
            800,
            false,
            &hours(),
            &ovens(),
            20,
        )
        .unwrap();

        let order = state.catering_orders.get(&order_id).unwrap();
        assert_eq!(order.created_batches.len(), 1);
        assert_eq!(order.moved_batches.len(), 1);
        let mv = order.moved_batches[0];
        let moved_batch = state.batch(mv.batch_id).unwrap();
        assert_ne!(moved_batch.start_time, Some(mv.old_start_time));
    }

    #[test]
    fn rejecting_restores_displaced_batches_and_drops_created_ones() {
        let mut state = base_state();
        let total_racks = ovens().total_racks();
        let mut t = 640;
        while t <= 760 {
            for rack in 1..=total_racks {
                let mut b = Batch::new_unplaced("croissant", 24, 20, 10);
                b.place(rack, t, 6);
                state.insert_batch(b);
            }
            t += 20;
        }

        let order_id = create_catering_order(
            &mut state,
            vec![CateringItem { item_guid: "croissant".into(), quantity: 24 }],
            800,
            false,
            &hours(),
            &ovens(),
            20,
        )
        .unwrap();
        let order = state.catering_orders.get(&order_id).unwrap().clone();

        reject_catering_order(&mut state, order_id, &ovens()).unwrap();

        assert_eq!(state.catering_orders.get(&order_id).unwrap().status, CateringStatus::Rejected);
        for batch_id in &order.created_batches {
            assert!(state.batch(*batch_id).is_none());
        }
        for mv in &order.moved_batches {
            let restored = state.batch(mv.batch_id).unwrap();
            assert_eq!(restored.start_time, Some(mv.old_start_time));
            assert_eq!(restored.rack_position, Some(mv.old_rack));
        }
    }

    #[test]
    fn approving_twice_is_an_error() {
        let mut state = base_state();
        let order_id = create_catering_order(
            &mut state,
            vec![CateringItem { item_guid: "croissant".into(), quantity: 24 }],
            800,
            false,
            &hours(),
            &ovens(),
            20,
        )
        .unwrap();
        approve_catering_order(&mut state, order_id).unwrap();
        let result = approve_catering_order(&mut state, order_id);
        assert!(matches!(result, Err(CoreError::InvalidState(_))));
    }

    #[test]
    fn atomically_rejects_when_no_slot_exists_anywhere() {
        let mut state = base_state();
        // Fill every rack across the whole staggering window so no slot,
        // moved or not, can ever open up.
        let mut t = hours().start_minutes;
        while t < hours().end_minutes {
            for rack in 1..=ovens().total_racks() {
                let mut b = Batch::new_unplaced("croissant", 24, 20, 10);
                b.place(rack, t, 6);
                state.insert_batch(b);
            }
            t += 20;
        }
        let before = state.all_batches().count();

        let result = create_catering_order(
            &mut state,
            vec![CateringItem { item_guid: "croissant".into(), quantity: 24 }],
            800,
            false,
            &hours(),
            &ovens(),
            20,
        );
        assert!(matches!(result, Err(CoreError::CannotFulfil(_))));
        assert_eq!(state.all_batches().count(), before);
        assert!(state.catering_orders.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::tests::*;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]
        #[test]
        fn allocation_is_atomic_and_never_overbooks_a_rack(
            quantity in 1..=96u32,
            lead_minutes in 0..=300u32,
            prefill_slots in 0..=18usize,
        ) {
            let mut state = base_state();
            let hours = hours();
            let ovens = ovens();

            // Scatter some pre-existing scheduled batches so the allocator
            // sometimes has to stagger or displace, sometimes not.
            let mut t = hours.start_minutes;
            let mut filled = 0;
            while t < hours.end_minutes && filled < prefill_slots {
                let rack = 1 + (filled as u32 % ovens.total_racks());
                let mut b = Batch::new_unplaced("croissant", 24, 20, 10);
                b.place(rack, t, 6);
                state.insert_batch(b);
                filled += 1;
                t += 20;
            }

            let before_count = state.all_batches().count();
            let required_available_time = hours.start_minutes + lead_minutes;

            let result = create_catering_order(
                &mut state,
                vec![CateringItem { item_guid: "croissant".into(), quantity }],
                required_available_time,
                false,
                &hours,
                &ovens,
                20,
            );

            match result {
                Ok(order_id) => {
                    // --- INVARIANT: no two batches ever share a rack+time window ---
                    let batches: Vec<_> = state.all_batches().cloned().collect();
                    for (i, a) in batches.iter().enumerate() {
                        for b in &batches[i + 1..] {
                            prop_assert!(!conflicts(a, b));
                        }
                    }

                    // --- INVARIANT: the order's own batches bake enough units ---
                    let order = state.catering_orders.get(&order_id).unwrap();
                    let produced: u32 = order
                        .created_batches
                        .iter()
                        .filter_map(|id| state.batch(*id))
                        .map(|b| b.quantity)
                        .sum();
                    prop_assert!(produced >= quantity);
                }
                Err(CoreError::CannotFulfil(_)) | Err(CoreError::InvalidInput(_)) => {
                    // --- INVARIANT: a failed attempt leaves the schedule untouched ---
                    prop_assert_eq!(state.all_batches().count(), before_count);
                }
                Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
            }
        }
    }
}
