//! Pure rack placement primitives shared by the schedule planner, the
//! simulation engine's operator mutations, and the catering allocator.
//!
//! Every function here takes the full batch list of a schedule (active and
//! completed) and never mutates it — callers place the returned
//! [`Placement`] onto a batch themselves.
use model::{BakeSpec, Batch, BusinessHours, OvenConfig};
use tracing::{debug, instrument};

/// A free rack/time slot a batch can be placed onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub rack: u32,
    pub start_time: u32,
}

/// Why a placement attempt failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotFailure {
    NoSlotBeforeClose,
    OvenMismatch,
}

/// Bound on how many grid slots [`find_slot_at`] retries before giving up.
const MAX_RETRY_SLOTS: u32 = 5;

fn round_up_to_grid(minutes: u32, grid: u32) -> u32 {
    model::round_to_grid_ceil(minutes, grid)
}

fn eligible_racks(spec: &BakeSpec, oven: &OvenConfig) -> impl Iterator<Item = u32> + '_ {
    (1..=oven.total_racks()).filter(move |&rack| spec.oven.matches(oven.oven_for_rack(rack)))
}

/// Two batches on the same rack conflict iff their `[start, end)` intervals
/// overlap (§4.1).
pub fn conflicts(a: &Batch, b: &Batch) -> bool {
    a.conflicts_with(b)
}

fn rack_is_free_at(rack: u32, start_time: u32, bake_time: u32, batches: &[&Batch]) -> bool {
    let end_time = start_time + bake_time;
    !batches.iter().any(|b| {
        b.rack_position == Some(rack)
            && b.start_time.is_some()
            && start_time < b.end_time().unwrap_or(start_time)
            && b.start_time.unwrap() < end_time
    })
}

/// Rounds `desired_start` up to the grid, then for each eligible rack (lowest
/// number first) checks whether it's free at that instant; if none is free,
/// advances by one grid slot and retries, up to [`MAX_RETRY_SLOTS`] attempts.
#[instrument(skip(batches), fields(item = %spec.item_guid, desired_start))]
pub fn find_slot_at(
    spec: &BakeSpec,
    desired_start: u32,
    batches: &[&Batch],
    business_hours: &BusinessHours,
    oven: &OvenConfig,
    grid: u32,
) -> Result<Placement, SlotFailure> {
    let racks: Vec<u32> = eligible_racks(spec, oven).collect();
    if racks.is_empty() {
        return Err(SlotFailure::OvenMismatch);
    }

    let mut start = round_up_to_grid(desired_start, grid);

    for _ in 0..=MAX_RETRY_SLOTS {
        if start + spec.bake_time_minutes > business_hours.end_minutes {
            debug!(start, "slot attempt runs past close");
            return Err(SlotFailure::NoSlotBeforeClose);
        }

        for &rack in &racks {
            if rack_is_free_at(rack, start, spec.bake_time_minutes, batches) {
                return Ok(Placement {
                    rack,
                    start_time: start,
                });
            }
        }

        start += grid;
    }

    Err(SlotFailure::NoSlotBeforeClose)
}

/// For each eligible rack, computes the end time of its last occupying
/// batch (or `not_before` if the rack is empty), takes the earliest such
/// instant across racks, rounds up to the grid, and returns the first rack
/// free there.
#[instrument(skip(batches), fields(item = %spec.item_guid, not_before))]
pub fn find_earliest_slot(
    spec: &BakeSpec,
    not_before: u32,
    batches: &[&Batch],
    business_hours: &BusinessHours,
    oven: &OvenConfig,
    grid: u32,
) -> Result<Placement, SlotFailure> {
    let racks: Vec<u32> = eligible_racks(spec, oven).collect();
    if racks.is_empty() {
        return Err(SlotFailure::OvenMismatch);
    }

    let mut earliest_end: u32 = not_before;
    for &rack in &racks {
        let rack_latest_end = batches
            .iter()
            .filter(|b| b.rack_position == Some(rack))
            .filter_map(|b| b.end_time())
            .max()
            .unwrap_or(0)
            .max(not_before);
        earliest_end = earliest_end.min(rack_latest_end);
    }

    let start = round_up_to_grid(earliest_end, grid);
    if start + spec.bake_time_minutes > business_hours.end_minutes {
        return Err(SlotFailure::NoSlotBeforeClose);
    }

    for &rack in &racks {
        if rack_is_free_at(rack, start, spec.bake_time_minutes, batches) {
            return Ok(Placement {
                rack,
                start_time: start,
            });
        }
    }

    Err(SlotFailure::NoSlotBeforeClose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Oven;

    fn spec(oven: Oven) -> BakeSpec {
        BakeSpec {
            item_guid: "croissant".into(),
            display_name: "Croissant".into(),
            capacity_per_rack: 24,
            bake_time_minutes: 20,
            cool_time_minutes: 10,
            oven,
            fresh_window_minutes: 120,
            restock_threshold: 10,
            par_min: 10,
            par_max: Some(40),
            active: true,
        }
    }

    fn hours() -> BusinessHours {
        BusinessHours {
            start_minutes: 360,
            end_minutes: 1020,
        }
    }

    fn ovens() -> OvenConfig {
        OvenConfig {
            oven_count: 2,
            racks_per_oven: 6,
        }
    }

    #[test]
    fn find_slot_at_picks_lowest_eligible_rack_when_free() {
        let spec = spec(Oven::Any);
        let placement = find_slot_at(&spec, 360, &[], &hours(), &ovens(), 20).unwrap();
        assert_eq!(placement, Placement { rack: 1, start_time: 360 });
    }

    #[test]
    fn find_slot_at_respects_oven_affinity() {
        let spec = spec(Oven::Fixed(2));
        let placement = find_slot_at(&spec, 360, &[], &hours(), &ovens(), 20).unwrap();
        assert_eq!(placement.rack, 7);
    }

    #[test]
    fn find_slot_at_skips_occupied_rack() {
        let spec = spec(Oven::Any);
        let mut occupying = Batch::new_unplaced("danish", 24, 20, 10);
        occupying.place(1, 360, 6);
        let batches = vec![&occupying];

        let placement = find_slot_at(&spec, 360, &batches, &hours(), &ovens(), 20).unwrap();
        assert_eq!(placement.rack, 2);
    }

    #[test]
    fn find_slot_at_retries_later_slots_when_every_rack_busy() {
        let spec = spec(Oven::Fixed(1));
        let hours = hours();
        let oven = ovens();
        let mut occupying = Vec::new();
        for rack in 1..=oven.racks_per_oven {
            let mut b = Batch::new_unplaced("danish", 24, 20, 10);
            b.place(rack, 360, oven.racks_per_oven);
            occupying.push(b);
        }
        let refs: Vec<&Batch> = occupying.iter().collect();

        let placement = find_slot_at(&spec, 360, &refs, &hours, &oven, 20).unwrap();
        assert_eq!(placement.start_time, 380);
    }

    #[test]
    fn find_slot_at_fails_past_close() {
        let spec = spec(Oven::Any);
        let hours = BusinessHours {
            start_minutes: 360,
            end_minutes: 380,
        };
        let result = find_slot_at(&spec, 370, &[], &hours, &ovens(), 20);
        assert_eq!(result, Err(SlotFailure::NoSlotBeforeClose));
    }

    #[test]
    fn find_earliest_slot_returns_rack_one_when_all_empty() {
        let spec = spec(Oven::Any);
        let placement = find_earliest_slot(&spec, 360, &[], &hours(), &ovens(), 20).unwrap();
        assert_eq!(placement, Placement { rack: 1, start_time: 360 });
    }

    #[test]
    fn find_earliest_slot_picks_the_rack_that_frees_up_soonest() {
        let spec = spec(Oven::Any);
        let mut b1 = Batch::new_unplaced("a", 24, 20, 10);
        b1.place(1, 360, 6);
        let mut b2 = Batch::new_unplaced("b", 24, 40, 10);
        b2.place(2, 360, 6);
        let batches = vec![&b1, &b2];

        let placement = find_earliest_slot(&spec, 0, &batches, &hours(), &ovens(), 20).unwrap();
        assert_eq!(placement.rack, 1);
        assert_eq!(placement.start_time, 380);
    }

    #[test]
    fn conflicts_detects_overlap_on_same_rack_only() {
        let mut a = Batch::new_unplaced("a", 24, 20, 10);
        a.place(1, 360, 6);
        let mut b = Batch::new_unplaced("b", 24, 20, 10);
        b.place(1, 370, 6);
        let mut c = Batch::new_unplaced("c", 24, 20, 10);
        c.place(2, 370, 6);

        assert!(conflicts(&a, &b));
        assert!(!conflicts(&a, &c));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use model::Oven;
    use proptest::prelude::*;

    fn hours() -> BusinessHours {
        BusinessHours { start_minutes: 360, end_minutes: 1020 }
    }

    fn ovens() -> OvenConfig {
        OvenConfig { oven_count: 2, racks_per_oven: 6 }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]
        #[test]
        fn find_slot_at_never_returns_a_conflicting_or_late_placement(
            desired_start in 360..1020u32,
            bake_time in 5..60u32,
            existing_starts in prop::collection::vec(360..1000u32, 0..6),
        ) {
            let spec = BakeSpec {
                item_guid: "item".into(),
                display_name: "Item".into(),
                capacity_per_rack: 10,
                bake_time_minutes: bake_time,
                cool_time_minutes: 5,
                oven: Oven::Any,
                fresh_window_minutes: 60,
                restock_threshold: 1,
                par_min: 1,
                par_max: None,
                active: true,
            };
            let oven = ovens();
            let hours = hours();

            let mut existing = Vec::new();
            for (i, start) in existing_starts.iter().enumerate() {
                let rack = (i as u32 % oven.total_racks()) + 1;
                let mut b = Batch::new_unplaced("other", 10, 15, 5);
                b.place(rack, model::round_to_grid_ceil(*start, 20), oven.racks_per_oven);
                existing.push(b);
            }
            let refs: Vec<&Batch> = existing.iter().collect();

            if let Ok(placement) = find_slot_at(&spec, desired_start, &refs, &hours, &oven, 20) {
                prop_assert!(placement.start_time + spec.bake_time_minutes <= hours.end_minutes);
                prop_assert!(placement.start_time % 20 == 0);

                let mut candidate = Batch::new_unplaced("item", 10, bake_time, 5);
                candidate.place(placement.rack, placement.start_time, oven.racks_per_oven);
                for other in &existing {
                    prop_assert!(!conflicts(&candidate, other));
                }
            }
        }
    }
}
