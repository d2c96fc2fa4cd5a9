//! The read-only projection of a [`crate::simulation_state::SimulationState`]
//! published on every driver tick (§6: broadcast channel fields). Lives in
//! `model` (rather than `simulation`, which builds it) so `store::Transport`
//! can depend on it without a crate cycle.
use std::collections::HashMap;

use crate::batch::Batch;
use crate::catering::{CateringOrder, CateringOrderId};
use crate::event::Event;
use crate::inventory::InventoryUnit;
use crate::order::{MissedOrder, PresetOrder, ProcessedAggregate};
use crate::simulation_state::{ForecastInterval, SimMode, SimStatus, SimulationId, SimulationState, Stats};
use crate::time::minutes_to_hhmm;

/// The restock tunables of a `BakeSpec`, carried on the snapshot so a
/// subscriber can render PAR thresholds without also needing the `SpecStore`
/// (§6: snapshot field `parConfig`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParConfig {
    pub restock_threshold: u32,
    pub par_min: u32,
    pub par_max: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct Snapshot {
    pub id: SimulationId,
    pub status: SimStatus,
    pub mode: SimMode,
    pub current_time_hhmm: String,
    pub stats: Stats,
    pub inventory_counts: HashMap<String, usize>,
    pub inventory_units: HashMap<String, Vec<InventoryUnit>>,
    pub batches: Vec<Batch>,
    pub completed_batches: Vec<Batch>,
    pub daily_forecast: HashMap<String, u32>,
    pub time_interval_forecast: HashMap<String, Vec<ForecastInterval>>,
    pub par_config: HashMap<String, ParConfig>,
    pub preset_orders: Vec<PresetOrder>,
    pub recent_events: Vec<Event>,
    pub missed_orders: Vec<MissedOrder>,
    pub processed_orders_by_item: HashMap<String, ProcessedAggregate>,
    pub catering_orders: HashMap<CateringOrderId, CateringOrder>,
    pub auto_approve_catering: bool,
}

/// Number of trailing events a `simulation_update` snapshot carries (§6).
const RECENT_EVENTS_WINDOW: usize = 5;

impl Snapshot {
    pub fn from_state(state: &SimulationState) -> Self {
        let inventory_counts = state
            .inventory
            .items()
            .map(|(item, list)| (item.clone(), list.len()))
            .collect();
        let inventory_units = state
            .inventory
            .items()
            .map(|(item, list)| (item.clone(), list.units().to_vec()))
            .collect();
        let par_config = state
            .specs
            .iter()
            .map(|spec| {
                (
                    spec.item_guid.clone(),
                    ParConfig {
                        restock_threshold: spec.restock_threshold,
                        par_min: spec.par_min,
                        par_max: spec.par_max,
                    },
                )
            })
            .collect();

        Self {
            id: state.id,
            status: state.status,
            mode: state.mode,
            current_time_hhmm: minutes_to_hhmm(state.current_time as u32),
            stats: state.stats,
            inventory_counts,
            inventory_units,
            batches: state.active_batches().cloned().collect(),
            completed_batches: state.completed_batches().cloned().collect(),
            daily_forecast: state.daily_forecast.clone(),
            time_interval_forecast: state.time_interval_forecast.clone(),
            par_config,
            preset_orders: state.preset_orders.clone(),
            recent_events: state.recent_events(RECENT_EVENTS_WINDOW).to_vec(),
            missed_orders: state.missed_orders.clone(),
            processed_orders_by_item: state.processed_orders_by_item.clone(),
            catering_orders: state.catering_orders.clone(),
            auto_approve_catering: state.auto_approve_catering,
        }
    }
}
