use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::batch::{Batch, BatchId};
use crate::catering::{CateringOrder, CateringOrderId};
use crate::event::Event;
use crate::inventory::Inventory;
use crate::order::{MissedOrder, PresetOrder, ProcessedAggregate};
use crate::spec::BakeSpec;

pub type SimulationId = Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimMode {
    Manual,
    Preset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimStatus {
    Running,
    Paused,
    Stopped,
    Completed,
}

/// One interval of an item's intraday forecast curve (§4.2, §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastInterval {
    pub time_interval: u32,
    pub forecast: u32,
}

/// Running counters maintained alongside state transitions (§3, invariants 4-5).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub batches_started: u32,
    pub batches_pulled: u32,
    pub batches_available: u32,
    pub items_processed: u32,
    pub items_missed: u32,
    pub peak_inventory: usize,
    pub store_errors: u32,
}

/// Authoritative state of one running simulation (§3). Mutated only by the
/// Simulation Engine's single-writer loop (§5).
#[derive(Clone, Debug)]
pub struct SimulationState {
    pub id: SimulationId,
    pub mode: SimMode,
    pub schedule_id: String,

    pub started_at_real_ms: u64,
    pub paused_duration_ms: u64,
    pub paused_at_ms: Option<u64>,
    pub speed_multiplier: f64,
    pub status: SimStatus,

    /// Simulated minutes since midnight, 0.1-minute precision, clamped at END.
    pub current_time: f64,

    /// Immutable snapshot of specs taken at `start()` (§9 open question).
    pub specs: Vec<BakeSpec>,

    batches: HashMap<BatchId, Batch>,
    active_ids: Vec<BatchId>,
    completed_ids: Vec<BatchId>,

    pub inventory: Inventory,

    pub preset_orders: Vec<PresetOrder>,
    pub processed_order_keys: HashSet<String>,
    pub processed_orders_by_item: HashMap<String, ProcessedAggregate>,
    pub missed_orders: Vec<MissedOrder>,

    pub stats: Stats,
    pub events: Vec<Event>,

    pub catering_orders: HashMap<CateringOrderId, CateringOrder>,
    pub auto_approve_catering: bool,

    pub daily_forecast: HashMap<String, u32>,
    pub time_interval_forecast: HashMap<String, Vec<ForecastInterval>>,
}

impl SimulationState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SimulationId,
        mode: SimMode,
        schedule_id: String,
        started_at_real_ms: u64,
        speed_multiplier: f64,
        start_minutes: u32,
        specs: Vec<BakeSpec>,
        preset_orders: Vec<PresetOrder>,
        daily_forecast: HashMap<String, u32>,
        time_interval_forecast: HashMap<String, Vec<ForecastInterval>>,
    ) -> Self {
        let mut preset_orders = preset_orders;
        preset_orders.sort_by_key(|o| o.order_time_minutes);

        Self {
            id,
            mode,
            schedule_id,
            started_at_real_ms,
            paused_duration_ms: 0,
            paused_at_ms: None,
            speed_multiplier,
            status: SimStatus::Running,
            current_time: start_minutes as f64,
            specs,
            batches: HashMap::new(),
            active_ids: Vec::new(),
            completed_ids: Vec::new(),
            inventory: Inventory::default(),
            preset_orders,
            processed_order_keys: HashSet::new(),
            processed_orders_by_item: HashMap::new(),
            missed_orders: Vec::new(),
            stats: Stats::default(),
            events: Vec::new(),
            catering_orders: HashMap::new(),
            auto_approve_catering: false,
            daily_forecast,
            time_interval_forecast,
        }
    }

    pub fn spec_for(&self, item_guid: &str) -> Option<&BakeSpec> {
        self.specs.iter().find(|s| s.item_guid == item_guid)
    }

    pub fn insert_batch(&mut self, batch: Batch) {
        let id = batch.batch_id;
        self.batches.insert(id, batch);
        self.active_ids.push(id);
    }

    pub fn batch(&self, id: BatchId) -> Option<&Batch> {
        self.batches.get(&id)
    }

    pub fn batch_mut(&mut self, id: BatchId) -> Option<&mut Batch> {
        self.batches.get_mut(&id)
    }

    pub fn active_batches(&self) -> impl Iterator<Item = &Batch> {
        self.active_ids.iter().filter_map(|id| self.batches.get(id))
    }

    pub fn completed_batches(&self) -> impl Iterator<Item = &Batch> {
        self.completed_ids.iter().filter_map(|id| self.batches.get(id))
    }

    /// All batches (active + completed), as the rack allocator needs (§4.1).
    pub fn all_batches(&self) -> impl Iterator<Item = &Batch> {
        self.batches.values()
    }

    pub fn is_active(&self, id: BatchId) -> bool {
        self.active_ids.contains(&id)
    }

    /// Moves a batch from the active list to the completed list (available
    /// transition side effect, §4.3).
    pub fn complete_batch(&mut self, id: BatchId) {
        self.active_ids.retain(|b| *b != id);
        if !self.completed_ids.contains(&id) {
            self.completed_ids.push(id);
        }
    }

    /// Removes a batch from whichever list holds it and drops it from the
    /// arena (`deleteBatch`, §4.3).
    pub fn remove_batch(&mut self, id: BatchId) -> Option<Batch> {
        self.active_ids.retain(|b| *b != id);
        self.completed_ids.retain(|b| *b != id);
        self.batches.remove(&id)
    }

    pub fn push_event(&mut self, kind: crate::event::EventKind) {
        let timestamp = self.current_time as u32;
        self.events.push(Event { timestamp, kind });
    }

    pub fn recent_events(&self, n: usize) -> &[Event] {
        let len = self.events.len();
        &self.events[len.saturating_sub(n)..]
    }
}
