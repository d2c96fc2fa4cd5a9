use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::batch::Batch;
use crate::simulation_state::ForecastInterval;

/// An item that the planner could not place, reported in the schedule
/// summary rather than silently dropped (§4.2 post-condition).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnplacedItem {
    pub item_guid: String,
    pub quantity: u32,
    pub reason: String,
}

/// A named collection of batches for a date plus the forecast and PAR config
/// that produced them (§3). The durable twin of the core's in-simulation
/// batch list; persisted via `ScheduleStore`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub date: NaiveDate,
    pub batches: Vec<Batch>,
    pub unplaced: Vec<UnplacedItem>,
    pub daily_forecast: HashMap<String, u32>,
    pub time_interval_forecast: HashMap<String, Vec<ForecastInterval>>,
}

impl Schedule {
    pub fn id_for_date(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }
}
