use serde::{Deserialize, Serialize};

/// Oven affinity of a [`BakeSpec`] / [`crate::batch::Batch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Oven {
    Fixed(u32),
    Any,
}

impl Oven {
    /// Whether a batch resolved onto `resolved_oven` satisfies this affinity.
    pub fn matches(&self, resolved_oven: u32) -> bool {
        match self {
            Oven::Fixed(o) => *o == resolved_oven,
            Oven::Any => true,
        }
    }
}

/// One item's production parameters, supplied by `SpecStore` and immutable
/// for the duration of a simulation (§3, §9 open question).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BakeSpec {
    pub item_guid: String,
    pub display_name: String,
    pub capacity_per_rack: u32,
    pub bake_time_minutes: u32,
    pub cool_time_minutes: u32,
    pub oven: Oven,
    pub fresh_window_minutes: u32,
    pub restock_threshold: u32,
    pub par_min: u32,
    pub par_max: Option<u32>,
    pub active: bool,
}

impl BakeSpec {
    /// §4.2 step 1: a spec is usable for planning only if its quantitative
    /// fields are all positive.
    pub fn is_schedulable(&self) -> bool {
        self.capacity_per_rack > 0 && self.bake_time_minutes > 0
    }
}
