use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A historical order replayed at `order_time_minutes` during preset-mode
/// simulation (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresetOrder {
    pub order_id: Uuid,
    pub item_guid: String,
    pub quantity: u32,
    pub display_name: String,
    pub order_time_minutes: u32,
}

/// Aggregate of successfully processed demand for one item, credited by both
/// preset-order processing and manual purchases (§4.3).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedAggregate {
    pub total_quantity: u32,
    pub order_count: u32,
}

/// A single miss: demand that could not be satisfied from inventory (§4.3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissedOrder {
    pub order_id: Uuid,
    pub item_guid: String,
    pub requested_quantity: u32,
    pub available_inventory: usize,
    pub at_time: u32,
}

/// `orderId:itemGuid` key recorded in `processed_order_keys` so a preset
/// order is settled (hit or miss) at most once (§4.3, invariant 7).
pub fn order_key(order_id: Uuid, item_guid: &str) -> String {
    format!("{order_id}:{item_guid}")
}
