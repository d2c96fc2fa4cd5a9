use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::batch::BatchId;

/// A single unit of a FIFO inventory list, tagged with the batch it came from
/// and the simulated minute it became available (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryUnit {
    pub available_at: u32,
    pub batch_id: BatchId,
}

/// Per-item FIFO inventory, kept sorted ascending by `available_at` at all
/// times (invariant 6, §8).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InventoryList {
    units: Vec<InventoryUnit>,
}

impl InventoryList {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[InventoryUnit] {
        &self.units
    }

    /// Appends `quantity` units available at `available_at` and re-sorts.
    pub fn push_batch(&mut self, available_at: u32, batch_id: BatchId, quantity: u32) {
        for _ in 0..quantity {
            self.units.push(InventoryUnit {
                available_at,
                batch_id,
            });
        }
        self.units.sort_by_key(|u| u.available_at);
    }

    /// Removes the `n` oldest units (FIFO). Returns `false` without mutating
    /// if fewer than `n` units are present.
    pub fn try_remove_fifo(&mut self, n: usize) -> bool {
        if self.units.len() < n {
            return false;
        }
        self.units.drain(0..n);
        true
    }
}

/// Map of item GUID to its FIFO inventory list, plus the running total and
/// peak used by the simulation's aggregate counters (§3, invariant 4-5).
#[derive(Clone, Debug, Default)]
pub struct Inventory {
    by_item: HashMap<String, InventoryList>,
}

impl Inventory {
    pub fn list(&self, item_guid: &str) -> Option<&InventoryList> {
        self.by_item.get(item_guid)
    }

    pub fn list_mut(&mut self, item_guid: &str) -> &mut InventoryList {
        self.by_item.entry(item_guid.to_string()).or_default()
    }

    pub fn count(&self, item_guid: &str) -> usize {
        self.by_item.get(item_guid).map(|l| l.len()).unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.by_item.values().map(|l| l.len()).sum()
    }

    pub fn items(&self) -> impl Iterator<Item = (&String, &InventoryList)> {
        self.by_item.iter()
    }
}
