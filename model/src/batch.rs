use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BatchId = Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Scheduled,
    Baking,
    Pulling,
    Available,
}

/// A single oven use: one rack, one item, one grid-aligned start, for
/// `bake_time` minutes (§3, glossary).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: BatchId,
    pub item_guid: String,
    pub quantity: u32,
    pub bake_time: u32,
    pub cool_time: u32,

    /// `None` while unplaced (§4.2 post-condition: unplaceable batches stay unplaced).
    pub oven: Option<u32>,
    pub rack_position: Option<u32>,
    pub start_time: Option<u32>,

    pub status: BatchStatus,

    pub is_catering: bool,
    pub catering_order_id: Option<Uuid>,
}

impl Batch {
    pub fn new_unplaced(item_guid: impl Into<String>, quantity: u32, bake_time: u32, cool_time: u32) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            item_guid: item_guid.into(),
            quantity,
            bake_time,
            cool_time,
            oven: None,
            rack_position: None,
            start_time: None,
            status: BatchStatus::Scheduled,
            is_catering: false,
            catering_order_id: None,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.rack_position.is_some() && self.start_time.is_some()
    }

    /// `end_time = start_time + bake_time`, once placed.
    pub fn end_time(&self) -> Option<u32> {
        self.start_time.map(|s| s + self.bake_time)
    }

    /// `available_time = end_time + cool_time`, once placed.
    pub fn available_time(&self) -> Option<u32> {
        self.end_time().map(|e| e + self.cool_time)
    }

    /// Places (or re-places) this batch on `rack` starting at `start_time`,
    /// resolving its oven from the rack position.
    pub fn place(&mut self, rack: u32, start_time: u32, racks_per_oven: u32) {
        self.rack_position = Some(rack);
        self.start_time = Some(start_time);
        self.oven = Some(rack.div_ceil(racks_per_oven));
    }

    /// Half-open interval overlap test used by the rack allocator (§4.1).
    pub fn conflicts_with(&self, other: &Batch) -> bool {
        let (Some(a_rack), Some(b_rack)) = (self.rack_position, other.rack_position) else {
            return false;
        };
        if a_rack != b_rack {
            return false;
        }
        let (Some(a_start), Some(a_end), Some(b_start), Some(b_end)) =
            (self.start_time, self.end_time(), other.start_time, other.end_time())
        else {
            return false;
        };
        a_start < b_end && b_start < a_end
    }
}
