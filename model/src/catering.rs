use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::BatchId;

pub type CateringOrderId = Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CateringStatus {
    Pending,
    Approved,
    Rejected,
}

/// One item line of a catering order request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CateringItem {
    pub item_guid: String,
    pub quantity: u32,
}

/// Snapshot of where a displaced batch used to live, so a rejection can put
/// it back exactly (§4.5 step 7).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovedBatch {
    pub batch_id: BatchId,
    pub old_rack: u32,
    pub old_start_time: u32,
}

/// A multi-item promise with a required availability time, allocated
/// atomically and possibly by moving existing batches (§3, §4.5).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CateringOrder {
    pub order_id: CateringOrderId,
    pub items: Vec<CateringItem>,
    pub required_available_time: u32,
    pub order_placed_at: u32,
    pub status: CateringStatus,
    pub created_batches: Vec<BatchId>,
    pub moved_batches: Vec<MovedBatch>,
}
