use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::BatchId;

/// Append-only event kinds emitted by the simulation engine (§4.3, §7).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    BatchStarted { batch_id: BatchId },
    BatchPulled { batch_id: BatchId },
    BatchAvailable { batch_id: BatchId, quantity: u32 },
    OrderProcessed { order_id: Uuid, item_guid: String, quantity: u32 },
    OrderMissed { order_id: Uuid, item_guid: String, requested: u32, available: usize },
    Purchase { item_guid: String, quantity: u32 },
    BatchAdded { batch_id: BatchId },
    BatchMoved { batch_id: BatchId },
    BatchDeleted { batch_id: BatchId },
    BatchMoveError { batch_id: BatchId, reason: String },
    CateringCreated { order_id: Uuid },
    CateringApproved { order_id: Uuid },
    CateringRejected { order_id: Uuid },
    SimulationCompleted,
}

/// A timestamped, append-only log entry (§5: ordering guarantees).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: u32,
    pub kind: EventKind,
}
