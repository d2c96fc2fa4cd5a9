pub mod batch;
pub mod catering;
pub mod config;
pub mod error;
pub mod event;
pub mod inventory;
pub mod order;
pub mod schedule;
pub mod simulation_state;
pub mod snapshot;
pub mod spec;
pub mod time;

pub use batch::{Batch, BatchId, BatchStatus};
pub use catering::{CateringItem, CateringOrder, CateringOrderId, CateringStatus, MovedBatch};
pub use config::{AppConfig, BusinessHours, OvenConfig, SuggestionConfig};
pub use error::{CoreError, CoreErrorKind, CoreResult};
pub use event::{Event, EventKind};
pub use inventory::{Inventory, InventoryList, InventoryUnit};
pub use order::{order_key, MissedOrder, PresetOrder, ProcessedAggregate};
pub use schedule::{Schedule, UnplacedItem};
pub use simulation_state::{
    ForecastInterval, SimMode, SimStatus, SimulationId, SimulationState, Stats,
};
pub use snapshot::{ParConfig, Snapshot};
pub use spec::{BakeSpec, Oven};
pub use time::{hhmm_to_minutes, minutes_to_hhmm, quantize_tenth, round_to_grid_ceil, round_to_grid_nearest};
