pub mod driver;
pub mod handle;
pub mod mutations;
pub mod registry;
pub mod tick;

pub use handle::SimulationHandle;
pub use registry::SimulationRegistry;
pub use model::Snapshot;
