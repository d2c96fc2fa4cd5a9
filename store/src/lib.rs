pub mod clock;
pub mod forecast_svc;
pub mod order_store;
pub mod schedule_store;
pub mod spec_store;
pub mod sqlite_schedule_store;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use forecast_svc::{ForecastSvc, StaticForecastSvc};
pub use order_store::{InMemoryOrderStore, OrderStore};
pub use schedule_store::{InMemoryScheduleStore, ScheduleStore};
pub use spec_store::{SpecStore, StaticSpecStore};
pub use sqlite_schedule_store::SqliteScheduleStore;
pub use transport::{LoggingTransport, Transport};
