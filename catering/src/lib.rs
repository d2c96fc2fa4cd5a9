pub mod allocator;

pub use allocator::{approve_catering_order, create_catering_order, reject_catering_order};
