pub mod order;

pub use order::{DayType, Order, OrderRecord, OrderTable};
