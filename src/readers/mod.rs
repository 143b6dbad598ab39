pub mod order_reader;

pub use order_reader::{ExcludedRow, FieldWarning, LoadReport, LoadedOrders, OrderReader};
