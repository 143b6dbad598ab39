pub mod cleaner;
pub mod pipeline;

pub use cleaner::{Cleaner, CleanedOrders, CleaningReport, DataIssue, IssueKind};
pub use pipeline::{OrderPipeline, PreparedOrders};
