pub mod constants;
pub mod filename;
pub mod progress;
pub mod text;

pub use constants::*;
pub use filename::generate_default_parquet_filename;
pub use progress::ProgressReporter;
pub use text::{canonical_key, collapse_whitespace, round2, title_case};
