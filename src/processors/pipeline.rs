use crate::error::Result;
use crate::models::OrderTable;
use crate::processors::{Cleaner, CleaningReport};
use crate::readers::{LoadReport, OrderReader};
use crate::utils::progress::ProgressReporter;
use std::path::{Path, PathBuf};
use tracing::info;

/// The cleaned table together with what loading and cleaning did to get there.
#[derive(Debug, Clone)]
pub struct PreparedOrders {
    pub table: OrderTable,
    pub load_report: LoadReport,
    pub cleaning_report: CleaningReport,
}

/// Load then clean, off the async runtime.
pub struct OrderPipeline {
    use_mmap: bool,
}

impl OrderPipeline {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub async fn prepare(
        &self,
        input: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<PreparedOrders> {
        if let Some(p) = progress {
            p.set_message("Reading orders...");
        }

        let use_mmap = self.use_mmap;
        let path: PathBuf = input.to_path_buf();
        let loaded =
            tokio::task::spawn_blocking(move || OrderReader::with_mmap(use_mmap).read_orders(&path))
                .await??;

        if let Some(p) = progress {
            p.set_message("Cleaning orders...");
        }

        let load_report = loaded.report;
        let cleaned =
            tokio::task::spawn_blocking(move || Cleaner::new().clean(loaded.records)).await?;

        info!(
            "Prepared {} orders from {} rows",
            cleaned.table.len(),
            load_report.total_rows
        );

        Ok(PreparedOrders {
            table: cleaned.table,
            load_report,
            cleaning_report: cleaned.report,
        })
    }

    /// Synchronous variant for callers without a runtime.
    pub fn prepare_blocking(&self, input: &Path) -> Result<PreparedOrders> {
        let loaded = OrderReader::with_mmap(self.use_mmap).read_orders(input)?;
        let cleaned = Cleaner::new().clean(loaded.records);

        Ok(PreparedOrders {
            table: cleaned.table,
            load_report: loaded.report,
            cleaning_report: cleaned.report,
        })
    }
}

impl Default for OrderPipeline {
    fn default() -> Self {
        Self::new()
    }
}
