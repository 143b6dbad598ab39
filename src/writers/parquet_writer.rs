use crate::error::{ProcessingError, Result};
use crate::models::{DayType, Order, OrderTable};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write the cleaned order table, one row group per `row_group_size` orders.
    pub fn write_orders(&self, table: &OrderTable, path: &Path) -> Result<()> {
        let schema = self.create_schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        for chunk in table.orders().chunks(self.row_group_size.max(1)) {
            let batch = self.orders_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }

        writer.close()?;
        info!("Wrote {} orders to {}", table.len(), path.display());
        Ok(())
    }

    /// Arrow schema for cleaned orders; absent values are nulls
    fn create_schema(&self) -> Arc<Schema> {
        let fields = vec![
            Field::new("order_id", DataType::UInt64, false),
            Field::new("customer_id", DataType::UInt64, false),
            Field::new("restaurant_name", DataType::Utf8, false),
            Field::new("cuisine_type", DataType::Utf8, false),
            Field::new("cost_of_the_order", DataType::Float64, true),
            Field::new("day_of_the_week", DataType::Utf8, true),
            Field::new("rating", DataType::UInt32, true),
            Field::new("rating_present", DataType::Boolean, false),
            Field::new("food_preparation_time", DataType::Float64, true),
            Field::new("delivery_time", DataType::Float64, true),
            Field::new("order_completion_time", DataType::Float64, true),
        ];

        Arc::new(Schema::new(fields))
    }

    fn orders_to_batch(&self, orders: &[Order], schema: Arc<Schema>) -> Result<RecordBatch> {
        let order_ids: Vec<u64> = orders.iter().map(|o| o.order_id).collect();
        let customer_ids: Vec<u64> = orders.iter().map(|o| o.customer_id).collect();
        let restaurants: Vec<&str> = orders.iter().map(|o| o.restaurant_name.as_str()).collect();
        let cuisines: Vec<&str> = orders.iter().map(|o| o.cuisine_type.as_str()).collect();
        let costs: Vec<Option<f64>> = orders.iter().map(|o| o.cost).collect();
        let day_types: Vec<Option<&str>> = orders
            .iter()
            .map(|o| o.day_type.map(|d| d.as_str()))
            .collect();
        let ratings: Vec<Option<u32>> = orders.iter().map(|o| o.rating).collect();
        let rating_present: Vec<bool> = orders.iter().map(|o| o.rating_present()).collect();
        let preparation: Vec<Option<f64>> = orders.iter().map(|o| o.preparation_time).collect();
        let delivery: Vec<Option<f64>> = orders.iter().map(|o| o.delivery_time).collect();
        let completion: Vec<Option<f64>> = orders.iter().map(|o| o.completion_time).collect();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(UInt64Array::from(order_ids)),
            Arc::new(UInt64Array::from(customer_ids)),
            Arc::new(StringArray::from(restaurants)),
            Arc::new(StringArray::from(cuisines)),
            Arc::new(Float64Array::from(costs)),
            Arc::new(StringArray::from(day_types)),
            Arc::new(UInt32Array::from(ratings)),
            Arc::new(BooleanArray::from(rating_present)),
            Arc::new(Float64Array::from(preparation)),
            Arc::new(Float64Array::from(delivery)),
            Arc::new(Float64Array::from(completion)),
        ];

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Read a table previously written by `write_orders`.
    pub fn read_orders(&self, path: &Path) -> Result<OrderTable> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut orders = Vec::new();
        for batch_result in reader {
            let batch = batch_result?;

            let order_ids = column::<UInt64Array>(&batch, "order_id")?;
            let customer_ids = column::<UInt64Array>(&batch, "customer_id")?;
            let restaurants = column::<StringArray>(&batch, "restaurant_name")?;
            let cuisines = column::<StringArray>(&batch, "cuisine_type")?;
            let costs = column::<Float64Array>(&batch, "cost_of_the_order")?;
            let day_types = column::<StringArray>(&batch, "day_of_the_week")?;
            let ratings = column::<UInt32Array>(&batch, "rating")?;
            let preparation = column::<Float64Array>(&batch, "food_preparation_time")?;
            let delivery = column::<Float64Array>(&batch, "delivery_time")?;
            let completion = column::<Float64Array>(&batch, "order_completion_time")?;

            for i in 0..batch.num_rows() {
                orders.push(Order {
                    order_id: order_ids.value(i),
                    customer_id: customer_ids.value(i),
                    restaurant_name: restaurants.value(i).to_string(),
                    cuisine_type: cuisines.value(i).to_string(),
                    cost: optional(costs, i),
                    day_type: if day_types.is_null(i) {
                        None
                    } else {
                        DayType::parse(day_types.value(i))
                    },
                    rating: if ratings.is_null(i) {
                        None
                    } else {
                        Some(ratings.value(i))
                    },
                    preparation_time: optional(preparation, i),
                    delivery_time: optional(delivery, i),
                    completion_time: optional(completion, i),
                });
            }
        }

        Ok(OrderTable::new(orders))
    }

    /// Get file metadata and statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression: self.compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn column<'b, T: 'static>(batch: &'b RecordBatch, name: &str) -> Result<&'b T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid or missing {} column", name)))
}

fn optional(array: &Float64Array, i: usize) -> Option<f64> {
    if array.is_null(i) {
        None
    } else {
        Some(array.value(i))
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };

        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            avg_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::fixtures::order;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn sample_table() -> OrderTable {
        let mut unrated = order(2, 7, "Hangawi");
        unrated.cost = None;
        unrated.day_type = None;
        unrated.delivery_time = None;
        unrated.completion_time = None;

        let mut rated = order(1, 7, "Shake Shack");
        rated.rating = Some(4);

        OrderTable::new(vec![rated, unrated])
    }

    #[test]
    fn test_write_empty_table() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;

        writer.write_orders(&OrderTable::default(), temp_file.path())?;
        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 0);
        Ok(())
    }

    #[test]
    fn test_write_preserves_missing_values() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;
        let table = sample_table();

        writer.write_orders(&table, temp_file.path())?;
        let read_back = writer.read_orders(temp_file.path())?;

        assert_eq!(read_back, table);
        Ok(())
    }

    #[test]
    fn test_row_groups_follow_configured_size() -> Result<()> {
        let writer = ParquetWriter::new().with_row_group_size(1);
        let temp_file = NamedTempFile::new()?;

        writer.write_orders(&sample_table(), temp_file.path())?;
        let info = writer.get_file_info(temp_file.path())?;

        assert_eq!(info.total_rows, 2);
        assert_eq!(info.row_groups, 2);
        assert_eq!(info.row_group_sizes, vec![1, 1]);
        assert!(info.summary().contains("Total rows: 2"));
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let compressions = ["snappy", "gzip", "lz4", "zstd", "none"];

        for compression in &compressions {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;

            let result = writer.write_orders(&sample_table(), temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli-9000").is_err());
        Ok(())
    }
}
