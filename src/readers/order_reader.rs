use crate::error::{ProcessingError, Result};
use crate::models::{DayType, OrderRecord};
use crate::utils::constants::{
    COL_COST, COL_CUISINE_TYPE, COL_CUSTOMER_ID, COL_DAY_TYPE, COL_DELIVERY_TIME, COL_ORDER_ID,
    COL_PREPARATION_TIME, COL_RATING, COL_RESTAURANT_NAME, DEFAULT_BUFFER_SIZE, RATING_NOT_GIVEN,
};
use csv::{ReaderBuilder, StringRecord, Trim};
use encoding_rs::{UTF_8, WINDOWS_1252};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// A row dropped during loading.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedRow {
    pub line: u64,
    pub reason: String,
}

/// A field that could not be parsed and was treated as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWarning {
    pub line: u64,
    pub column: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub excluded: Vec<ExcludedRow>,
    pub field_warnings: Vec<FieldWarning>,
    pub encoding: String,
}

impl LoadReport {
    pub fn excluded_rows(&self) -> usize {
        self.excluded.len()
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Load Report ===\n");
        summary.push_str(&format!("Encoding: {}\n", self.encoding));
        summary.push_str(&format!("Total Rows: {}\n", self.total_rows));
        summary.push_str(&format!("Loaded Rows: {}\n", self.loaded_rows));
        summary.push_str(&format!("Excluded Rows: {}\n", self.excluded.len()));
        summary.push_str(&format!(
            "Unparseable Fields: {}\n",
            self.field_warnings.len()
        ));

        if !self.excluded.is_empty() {
            summary.push_str("\nFirst 10 Exclusions:\n");
            for (i, row) in self.excluded.iter().take(10).enumerate() {
                summary.push_str(&format!("  {}. Line {}: {}\n", i + 1, row.line, row.reason));
            }
        }

        summary
    }
}

#[derive(Debug, Clone)]
pub struct LoadedOrders {
    pub records: Vec<OrderRecord>,
    pub report: LoadReport,
}

/// Positions of the known columns in the header row.
#[derive(Debug, Default)]
struct ColumnIndex {
    order_id: Option<usize>,
    customer_id: Option<usize>,
    restaurant_name: Option<usize>,
    cuisine_type: Option<usize>,
    cost: Option<usize>,
    day_type: Option<usize>,
    rating: Option<usize>,
    preparation_time: Option<usize>,
    delivery_time: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let mut index = ColumnIndex::default();

        for (i, header) in headers.iter().enumerate() {
            let slot = match header.trim().to_lowercase().as_str() {
                COL_ORDER_ID => &mut index.order_id,
                COL_CUSTOMER_ID => &mut index.customer_id,
                COL_RESTAURANT_NAME | "restaurant" => &mut index.restaurant_name,
                COL_CUISINE_TYPE | "cuisine" => &mut index.cuisine_type,
                COL_COST | "cost" => &mut index.cost,
                COL_DAY_TYPE | "day_type" => &mut index.day_type,
                COL_RATING => &mut index.rating,
                COL_PREPARATION_TIME | "preparation_time" => &mut index.preparation_time,
                COL_DELIVERY_TIME => &mut index.delivery_time,
                other => {
                    debug!("Ignoring unknown column '{}'", other);
                    continue;
                }
            };
            if slot.is_none() {
                *slot = Some(i);
            }
        }

        if index.order_id.is_none() {
            return Err(ProcessingError::MissingColumn(COL_ORDER_ID.to_string()));
        }
        if index.customer_id.is_none() {
            return Err(ProcessingError::MissingColumn(COL_CUSTOMER_ID.to_string()));
        }

        Ok(index)
    }
}

pub struct OrderReader {
    use_mmap: bool,
}

impl OrderReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    /// Read and parse the order dataset at `path`.
    ///
    /// A missing or unreadable file is an error; malformed rows are not.
    pub fn read_orders(&self, path: &Path) -> Result<LoadedOrders> {
        info!("Reading orders from {}", path.display());

        let file = File::open(path)?;
        let (text, encoding) = if self.use_mmap {
            let mmap = unsafe { Mmap::map(&file)? };
            decode_bytes(&mmap)
        } else {
            let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            decode_bytes(&bytes)
        };

        let mut loaded = self.read_orders_from_str(&text)?;
        loaded.report.encoding = encoding.to_string();
        Ok(loaded)
    }

    /// Parse already-decoded CSV text.
    pub fn read_orders_from_str(&self, text: &str) -> Result<LoadedOrders> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let columns = ColumnIndex::from_headers(reader.headers()?)?;

        let mut records = Vec::new();
        let mut report = LoadReport {
            encoding: UTF_8.name().to_string(),
            ..LoadReport::default()
        };

        for result in reader.records() {
            report.total_rows += 1;

            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    let line = e.position().map_or(0, |p| p.line());
                    warn!("Excluding line {}: {}", line, e);
                    report.excluded.push(ExcludedRow {
                        line,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let line = row.position().map_or(0, |p| p.line());
            match parse_row(&row, line, &columns, &mut report.field_warnings) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    debug!("Excluding line {}: {}", line, reason);
                    report.excluded.push(ExcludedRow { line, reason });
                }
            }
        }

        report.loaded_rows = records.len();

        if !report.excluded.is_empty() {
            warn!(
                "Excluded {} of {} rows with missing or malformed identifiers",
                report.excluded.len(),
                report.total_rows
            );
        }
        info!("Loaded {} order records", records.len());

        Ok(LoadedOrders { records, report })
    }
}

impl Default for OrderReader {
    fn default() -> Self {
        Self::new()
    }
}

/// UTF-8 (BOM aware), falling back to Windows-1252 when the bytes are not valid UTF-8.
fn decode_bytes(bytes: &[u8]) -> (String, &'static str) {
    let (text, encoding, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return (text.into_owned(), encoding.name());
    }

    warn!("Input is not valid UTF-8, decoding as {}", WINDOWS_1252.name());
    let (text, encoding, _) = WINDOWS_1252.decode(bytes);
    (text.into_owned(), encoding.name())
}

fn field<'r>(row: &'r StringRecord, index: Option<usize>) -> &'r str {
    index.and_then(|i| row.get(i)).unwrap_or("")
}

fn parse_row(
    row: &StringRecord,
    line: u64,
    columns: &ColumnIndex,
    warnings: &mut Vec<FieldWarning>,
) -> std::result::Result<OrderRecord, String> {
    let order_id = parse_id(field(row, columns.order_id), COL_ORDER_ID)?;
    let customer_id = parse_id(field(row, columns.customer_id), COL_CUSTOMER_ID)?;

    let mut warn_field = |column: &'static str, value: &str| {
        warnings.push(FieldWarning {
            line,
            column,
            value: value.to_string(),
        });
    };

    let cost = parse_optional(field(row, columns.cost), COL_COST, parse_number, &mut warn_field);
    let preparation_time = parse_optional(
        field(row, columns.preparation_time),
        COL_PREPARATION_TIME,
        parse_number,
        &mut warn_field,
    );
    let delivery_time = parse_optional(
        field(row, columns.delivery_time),
        COL_DELIVERY_TIME,
        parse_number,
        &mut warn_field,
    );
    let day_type = parse_optional(
        field(row, columns.day_type),
        COL_DAY_TYPE,
        DayType::parse,
        &mut warn_field,
    );

    let rating_text = field(row, columns.rating);
    let rating = if RATING_NOT_GIVEN.contains(&rating_text.to_lowercase().as_str()) {
        None
    } else {
        parse_optional(rating_text, COL_RATING, parse_whole::<u32>, &mut warn_field)
    };

    Ok(OrderRecord {
        line,
        order_id,
        customer_id,
        restaurant_name: field(row, columns.restaurant_name).to_string(),
        cuisine_type: field(row, columns.cuisine_type).to_string(),
        cost,
        day_type,
        rating,
        preparation_time,
        delivery_time,
    })
}

fn parse_id(value: &str, column: &str) -> std::result::Result<u64, String> {
    if value.is_empty() {
        return Err(format!("missing {}", column));
    }
    parse_whole(value).ok_or_else(|| format!("invalid {} '{}'", column, value))
}

/// Empty means absent; anything else that fails to parse is absent and reported.
fn parse_optional<T, P, W>(value: &str, column: &'static str, parse: P, warn_field: &mut W) -> Option<T>
where
    P: Fn(&str) -> Option<T>,
    W: FnMut(&'static str, &str),
{
    if value.is_empty() {
        return None;
    }
    let parsed = parse(value);
    if parsed.is_none() {
        warn_field(column, value);
    }
    parsed
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Non-negative integers, also accepting integral floats such as "4.0".
fn parse_whole<T: TryFrom<u64>>(value: &str) -> Option<T> {
    let whole = match value.parse::<u64>() {
        Ok(v) => v,
        Err(_) => {
            let f = parse_number(value)?;
            if f < 0.0 || f.fract() != 0.0 || f > u64::MAX as f64 {
                return None;
            }
            f as u64
        }
    };
    T::try_from(whole).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "order_id,customer_id,restaurant_name,cuisine_type,cost_of_the_order,day_of_the_week,rating,food_preparation_time,delivery_time";

    #[test]
    fn test_parse_well_formed_rows() -> Result<()> {
        let text = format!(
            "{}\n1477147,337525,Hangawi,Korean,30.75,Weekend,Not given,25,20\n1477685,358141,Blue Ribbon Sushi Izakaya,Japanese,12.08,Weekend,5,25,23\n",
            HEADER
        );

        let loaded = OrderReader::new().read_orders_from_str(&text)?;
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.report.excluded_rows(), 0);

        let first = &loaded.records[0];
        assert_eq!(first.order_id, 1477147);
        assert_eq!(first.customer_id, 337525);
        assert_eq!(first.restaurant_name, "Hangawi");
        assert_eq!(first.cost, Some(30.75));
        assert_eq!(first.day_type, Some(DayType::Weekend));
        assert_eq!(first.rating, None);
        assert_eq!(first.line, 2);

        assert_eq!(loaded.records[1].rating, Some(5));
        Ok(())
    }

    #[test]
    fn test_rows_without_identifiers_are_excluded() -> Result<()> {
        let text = format!(
            "{}\n,337525,Hangawi,Korean,30.75,Weekend,3,25,20\n1477686,abc,Hangawi,Korean,10.0,Weekday,4,25,20\n1477687,1,Hangawi,Korean,10.0,Weekday,4,25,20\n",
            HEADER
        );

        let loaded = OrderReader::new().read_orders_from_str(&text)?;
        assert_eq!(loaded.report.total_rows, 3);
        assert_eq!(loaded.report.loaded_rows, 1);
        assert_eq!(
            loaded.report.excluded,
            vec![
                ExcludedRow {
                    line: 2,
                    reason: "missing order_id".to_string()
                },
                ExcludedRow {
                    line: 3,
                    reason: "invalid customer_id 'abc'".to_string()
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_unparseable_fields_become_absent() -> Result<()> {
        let text = format!(
            "{}\n1,2,Hangawi,Korean,lots,Someday,excellent,NaN,\n",
            HEADER
        );

        let loaded = OrderReader::new().read_orders_from_str(&text)?;
        let record = &loaded.records[0];
        assert_eq!(record.cost, None);
        assert_eq!(record.day_type, None);
        assert_eq!(record.rating, None);
        assert_eq!(record.preparation_time, None);
        assert_eq!(record.delivery_time, None);

        let columns: Vec<&str> = loaded.report.field_warnings.iter().map(|w| w.column).collect();
        assert_eq!(
            columns,
            vec![COL_COST, COL_PREPARATION_TIME, COL_DAY_TYPE, COL_RATING]
        );
        Ok(())
    }

    #[test]
    fn test_aliases_and_column_order() -> Result<()> {
        let text = "cost,order_id,day_type,customer_id,rating\n12.5,9,weekday,3,4.0\n";
        let loaded = OrderReader::new().read_orders_from_str(text)?;
        let record = &loaded.records[0];
        assert_eq!(record.order_id, 9);
        assert_eq!(record.customer_id, 3);
        assert_eq!(record.cost, Some(12.5));
        assert_eq!(record.rating, Some(4));
        assert_eq!(record.restaurant_name, "");
        Ok(())
    }

    #[test]
    fn test_missing_identifier_column_is_fatal() {
        let text = "order_id,restaurant_name\n1,Hangawi\n";
        let result = OrderReader::new().read_orders_from_str(text);
        assert!(matches!(result, Err(ProcessingError::MissingColumn(c)) if c == COL_CUSTOMER_ID));
    }

    #[test]
    fn test_read_file_with_bom_and_mmap() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        temp_file.write_all(b"\xEF\xBB\xBF")?;
        writeln!(temp_file, "{}", HEADER)?;
        writeln!(temp_file, "1,2,Hangawi,Korean,30.75,Weekend,4,25,20")?;
        temp_file.flush()?;

        for use_mmap in [false, true] {
            let loaded = OrderReader::with_mmap(use_mmap).read_orders(temp_file.path())?;
            assert_eq!(loaded.records.len(), 1);
            assert_eq!(loaded.records[0].order_id, 1);
            assert_eq!(loaded.report.encoding, "UTF-8");
        }
        Ok(())
    }

    #[test]
    fn test_windows_1252_fallback() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "{}", HEADER)?;
        temp_file.write_all(b"1,2,Caf\xE9 Habana,Mexican,12.0,Weekday,4,25,20\n")?;
        temp_file.flush()?;

        let loaded = OrderReader::new().read_orders(temp_file.path())?;
        assert_eq!(loaded.records[0].restaurant_name, "Café Habana");
        assert_eq!(loaded.report.encoding, "windows-1252");
        Ok(())
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = OrderReader::new().read_orders(Path::new("no/such/orders.csv"));
        assert!(matches!(result, Err(ProcessingError::Io(_))));
    }
}
