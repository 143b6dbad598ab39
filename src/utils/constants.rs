/// Dataset column names
pub const COL_ORDER_ID: &str = "order_id";
pub const COL_CUSTOMER_ID: &str = "customer_id";
pub const COL_RESTAURANT_NAME: &str = "restaurant_name";
pub const COL_CUISINE_TYPE: &str = "cuisine_type";
pub const COL_COST: &str = "cost_of_the_order";
pub const COL_DAY_TYPE: &str = "day_of_the_week";
pub const COL_RATING: &str = "rating";
pub const COL_PREPARATION_TIME: &str = "food_preparation_time";
pub const COL_DELIVERY_TIME: &str = "delivery_time";

/// Rating text that means "no rating recorded"
pub const RATING_NOT_GIVEN: &[&str] = &["not given", "na", "n/a", "none", ""];
pub const NOT_GIVEN_LABEL: &str = "Not given";

/// Placeholder for rows with an empty restaurant or cuisine field
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Metric defaults
pub const DEFAULT_COMMISSION_RATE: f64 = 0.25;
pub const DEFAULT_PROMOTER_THRESHOLD: u32 = 4;
pub const DEFAULT_DETRACTOR_THRESHOLD: u32 = 2;
pub const DEFAULT_RESTAURANT_MIN_ORDERS: usize = 10;
pub const DEFAULT_RANKING_SIZE: usize = 5;

/// Tiered take rate: 25% above $20, 15% above $5
pub const UPPER_TIER_THRESHOLD: f64 = 20.0;
pub const UPPER_TIER_RATE: f64 = 0.25;
pub const LOWER_TIER_THRESHOLD: f64 = 5.0;
pub const LOWER_TIER_RATE: f64 = 0.15;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "FOODHUB";

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
