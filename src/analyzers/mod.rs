pub mod breakdown;
pub mod metrics_engine;
pub mod report;
pub mod stats;

pub use breakdown::{
    filtered_value_counts, grouped_stats, rank_restaurants, value_counts, CategoricalFeature,
    GroupStats, NumericFeature, RestaurantAverage, RestaurantRanking, ValueCount,
};
pub use metrics_engine::{
    BusinessMetrics, CompletionTimeStats, DeliveryTimeByDay, MetricsEngine, NpsBreakdown,
    PercentileValue, RetentionStats,
};
pub use report::{MetricRow, MetricsReport};
pub use stats::Summary;
