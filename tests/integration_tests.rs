use clap::Parser;
use foodhub_metrics::analyzers::{
    rank_restaurants, value_counts, CategoricalFeature, MetricsEngine, MetricsReport,
    NumericFeature,
};
use foodhub_metrics::cli::{run, Cli};
use foodhub_metrics::config::{CommissionPolicy, MetricsConfig};
use foodhub_metrics::processors::OrderPipeline;
use foodhub_metrics::writers::ParquetWriter;
use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

const ORDERS_CSV: &str = "\
order_id,customer_id,restaurant_name,cuisine_type,cost_of_the_order,day_of_the_week,rating,food_preparation_time,delivery_time
1,100,Shake Shack,American,10.0,Weekday,5,25,20
2,100, shake  shack ,American,20.0,Weekend,4,30,25
3,200,Hangawi,Korean,30.0,Weekday,2,20,30
4,300,HANGAWI,Korean,,Weekend,5,22,28
5,400,Cafe Habana,Mexican,,Weekday,Not given,25,30
1,500,Duplicate Diner,Thai,50.0,Weekday,5,20,20
,600,No Id Noodles,Thai,10.0,Weekday,5,20,20
";

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp file");
    file
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("expected a defined value");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[tokio::test]
async fn test_pipeline_to_metrics() {
    let csv = write_csv(ORDERS_CSV);
    let prepared = OrderPipeline::new()
        .prepare(csv.path(), None)
        .await
        .unwrap();

    assert_eq!(prepared.load_report.total_rows, 7);
    assert_eq!(prepared.load_report.excluded_rows(), 1);
    assert_eq!(prepared.cleaning_report.duplicates_excluded, 1);
    assert_eq!(prepared.table.len(), 5);

    let restaurants: Vec<&str> = prepared
        .table
        .iter()
        .map(|o| o.restaurant_name.as_str())
        .collect();
    assert_eq!(
        restaurants,
        vec!["Shake Shack", "Shake Shack", "Hangawi", "Hangawi", "Cafe Habana"]
    );

    let metrics = MetricsEngine::default().compute(&prepared.table);

    assert_eq!(metrics.order_volume, 5);
    assert_eq!(metrics.costed_orders, 3);
    assert!((metrics.gmv - 60.0).abs() < 1e-9);
    assert!((metrics.total_revenue - 15.0).abs() < 1e-9);
    assert_close(metrics.average_order_value, 20.0);
    assert_close(metrics.profit_margin, 1.0);

    assert_eq!(metrics.nps.rated_orders, 4);
    assert_eq!(metrics.nps.promoters, 3);
    assert_eq!(metrics.nps.detractors, 1);
    assert_close(metrics.nps.score, 50.0);
    assert_close(metrics.rating_participation_rate, 0.8);

    assert_eq!(metrics.retention.distinct_customers, 4);
    assert_eq!(metrics.retention.returning_customers, 1);
    assert_close(metrics.retention.rate, 0.25);

    let completion = metrics.completion_time.summary.as_ref().unwrap();
    assert_eq!(completion.count, 5);
    assert!((completion.mean - 51.0).abs() < 1e-9);

    assert_close(
        metrics.delivery_time.weekend_to_weekday_ratio,
        26.5 / (80.0 / 3.0),
    );
}

#[tokio::test]
async fn test_tiered_commission_with_operating_costs() {
    let csv = write_csv(ORDERS_CSV);
    let prepared = OrderPipeline::new()
        .prepare(csv.path(), None)
        .await
        .unwrap();

    let config = MetricsConfig::default()
        .with_commission(CommissionPolicy::standard_tiers())
        .with_operating_costs(5.0);
    let metrics = MetricsEngine::new(config).compute(&prepared.table);

    // 10 -> 15%, 20 -> 15%, 30 -> 25%
    assert!((metrics.total_revenue - 12.0).abs() < 1e-9);
    assert!((metrics.net_revenue - 7.0).abs() < 1e-9);
    assert_close(metrics.profit_margin, 7.0 / 12.0);
}

#[test]
fn test_header_only_input_gives_undefined_ratios() {
    let csv = write_csv(
        "order_id,customer_id,restaurant_name,cuisine_type,cost_of_the_order,day_of_the_week,rating,food_preparation_time,delivery_time\n",
    );
    let prepared = OrderPipeline::new().prepare_blocking(csv.path()).unwrap();
    assert!(prepared.table.is_empty());

    let metrics = MetricsEngine::default().compute(&prepared.table);
    assert_eq!(metrics.order_volume, 0);
    assert_eq!(metrics.average_order_value, None);
    assert_eq!(metrics.profit_margin, None);
    assert_eq!(metrics.nps.score, None);
    assert_eq!(metrics.retention.rate, None);
    assert_eq!(metrics.rating_participation_rate, None);

    let report = MetricsReport::from_metrics(&metrics);
    assert_eq!(
        report.get("Average Order Value").unwrap().formatted_value(),
        "undefined"
    );
}

#[test]
fn test_breakdowns_over_cleaned_orders() {
    let csv = write_csv(ORDERS_CSV);
    let prepared = OrderPipeline::new().prepare_blocking(csv.path()).unwrap();

    let cuisines = value_counts(&prepared.table, CategoricalFeature::Cuisine, None);
    assert_eq!(cuisines[0].value, "American");
    assert_eq!(cuisines[0].count, 2);
    assert_eq!(cuisines[1].value, "Korean");
    assert_eq!(cuisines[2].value, "Mexican");

    let ratings = value_counts(&prepared.table, CategoricalFeature::Rating, None);
    assert!(ratings.iter().any(|c| c.value == "Not given" && c.count == 1));

    let ranking = rank_restaurants(&prepared.table, NumericFeature::DeliveryTime, 1, 5);
    let ranked: Vec<&str> = ranking
        .top
        .iter()
        .map(|r| r.restaurant_name.as_str())
        .collect();
    assert_eq!(ranked, vec!["Shake Shack", "Hangawi"]);
}

#[tokio::test]
async fn test_clean_command_writes_parquet() {
    let csv = write_csv(ORDERS_CSV);
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let output = temp_dir.path().join("nested").join("orders.parquet");

    let cli = Cli::try_parse_from([
        "foodhub-metrics",
        "clean",
        "-i",
        path_str(csv.path()),
        "-o",
        path_str(&output),
        "--compression",
        "zstd",
    ])
    .unwrap();
    run(cli).await.unwrap();

    assert!(output.exists());

    let writer = ParquetWriter::new();
    let info = writer.get_file_info(&output).unwrap();
    assert_eq!(info.total_rows, 5);

    let table = writer.read_orders(&output).unwrap();
    let hangawi = table
        .iter()
        .find(|o| o.order_id == 4)
        .expect("order 4 should survive cleaning");
    assert_eq!(hangawi.restaurant_name, "Hangawi");
    assert_eq!(hangawi.cost, None);
    assert_eq!(hangawi.completion_time, Some(50.0));
}

#[tokio::test]
async fn test_report_command_with_config_file() {
    let csv = write_csv(ORDERS_CSV);
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "operating_costs = 2.5\ncompletion_percentiles = [50.0, 90.0]").unwrap();

    let cli = Cli::try_parse_from([
        "foodhub-metrics",
        "report",
        "-i",
        path_str(csv.path()),
        "-c",
        path_str(config.path()),
        "--format",
        "json",
    ])
    .unwrap();

    assert!(run(cli).await.is_ok());
}

#[tokio::test]
async fn test_missing_input_is_an_error() {
    let cli = Cli::try_parse_from([
        "foodhub-metrics",
        "validate",
        "-i",
        "/nonexistent/orders.csv",
    ])
    .unwrap();

    assert!(run(cli).await.is_err());
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are valid UTF-8")
}
