use crate::analyzers::{
    filtered_value_counts, grouped_stats, rank_restaurants, value_counts, CategoricalFeature,
    GroupStats, MetricsEngine, MetricsReport, NumericFeature, RestaurantRanking, ValueCount,
};
use crate::cli::args::{Cli, Commands, OutputFormat};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::processors::{OrderPipeline, PreparedOrders};
use crate::utils::filename::generate_default_parquet_filename;
use crate::utils::progress::ProgressReporter;
use crate::utils::text::title_case;
use crate::writers::ParquetWriter;
use serde_json::json;
use std::path::Path;
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    let pipeline = OrderPipeline::new().with_mmap(cli.mmap);

    match cli.command {
        Commands::Report {
            input,
            config,
            format,
            top,
        } => {
            let config = MetricsConfig::load(config.as_deref())?;
            let min_orders = config.restaurant_min_orders;
            let quiet = format == OutputFormat::Json;

            let prepared = prepare(&pipeline, &input, quiet).await?;

            let engine = MetricsEngine::new(config);
            let metrics = engine.compute(&prepared.table);
            let report = MetricsReport::from_metrics(&metrics);

            let cuisines = value_counts(&prepared.table, CategoricalFeature::Cuisine, Some(top));
            let day_types = value_counts(&prepared.table, CategoricalFeature::DayType, None);
            let ranking = rank_restaurants(
                &prepared.table,
                NumericFeature::CompletionTime,
                min_orders,
                top,
            );

            match format {
                OutputFormat::Json => {
                    let output = json!({
                        "input": input.display().to_string(),
                        "excluded_rows": prepared.load_report.excluded_rows(),
                        "duplicates_excluded": prepared.cleaning_report.duplicates_excluded,
                        "data_issues": prepared.cleaning_report.issues.len(),
                        "metrics": metrics,
                        "table": report.rows,
                        "cuisine_counts": cuisines,
                        "day_type_counts": day_types,
                        "completion_time_ranking": ranking,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!("Input file: {}", input.display());
                    println!("\n{}", prepared.load_report.generate_summary());
                    println!("{}", prepared.cleaning_report.generate_summary());
                    println!("{}", report.summary());

                    if let Some(summary) = &metrics.completion_time.summary {
                        println!("Order Completion Time: {}\n", summary.describe());
                    }

                    print_value_counts(CategoricalFeature::Cuisine, &cuisines);
                    print_value_counts(CategoricalFeature::DayType, &day_types);
                    print_ranking(&ranking, min_orders);
                }
            }
        }

        Commands::Validate { input } => {
            println!("Validating order data...");
            println!("Input file: {}", input.display());

            let prepared = prepare(&pipeline, &input, false).await?;

            println!("\n{}", prepared.load_report.generate_summary());
            println!("{}", prepared.cleaning_report.generate_summary());

            let problems =
                prepared.load_report.excluded_rows() + prepared.cleaning_report.issues.len();
            if problems == 0 {
                println!("✅ All rows passed validation checks");
            } else {
                println!("⚠️  Found {} data-quality issues", problems);
            }
        }

        Commands::Clean {
            input,
            output_file,
            compression,
        } => {
            let output_file = output_file.unwrap_or_else(generate_default_parquet_filename);
            let writer = ParquetWriter::new().with_compression(&compression)?;

            println!("Cleaning order data...");
            println!("Input file: {}", input.display());
            println!("Output file: {}", output_file.display());

            let prepared = prepare(&pipeline, &input, false).await?;
            println!("\n{}", prepared.cleaning_report.generate_summary());

            if let Some(parent) = output_file.parent() {
                std::fs::create_dir_all(parent)?;
            }

            println!("Writing {} orders to Parquet file...", prepared.table.len());
            writer.write_orders(&prepared.table, &output_file)?;

            let file_info = writer.get_file_info(&output_file)?;
            println!("\n{}", file_info.summary());
            println!("Cleaning complete!");
        }

        Commands::Breakdown {
            input,
            feature,
            filter_day,
            stats_of,
            top,
            format,
        } => {
            let quiet = format == OutputFormat::Json;
            let prepared = prepare(&pipeline, &input, quiet).await?;

            let (table, mut counts) = match filter_day {
                Some(day) => (
                    prepared.table.filter(|o| o.day_type == Some(day)),
                    filtered_value_counts(
                        &prepared.table,
                        feature,
                        CategoricalFeature::DayType,
                        day.as_str(),
                    ),
                ),
                None => {
                    let counts = value_counts(&prepared.table, feature, None);
                    (prepared.table, counts)
                }
            };
            if let Some(n) = top {
                counts.truncate(n);
            }

            let stats = stats_of.map(|numeric| grouped_stats(&table, feature, numeric));

            match format {
                OutputFormat::Json => {
                    let output = json!({
                        "feature": feature.column(),
                        "filter_day": filter_day.map(|d| d.as_str()),
                        "counts": counts,
                        "stats_of": stats_of.map(|n| n.column()),
                        "grouped_stats": stats,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    if let Some(day) = filter_day {
                        println!("Orders on {}s only", day);
                    }
                    print_value_counts(feature, &counts);
                    if let (Some(numeric), Some(stats)) = (stats_of, stats) {
                        print_group_stats(feature, numeric, &stats);
                    }
                }
            }
        }

        Commands::Rank {
            input,
            feature,
            min_orders,
            count,
            format,
        } => {
            let quiet = format == OutputFormat::Json;
            let prepared = prepare(&pipeline, &input, quiet).await?;
            let ranking = rank_restaurants(&prepared.table, feature, min_orders, count);

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ranking)?),
                OutputFormat::Text => print_ranking(&ranking, min_orders),
            }
        }
    }

    Ok(())
}

async fn prepare(pipeline: &OrderPipeline, input: &Path, quiet: bool) -> Result<PreparedOrders> {
    let progress = ProgressReporter::new_spinner("Preparing orders...", quiet);
    let prepared = pipeline.prepare(input, Some(&progress)).await?;
    progress.finish_with_message(&format!(
        "Prepared {} orders ({} rows excluded)",
        prepared.table.len(),
        prepared.load_report.excluded_rows() + prepared.cleaning_report.duplicates_excluded
    ));
    info!("Input {} ready for analysis", input.display());
    Ok(prepared)
}

fn print_value_counts(feature: CategoricalFeature, counts: &[ValueCount]) {
    println!("=== Distribution of {} ===", title_case(feature.column()));
    let width = counts.iter().map(|c| c.value.len()).max().unwrap_or(5).max(5);
    println!("{:<width$}  {:>7}  {:>10}", "value", "count", "percentage", width = width);
    for c in counts {
        println!(
            "{:<width$}  {:>7}  {:>9.2}%",
            c.value,
            c.count,
            c.percentage,
            width = width
        );
    }
    println!();
}

fn print_group_stats(group_by: CategoricalFeature, numeric: NumericFeature, stats: &[GroupStats]) {
    println!(
        "=== {} by {} ===",
        title_case(numeric.column()),
        title_case(group_by.column())
    );
    let width = stats.iter().map(|s| s.group.len()).max().unwrap_or(5).max(5);
    let fmt = |v: Option<f64>| v.map_or("undefined".to_string(), |v| format!("{:.2}", v));
    println!("{:<width$}  {:>7}  {:>10}  {:>10}", "group", "count", "mean", "std", width = width);
    for s in stats {
        println!(
            "{:<width$}  {:>7}  {:>10}  {:>10}",
            s.group,
            s.count,
            fmt(s.mean),
            fmt(s.std),
            width = width
        );
    }
    println!();
}

fn print_ranking(ranking: &RestaurantRanking, min_orders: usize) {
    let feature = title_case(&ranking.feature);
    println!(
        "=== Average {} (restaurants with more than {} orders) ===",
        feature, min_orders
    );
    if ranking.top.is_empty() {
        println!("No restaurant has enough orders to rank\n");
        return;
    }

    let width = ranking
        .top
        .iter()
        .chain(ranking.bottom.iter())
        .map(|r| r.restaurant_name.len())
        .max()
        .unwrap_or(10);

    for (title, rows) in [("Lowest", &ranking.top), ("Highest", &ranking.bottom)] {
        println!("{}:", title);
        for r in rows.iter() {
            println!(
                "  {:<width$}  {:>5} orders  {:>8.2}",
                r.restaurant_name,
                r.orders,
                r.average,
                width = width
            );
        }
    }
    println!();
}
