use crate::analyzers::{CategoricalFeature, NumericFeature};
use crate::models::DayType;
use crate::utils::constants::{DEFAULT_RANKING_SIZE, DEFAULT_RESTAURANT_MIN_ORDERS};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "foodhub-metrics")]
#[command(about = "Business metrics and data-quality checks for food-delivery order datasets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Read input through a memory map")]
    pub mmap: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the business metrics report for an order dataset
    Report {
        #[arg(short, long, help = "Input order CSV file")]
        input: PathBuf,

        #[arg(short, long, help = "Metrics configuration file (TOML)")]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[arg(long, default_value = "5", value_parser = at_least_one(), help = "Rows shown per breakdown")]
        top: usize,
    },

    /// Load and clean an order dataset, reporting data-quality issues only
    Validate {
        #[arg(short, long, help = "Input order CSV file")]
        input: PathBuf,
    },

    /// Write the cleaned order table to Parquet
    Clean {
        #[arg(short, long, help = "Input order CSV file")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Output Parquet file path [default: output/foodhub-orders-{YYMMDD}.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(long, default_value = "snappy")]
        compression: String,
    },

    /// Count and percentage of each value of a categorical feature
    Breakdown {
        #[arg(short, long, help = "Input order CSV file")]
        input: PathBuf,

        #[arg(short, long, help = "restaurant, cuisine, day, rating or customer")]
        feature: CategoricalFeature,

        #[arg(long, help = "Only count orders on this day type (weekday or weekend)")]
        filter_day: Option<DayType>,

        #[arg(
            long,
            help = "Also show mean/std of a numeric feature per value (cost, preparation-time, delivery-time, completion-time, rating)"
        )]
        stats_of: Option<NumericFeature>,

        #[arg(long, value_parser = at_least_one(), help = "Show only the N most frequent values")]
        top: Option<usize>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Top and bottom restaurants by the mean of a numeric feature
    Rank {
        #[arg(short, long, help = "Input order CSV file")]
        input: PathBuf,

        #[arg(short, long, default_value = "completion-time")]
        feature: NumericFeature,

        #[arg(long, default_value_t = DEFAULT_RESTAURANT_MIN_ORDERS, help = "Rank restaurants with more than N orders")]
        min_orders: usize,

        #[arg(long, default_value_t = DEFAULT_RANKING_SIZE, value_parser = at_least_one())]
        count: usize,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn at_least_one() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::<usize>::new().range(1..)
}
