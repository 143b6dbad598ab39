use crate::analyzers::stats::{percentile, ratio, Summary};
use crate::config::MetricsConfig;
use crate::models::{DayType, OrderTable};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionTimeStats {
    pub summary: Option<Summary>,
    pub percentiles: Vec<PercentileValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryTimeByDay {
    pub weekday: Option<Summary>,
    pub weekend: Option<Summary>,
    /// Weekend mean delivery time over weekday mean delivery time
    pub weekend_to_weekday_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionStats {
    pub distinct_customers: usize,
    pub returning_customers: usize,
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpsBreakdown {
    pub rated_orders: usize,
    pub promoters: usize,
    pub passives: usize,
    pub detractors: usize,
    /// Percent promoters minus percent detractors, in [-100, 100]
    pub score: Option<f64>,
}

/// All business metrics for one cleaned table.
///
/// Ratios are `None` when their denominator is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessMetrics {
    pub order_volume: usize,
    pub costed_orders: usize,
    pub gmv: f64,
    pub total_revenue: f64,
    pub net_revenue: f64,
    pub profit_margin: Option<f64>,
    pub average_order_value: Option<f64>,
    pub completion_time: CompletionTimeStats,
    pub delivery_time: DeliveryTimeByDay,
    pub retention: RetentionStats,
    pub nps: NpsBreakdown,
    pub rating_participation_rate: Option<f64>,
}

pub struct MetricsEngine {
    config: MetricsConfig,
}

impl MetricsEngine {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    pub fn compute(&self, table: &OrderTable) -> BusinessMetrics {
        info!("Computing business metrics over {} orders", table.len());

        let total_revenue = self.total_revenue(table);
        let net_revenue = self.net_revenue(table);

        let metrics = BusinessMetrics {
            order_volume: self.order_volume(table),
            costed_orders: costed_orders(table),
            gmv: self.gmv(table),
            total_revenue,
            net_revenue,
            profit_margin: ratio(net_revenue, total_revenue),
            average_order_value: self.average_order_value(table),
            completion_time: self.completion_time(table),
            delivery_time: self.delivery_time_by_day(table),
            retention: self.retention(table),
            nps: self.nps(table),
            rating_participation_rate: self.rating_participation_rate(table),
        };

        debug!(?metrics, "Business metrics computed");
        metrics
    }

    /// Sum of cost over orders whose cost is known.
    pub fn gmv(&self, table: &OrderTable) -> f64 {
        table.iter().filter_map(|o| o.cost).sum()
    }

    pub fn total_revenue(&self, table: &OrderTable) -> f64 {
        table
            .iter()
            .filter_map(|o| o.cost)
            .map(|cost| self.config.commission.commission(cost))
            .sum()
    }

    pub fn net_revenue(&self, table: &OrderTable) -> f64 {
        self.total_revenue(table) - self.config.operating_costs
    }

    pub fn profit_margin(&self, table: &OrderTable) -> Option<f64> {
        ratio(self.net_revenue(table), self.total_revenue(table))
    }

    /// GMV over the orders that contributed to it.
    pub fn average_order_value(&self, table: &OrderTable) -> Option<f64> {
        ratio(self.gmv(table), costed_orders(table) as f64)
    }

    /// Every kept order counts, priced or not.
    pub fn order_volume(&self, table: &OrderTable) -> usize {
        table.len()
    }

    pub fn completion_time(&self, table: &OrderTable) -> CompletionTimeStats {
        let mut values: Vec<f64> = table.iter().filter_map(|o| o.completion_time).collect();
        values.sort_by(|a, b| a.total_cmp(b));

        let percentiles = self
            .config
            .completion_percentiles
            .iter()
            .filter_map(|&q| {
                percentile(&values, q).map(|value| PercentileValue {
                    percentile: q,
                    value,
                })
            })
            .collect();

        CompletionTimeStats {
            summary: Summary::from_values(values),
            percentiles,
        }
    }

    pub fn delivery_time_by_day(&self, table: &OrderTable) -> DeliveryTimeByDay {
        let summary_for = |day: DayType| {
            Summary::from_values(
                table
                    .iter()
                    .filter(|o| o.day_type == Some(day))
                    .filter_map(|o| o.delivery_time),
            )
        };

        let weekday = summary_for(DayType::Weekday);
        let weekend = summary_for(DayType::Weekend);
        let weekend_to_weekday_ratio = match (&weekday, &weekend) {
            (Some(wd), Some(we)) => ratio(we.mean, wd.mean),
            _ => None,
        };

        DeliveryTimeByDay {
            weekday,
            weekend,
            weekend_to_weekday_ratio,
        }
    }

    /// Share of distinct customers with two or more orders.
    pub fn retention(&self, table: &OrderTable) -> RetentionStats {
        let mut orders_per_customer: HashMap<u64, usize> = HashMap::new();
        for order in table {
            *orders_per_customer.entry(order.customer_id).or_default() += 1;
        }

        let distinct_customers = orders_per_customer.len();
        let returning_customers = orders_per_customer.values().filter(|&&n| n >= 2).count();

        RetentionStats {
            distinct_customers,
            returning_customers,
            rate: ratio(returning_customers as f64, distinct_customers as f64),
        }
    }

    /// Net promoter score over rated orders only.
    pub fn nps(&self, table: &OrderTable) -> NpsBreakdown {
        let ratings: Vec<u32> = table.iter().filter_map(|o| o.rating).collect();
        let promoters = ratings
            .iter()
            .filter(|&&r| r >= self.config.promoter_threshold)
            .count();
        let detractors = ratings
            .iter()
            .filter(|&&r| r <= self.config.detractor_threshold)
            .count();
        let rated_orders = ratings.len();

        NpsBreakdown {
            rated_orders,
            promoters,
            passives: rated_orders.saturating_sub(promoters + detractors),
            detractors,
            score: ratio(
                100.0 * (promoters as f64 - detractors as f64),
                rated_orders as f64,
            ),
        }
    }

    pub fn rating_participation_rate(&self, table: &OrderTable) -> Option<f64> {
        let rated = table.iter().filter(|o| o.rating_present()).count();
        ratio(rated as f64, self.order_volume(table) as f64)
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

fn costed_orders(table: &OrderTable) -> usize {
    table.iter().filter(|o| o.has_cost()).count()
}
