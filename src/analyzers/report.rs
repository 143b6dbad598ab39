use crate::analyzers::metrics_engine::BusinessMetrics;
use crate::error::Result;
use crate::utils::text::round2;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub metric: String,
    pub unit: String,
    /// Rounded to 2 dp; `None` renders as "undefined"
    pub value: Option<f64>,
}

impl MetricRow {
    fn new(metric: &str, unit: &str, value: Option<f64>) -> Self {
        Self {
            metric: metric.to_string(),
            unit: unit.to_string(),
            value: value.map(round2),
        }
    }

    pub fn formatted_value(&self) -> String {
        self.value
            .map_or_else(|| "undefined".to_string(), |v| format!("{:.2}", v))
    }
}

/// The headline metrics as a flat (metric, unit, value) table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub rows: Vec<MetricRow>,
}

impl MetricsReport {
    pub fn from_metrics(metrics: &BusinessMetrics) -> Self {
        let percent = |v: Option<f64>| v.map(|r| r * 100.0);
        let completion = metrics.completion_time.summary.as_ref();

        let mut rows = vec![
            MetricRow::new("Gross Merchandise Value", "$", Some(metrics.gmv)),
            MetricRow::new("Total Revenue", "$", Some(metrics.total_revenue)),
            MetricRow::new("Net Revenue", "$", Some(metrics.net_revenue)),
            MetricRow::new("Profit Margin", "%", percent(metrics.profit_margin)),
            MetricRow::new("Average Order Value", "$", metrics.average_order_value),
            MetricRow::new("Order Volume", "orders", Some(metrics.order_volume as f64)),
            MetricRow::new("Mean Order Completion Time", "min", completion.map(|s| s.mean)),
            MetricRow::new("Median Order Completion Time", "min", completion.map(|s| s.median)),
        ];

        for p in &metrics.completion_time.percentiles {
            rows.push(MetricRow::new(
                &format!("P{} Order Completion Time", p.percentile),
                "min",
                Some(p.value),
            ));
        }

        rows.extend([
            MetricRow::new(
                "Mean Weekday Delivery Time",
                "min",
                metrics.delivery_time.weekday.as_ref().map(|s| s.mean),
            ),
            MetricRow::new(
                "Mean Weekend Delivery Time",
                "min",
                metrics.delivery_time.weekend.as_ref().map(|s| s.mean),
            ),
            MetricRow::new(
                "Weekend/Weekday Delivery Time Ratio",
                "x",
                metrics.delivery_time.weekend_to_weekday_ratio,
            ),
            MetricRow::new("Customer Retention Rate", "%", percent(metrics.retention.rate)),
            MetricRow::new("Net Promoter Score", "%", metrics.nps.score),
            MetricRow::new(
                "Customer Rating Participation Rate",
                "%",
                percent(metrics.rating_participation_rate),
            ),
        ]);

        Self { rows }
    }

    pub fn get(&self, metric: &str) -> Option<&MetricRow> {
        self.rows.iter().find(|r| r.metric == metric)
    }

    pub fn summary(&self) -> String {
        let metric_width = self.rows.iter().map(|r| r.metric.len()).max().unwrap_or(6).max(6);

        let mut summary = String::new();
        summary.push_str("=== Business Metrics ===\n");
        summary.push_str(&format!(
            "{:<width$}  {:>6}  {:>14}\n",
            "metric",
            "unit",
            "value",
            width = metric_width
        ));
        for row in &self.rows {
            summary.push_str(&format!(
                "{:<width$}  {:>6}  {:>14}\n",
                row.metric,
                row.unit,
                row.formatted_value(),
                width = metric_width
            ));
        }
        summary
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::MetricsEngine;
    use crate::models::order::fixtures::order;
    use crate::models::OrderTable;

    #[test]
    fn test_report_rows_from_metrics() {
        let mut rated = order(2, 1, "Hangawi");
        rated.rating = Some(5);
        let table = OrderTable::new(vec![order(1, 1, "Hangawi"), rated]);
        let report = MetricsReport::from_metrics(&MetricsEngine::default().compute(&table));

        assert_eq!(report.get("Gross Merchandise Value").unwrap().value, Some(20.0));
        assert_eq!(report.get("Total Revenue").unwrap().value, Some(5.0));
        assert_eq!(report.get("Profit Margin").unwrap().value, Some(100.0));
        assert_eq!(report.get("Customer Retention Rate").unwrap().value, Some(100.0));
        assert_eq!(report.get("Net Promoter Score").unwrap().value, Some(100.0));
        assert_eq!(
            report.get("Customer Rating Participation Rate").unwrap().value,
            Some(50.0)
        );
        assert!(report.get("P90 Order Completion Time").is_some());
    }

    #[test]
    fn test_undefined_values_render() {
        let report = MetricsReport::from_metrics(&MetricsEngine::default().compute(&OrderTable::default()));
        let aov = report.get("Average Order Value").unwrap();
        assert_eq!(aov.value, None);
        assert_eq!(aov.formatted_value(), "undefined");
        assert!(report.summary().contains("undefined"));
    }

    #[test]
    fn test_json_output() -> Result<()> {
        let report = MetricsReport::from_metrics(&MetricsEngine::default().compute(&OrderTable::default()));
        let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
        let rows = json["rows"].as_array().unwrap();
        assert_eq!(rows[0]["metric"], "Gross Merchandise Value");
        assert!(rows.iter().any(|r| r["value"].is_null()));
        Ok(())
    }
}
