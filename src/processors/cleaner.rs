use crate::models::{Order, OrderRecord, OrderTable};
use crate::utils::constants::UNKNOWN_LABEL;
use crate::utils::text::{canonical_key, collapse_whitespace};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    DuplicateOrderId,
    NegativeCost,
    RatingOutOfRange,
    NegativePreparationTime,
    NegativeDeliveryTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataIssue {
    pub order_id: u64,
    pub line: u64,
    pub kind: IssueKind,
    pub details: String,
}

#[derive(Debug, Clone, Default)]
pub struct CleaningReport {
    pub input_records: usize,
    pub kept_records: usize,
    pub duplicates_excluded: usize,
    pub distinct_restaurants: usize,
    pub name_variants_merged: usize,
    pub missing_ratings: usize,
    pub missing_costs: usize,
    pub missing_completion_times: usize,
    pub issues: Vec<DataIssue>,
}

impl CleaningReport {
    fn percentage(&self, count: usize) -> f64 {
        if self.kept_records == 0 {
            0.0
        } else {
            100.0 * count as f64 / self.kept_records as f64
        }
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Cleaning Report ===\n");
        summary.push_str(&format!("Input Records: {}\n", self.input_records));
        summary.push_str(&format!("Kept Records: {}\n", self.kept_records));
        summary.push_str(&format!(
            "Duplicate Order IDs Excluded: {}\n",
            self.duplicates_excluded
        ));
        summary.push_str(&format!(
            "Distinct Restaurants: {} ({} spelling variants merged)\n",
            self.distinct_restaurants, self.name_variants_merged
        ));
        summary.push_str(&format!(
            "Missing Ratings: {} ({:.1}%)\n",
            self.missing_ratings,
            self.percentage(self.missing_ratings)
        ));
        summary.push_str(&format!(
            "Missing Costs: {} ({:.1}%)\n",
            self.missing_costs,
            self.percentage(self.missing_costs)
        ));
        summary.push_str(&format!(
            "Missing Completion Times: {} ({:.1}%)\n",
            self.missing_completion_times,
            self.percentage(self.missing_completion_times)
        ));
        summary.push_str(&format!("\nData Issues: {}\n", self.issues.len()));

        if !self.issues.is_empty() {
            summary.push_str("\nTop 10 Issues:\n");
            for (i, issue) in self.issues.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. Order {} (line {}): {}\n",
                    i + 1,
                    issue.order_id,
                    issue.line,
                    issue.details
                ));
            }
        }

        summary
    }
}

#[derive(Debug, Clone)]
pub struct CleanedOrders {
    pub table: OrderTable,
    pub report: CleaningReport,
}

/// Maps every spelling of a name to the first spelling seen, ignoring case
/// and whitespace differences.
#[derive(Debug, Default)]
struct NameCanonicalizer {
    canonical: HashMap<String, String>,
    variants: HashMap<String, HashSet<String>>,
}

impl NameCanonicalizer {
    fn canonicalize(&mut self, raw: &str) -> String {
        let collapsed = collapse_whitespace(raw);
        if collapsed.is_empty() {
            return UNKNOWN_LABEL.to_string();
        }

        let key = canonical_key(&collapsed);
        self.variants
            .entry(key.clone())
            .or_default()
            .insert(raw.to_string());
        self.canonical.entry(key).or_insert(collapsed).clone()
    }

    fn distinct(&self) -> usize {
        self.canonical.len()
    }

    fn merged_variants(&self) -> usize {
        self.variants.values().map(|v| v.len().saturating_sub(1)).sum()
    }
}

pub struct Cleaner;

impl Cleaner {
    pub fn new() -> Self {
        Self
    }

    /// Normalise names, drop duplicate order ids, blank out-of-range values
    /// and derive completion time. Missing values are flagged, never imputed.
    pub fn clean(&self, records: Vec<OrderRecord>) -> CleanedOrders {
        let mut report = CleaningReport {
            input_records: records.len(),
            ..CleaningReport::default()
        };

        let mut seen_ids = HashSet::with_capacity(records.len());
        let mut restaurants = NameCanonicalizer::default();
        let mut orders = Vec::with_capacity(records.len());

        for record in records {
            if !seen_ids.insert(record.order_id) {
                report.duplicates_excluded += 1;
                report.issues.push(DataIssue {
                    order_id: record.order_id,
                    line: record.line,
                    kind: IssueKind::DuplicateOrderId,
                    details: format!("duplicate order id {}, keeping first occurrence", record.order_id),
                });
                continue;
            }

            let cuisine_type = match collapse_whitespace(&record.cuisine_type) {
                c if c.is_empty() => UNKNOWN_LABEL.to_string(),
                c => c,
            };

            let mut order = Order {
                order_id: record.order_id,
                customer_id: record.customer_id,
                restaurant_name: restaurants.canonicalize(&record.restaurant_name),
                cuisine_type,
                cost: record.cost,
                day_type: record.day_type,
                rating: record.rating,
                preparation_time: record.preparation_time,
                delivery_time: record.delivery_time,
                completion_time: None,
            };

            self.repair_out_of_range(&mut order, record.line, &mut report.issues);
            order.derive_completion_time();

            if !order.rating_present() {
                report.missing_ratings += 1;
            }
            if !order.has_cost() {
                report.missing_costs += 1;
            }
            if order.completion_time.is_none() {
                report.missing_completion_times += 1;
            }

            orders.push(order);
        }

        report.kept_records = orders.len();
        report.distinct_restaurants = restaurants.distinct();
        report.name_variants_merged = restaurants.merged_variants();

        info!(
            "Cleaned {} orders: {} duplicates excluded, {} data issues, {} restaurant spellings merged",
            report.kept_records,
            report.duplicates_excluded,
            report.issues.len(),
            report.name_variants_merged
        );

        CleanedOrders {
            table: OrderTable::new(orders),
            report,
        }
    }

    /// Blank every field that fails the range rules declared on `Order`.
    fn repair_out_of_range(&self, order: &mut Order, line: u64, issues: &mut Vec<DataIssue>) {
        let errors = match order.validate() {
            Ok(()) => return,
            Err(errors) => errors,
        };

        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|k| k.to_string())
            .collect();
        fields.sort();

        for field in fields {
            let (kind, details) = match field.as_str() {
                "cost" => (
                    IssueKind::NegativeCost,
                    format!("negative cost {:?} treated as missing", order.cost.take()),
                ),
                "rating" => (
                    IssueKind::RatingOutOfRange,
                    format!("rating {:?} outside 1-5 treated as missing", order.rating.take()),
                ),
                "preparation_time" => (
                    IssueKind::NegativePreparationTime,
                    format!(
                        "negative preparation time {:?} treated as missing",
                        order.preparation_time.take()
                    ),
                ),
                "delivery_time" => (
                    IssueKind::NegativeDeliveryTime,
                    format!(
                        "negative delivery time {:?} treated as missing",
                        order.delivery_time.take()
                    ),
                ),
                _ => continue,
            };

            debug!("Order {}: {}", order.order_id, details);
            issues.push(DataIssue {
                order_id: order.order_id,
                line,
                kind,
                details,
            });
        }
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new()
    }
}
