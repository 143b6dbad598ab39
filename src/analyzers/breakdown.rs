//! Per-category breakdowns of the cleaned order table: value counts,
//! grouped statistics and restaurant rankings.

use crate::analyzers::stats::{mean, sample_std};
use crate::models::{Order, OrderTable};
use crate::utils::constants::NOT_GIVEN_LABEL;
use crate::utils::text::round2;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalFeature {
    Restaurant,
    Cuisine,
    DayType,
    Rating,
    Customer,
}

impl CategoricalFeature {
    pub fn column(&self) -> &'static str {
        match self {
            CategoricalFeature::Restaurant => "restaurant_name",
            CategoricalFeature::Cuisine => "cuisine_type",
            CategoricalFeature::DayType => "day_of_the_week",
            CategoricalFeature::Rating => "rating",
            CategoricalFeature::Customer => "customer_id",
        }
    }

    /// The category an order falls in; `None` when the field is absent.
    pub fn label(&self, order: &Order) -> Option<String> {
        match self {
            CategoricalFeature::Restaurant => Some(order.restaurant_name.clone()),
            CategoricalFeature::Cuisine => Some(order.cuisine_type.clone()),
            CategoricalFeature::DayType => order.day_type.map(|d| d.to_string()),
            CategoricalFeature::Rating => Some(
                order
                    .rating
                    .map_or(NOT_GIVEN_LABEL.to_string(), |r| r.to_string()),
            ),
            CategoricalFeature::Customer => Some(order.customer_id.to_string()),
        }
    }
}

impl fmt::Display for CategoricalFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for CategoricalFeature {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "restaurant" | "restaurant_name" => Ok(CategoricalFeature::Restaurant),
            "cuisine" | "cuisine_type" => Ok(CategoricalFeature::Cuisine),
            "day" | "day_type" | "day_of_the_week" => Ok(CategoricalFeature::DayType),
            "rating" => Ok(CategoricalFeature::Rating),
            "customer" | "customer_id" => Ok(CategoricalFeature::Customer),
            _ => Err(format!("unknown categorical feature '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericFeature {
    Cost,
    PreparationTime,
    DeliveryTime,
    CompletionTime,
    Rating,
}

impl NumericFeature {
    pub fn column(&self) -> &'static str {
        match self {
            NumericFeature::Cost => "cost_of_the_order",
            NumericFeature::PreparationTime => "food_preparation_time",
            NumericFeature::DeliveryTime => "delivery_time",
            NumericFeature::CompletionTime => "order_completion_time",
            NumericFeature::Rating => "rating",
        }
    }

    pub fn value(&self, order: &Order) -> Option<f64> {
        match self {
            NumericFeature::Cost => order.cost,
            NumericFeature::PreparationTime => order.preparation_time,
            NumericFeature::DeliveryTime => order.delivery_time,
            NumericFeature::CompletionTime => order.completion_time,
            NumericFeature::Rating => order.rating.map(f64::from),
        }
    }
}

impl fmt::Display for NumericFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for NumericFeature {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "cost" | "cost_of_the_order" => Ok(NumericFeature::Cost),
            "preparation_time" | "food_preparation_time" => Ok(NumericFeature::PreparationTime),
            "delivery_time" => Ok(NumericFeature::DeliveryTime),
            "completion_time" | "order_completion_time" => Ok(NumericFeature::CompletionTime),
            "rating" => Ok(NumericFeature::Rating),
            _ => Err(format!("unknown numeric feature '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
    /// Share of the counted orders, rounded to 2 dp
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub group: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantAverage {
    pub restaurant_name: String,
    pub orders: usize,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantRanking {
    pub feature: String,
    /// Lowest averages, ascending
    pub top: Vec<RestaurantAverage>,
    /// Highest averages, ascending
    pub bottom: Vec<RestaurantAverage>,
}

/// Counts and percentages of each value of `feature`, most frequent first.
/// Orders with no value for the feature are not counted.
pub fn value_counts(
    table: &OrderTable,
    feature: CategoricalFeature,
    top_n: Option<usize>,
) -> Vec<ValueCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for order in table {
        if let Some(label) = feature.label(order) {
            *counts.entry(label).or_default() += 1;
        }
    }

    let total: usize = counts.values().sum();
    let mut result: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            value,
            count,
            percentage: round2(100.0 * count as f64 / total as f64),
        })
        .collect();

    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    if let Some(n) = top_n {
        result.truncate(n);
    }
    result
}

/// Value counts restricted to orders whose `filter_feature` equals
/// `filter_value` (case-insensitive). Percentages are relative to the subset.
pub fn filtered_value_counts(
    table: &OrderTable,
    feature: CategoricalFeature,
    filter_feature: CategoricalFeature,
    filter_value: &str,
) -> Vec<ValueCount> {
    let subset = table.filter(|order| {
        filter_feature
            .label(order)
            .is_some_and(|label| label.eq_ignore_ascii_case(filter_value.trim()))
    });
    value_counts(&subset, feature, None)
}

/// Mean and sample standard deviation of `numeric` per value of `group_by`,
/// groups in ascending order.
pub fn grouped_stats(
    table: &OrderTable,
    group_by: CategoricalFeature,
    numeric: NumericFeature,
) -> Vec<GroupStats> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for order in table {
        if let Some(label) = group_by.label(order) {
            let values = groups.entry(label).or_default();
            if let Some(value) = numeric.value(order) {
                values.push(value);
            }
        }
    }

    groups
        .into_iter()
        .map(|(group, values)| GroupStats {
            group,
            count: values.len(),
            mean: mean(&values).map(round2),
            std: sample_std(&values).map(round2),
        })
        .collect()
}

/// Restaurants with strictly more than `min_orders` orders, ranked by the
/// mean of `numeric`; the first and last `n` of the ascending ranking.
pub fn rank_restaurants(
    table: &OrderTable,
    numeric: NumericFeature,
    min_orders: usize,
    n: usize,
) -> RestaurantRanking {
    let mut per_restaurant: HashMap<&str, (usize, Vec<f64>)> = HashMap::new();
    for order in table {
        let entry = per_restaurant
            .entry(order.restaurant_name.as_str())
            .or_default();
        entry.0 += 1;
        if let Some(value) = numeric.value(order) {
            entry.1.push(value);
        }
    }

    let mut ranked: Vec<(f64, RestaurantAverage)> = per_restaurant
        .into_iter()
        .filter(|(_, (orders, _))| *orders > min_orders)
        .filter_map(|(name, (orders, values))| {
            mean(&values).map(|avg| {
                (
                    avg,
                    RestaurantAverage {
                        restaurant_name: name.to_string(),
                        orders,
                        average: round2(avg),
                    },
                )
            })
        })
        .collect();

    // Order on the unrounded mean; rounding is for display only
    ranked.sort_by(|(a_mean, a), (b_mean, b)| {
        a_mean
            .total_cmp(b_mean)
            .then_with(|| a.restaurant_name.cmp(&b.restaurant_name))
    });
    let averages: Vec<RestaurantAverage> = ranked.into_iter().map(|(_, r)| r).collect();

    let top = averages.iter().take(n).cloned().collect();
    let bottom = averages[averages.len().saturating_sub(n)..].to_vec();

    RestaurantRanking {
        feature: numeric.column().to_string(),
        top,
        bottom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::fixtures::order;
    use crate::models::DayType;
    use pretty_assertions::assert_eq;

    fn sample_table() -> OrderTable {
        let specs = [
            (1, "Shake Shack", "American", DayType::Weekend, Some(5), 20.0),
            (2, "Shake Shack", "American", DayType::Weekday, None, 30.0),
            (3, "Hangawi", "Korean", DayType::Weekend, Some(3), 10.0),
            (4, "Blue Ribbon Sushi", "Japanese", DayType::Weekend, None, 24.0),
        ];

        OrderTable::new(
            specs
                .into_iter()
                .map(|(id, restaurant, cuisine, day, rating, delivery)| {
                    let mut o = order(id, id, restaurant);
                    o.cuisine_type = cuisine.to_string();
                    o.day_type = Some(day);
                    o.rating = rating;
                    o.delivery_time = Some(delivery);
                    o
                })
                .collect(),
        )
    }

    #[test]
    fn test_value_counts_sorted_by_frequency() {
        let counts = value_counts(&sample_table(), CategoricalFeature::Cuisine, None);
        assert_eq!(
            counts,
            vec![
                ValueCount {
                    value: "American".to_string(),
                    count: 2,
                    percentage: 50.0
                },
                ValueCount {
                    value: "Japanese".to_string(),
                    count: 1,
                    percentage: 25.0
                },
                ValueCount {
                    value: "Korean".to_string(),
                    count: 1,
                    percentage: 25.0
                },
            ]
        );

        let top_one = value_counts(&sample_table(), CategoricalFeature::Cuisine, Some(1));
        assert_eq!(top_one.len(), 1);
    }

    #[test]
    fn test_rating_counts_include_not_given() {
        let counts = value_counts(&sample_table(), CategoricalFeature::Rating, None);
        assert_eq!(counts[0].value, NOT_GIVEN_LABEL);
        assert_eq!(counts[0].count, 2);
    }

    #[test]
    fn test_filtered_value_counts() {
        let counts = filtered_value_counts(
            &sample_table(),
            CategoricalFeature::Cuisine,
            CategoricalFeature::DayType,
            "weekend",
        );
        let total: usize = counts.iter().map(|c| c.count).sum();
        assert_eq!(total, 3);
        assert!(counts.iter().all(|c| (c.percentage - 33.33).abs() < 1e-9));
    }

    #[test]
    fn test_grouped_stats() {
        let stats = grouped_stats(
            &sample_table(),
            CategoricalFeature::Restaurant,
            NumericFeature::DeliveryTime,
        );
        let groups: Vec<&str> = stats.iter().map(|s| s.group.as_str()).collect();
        assert_eq!(groups, vec!["Blue Ribbon Sushi", "Hangawi", "Shake Shack"]);

        let shack = &stats[2];
        assert_eq!(shack.count, 2);
        assert_eq!(shack.mean, Some(25.0));
        assert_eq!(shack.std, Some(7.07));
        assert_eq!(stats[1].std, None);
    }

    #[test]
    fn test_rank_restaurants_respects_min_orders() {
        let table = sample_table();
        let ranking = rank_restaurants(&table, NumericFeature::DeliveryTime, 1, 5);
        assert_eq!(ranking.top.len(), 1);
        assert_eq!(ranking.top[0].restaurant_name, "Shake Shack");
        assert_eq!(ranking.bottom, ranking.top);

        let ranking = rank_restaurants(&table, NumericFeature::DeliveryTime, 0, 2);
        let top: Vec<&str> = ranking.top.iter().map(|r| r.restaurant_name.as_str()).collect();
        let bottom: Vec<&str> = ranking.bottom.iter().map(|r| r.restaurant_name.as_str()).collect();
        assert_eq!(top, vec!["Hangawi", "Blue Ribbon Sushi"]);
        assert_eq!(bottom, vec!["Blue Ribbon Sushi", "Shake Shack"]);
    }

    #[test]
    fn test_rank_orders_by_unrounded_mean() {
        let mut alpha = order(1, 1, "Alpha Kitchen");
        alpha.delivery_time = Some(20.004);
        let mut beta = order(2, 2, "Beta Bistro");
        beta.delivery_time = Some(20.0);
        let table = OrderTable::new(vec![alpha, beta]);

        let ranking = rank_restaurants(&table, NumericFeature::DeliveryTime, 0, 2);
        let top: Vec<&str> = ranking.top.iter().map(|r| r.restaurant_name.as_str()).collect();
        assert_eq!(top, vec!["Beta Bistro", "Alpha Kitchen"]);
        assert_eq!(ranking.top[1].average, 20.0);
    }

    #[test]
    fn test_feature_parsing() {
        assert_eq!("cuisine".parse::<CategoricalFeature>(), Ok(CategoricalFeature::Cuisine));
        assert_eq!("day-type".parse::<CategoricalFeature>(), Ok(CategoricalFeature::DayType));
        assert_eq!("completion-time".parse::<NumericFeature>(), Ok(NumericFeature::CompletionTime));
        assert!("colour".parse::<CategoricalFeature>().is_err());
        assert!("weight".parse::<NumericFeature>().is_err());
    }
}
